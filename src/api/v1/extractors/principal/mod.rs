/*!
 * Principal extractor
 *
 * Responsibility:
 * - transport (path parameter) から Principal を取り出して handler に渡す
 * - 認証そのものはしない (decorator の責務)
 */
mod core;

pub use self::core::MaybePrincipal;
