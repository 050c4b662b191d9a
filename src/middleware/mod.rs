/*
 * Responsibility
 * - middleware の公開インターフェース
 * - 認証は handler 単位の decorator (services::auth) で行うので、ここは transport 層のみ
 */
pub mod http;
