/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は認証なし
 * - /principal/{principal_id} は handler 内で Authenticator により保護される
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{health::health, principal::get_principal};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/principal/{principal_id}", get(get_principal))
}
