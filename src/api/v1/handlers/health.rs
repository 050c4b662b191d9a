/*
 * Responsibility
 * - GET /health (疎通用, 認証なし)
 * - 現在の session 数を返す (lazy eviction 前の期限切れも含む)
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "sessions": state.auth.sessions().len()})),
    )
}
