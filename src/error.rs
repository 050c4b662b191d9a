/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - AuthError (decorator の拒否) を HTTP のアクセス拒否に変換
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::session::SessionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing principal")]
    MissingPrincipal,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::MissingPrincipal => (StatusCode::UNAUTHORIZED, "MISSING_PRINCIPAL"),
            AppError::AuthenticationFailed => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED"),
            AppError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            AppError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl<E> From<AuthError<E>> for AppError
where
    E: Into<AppError>,
{
    fn from(e: AuthError<E>) -> Self {
        match e {
            AuthError::MissingPrincipal => AppError::MissingPrincipal,
            AuthError::AuthenticationFailed => AppError::AuthenticationFailed,
            AuthError::Cancelled => AppError::Cancelled,
            AuthError::Inner(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejections_map_to_unauthorized() {
        let res = AppError::from(AuthError::<AppError>::MissingPrincipal).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = AppError::from(AuthError::<AppError>::AuthenticationFailed).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = AppError::from(AuthError::<AppError>::Cancelled).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn inner_errors_keep_their_own_mapping() {
        let inner = AppError::Session(SessionError::InvalidKey);
        let res = AppError::from(AuthError::Inner(inner)).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
