use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::services::auth::{Principal, RequestPrincipal};
use crate::state::AppState;

/// Principal taken from the `{principal_id}` path segment.
///
/// Never rejects: a missing or blank id yields `None`, and the decorator turns
/// that into `MissingPrincipal`.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<RequestPrincipal>);

impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Path::<String>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|Path(id)| RequestPrincipal::new(id))
            .filter(|p| p.principal_token().is_some());

        Ok(Self(principal))
    }
}
