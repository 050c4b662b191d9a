/*
 * Responsibility
 * - GET /principal/{principal_id}
 * - endpoint 本体 (run) を Authenticator で包んで呼ぶ
 * - 認証/認可の失敗は AppError 経由で 401 などに変換される
 */
use axum::{Json, extract::State};

use crate::{
    api::v1::{dto::principal::PrincipalResponse, extractors::MaybePrincipal},
    error::AppError,
    services::auth::{Authorized, RequestContext, RequestPrincipal, SubjectId, SubjectSet},
    state::AppState,
};

pub async fn get_principal(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
) -> Result<Json<PrincipalResponse>, AppError> {
    // cancelled on server shutdown
    let ctx = RequestContext::with_cancel(SubjectSet::new(), state.shutdown.child_token());

    let res = state.auth.wrap(run).call(ctx, principal).await?;
    Ok(Json(res))
}

async fn run(
    _ctx: RequestContext<SubjectId>,
    auth: Authorized<RequestPrincipal, SubjectId>,
) -> Result<PrincipalResponse, AppError> {
    tracing::debug!(
        principal = %auth.principal.id,
        subjects = auth.subjects.len(),
        "principal endpoint"
    );

    let mut subjects: Vec<SubjectId> = auth.subjects.into_iter().collect();
    subjects.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    Ok(PrincipalResponse {
        status: "OK",
        principal: auth.principal.id,
        subjects,
    })
}
