/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: policy + session store を持つ Authenticator
 *   - shutdown: プロセス全体の停止シグナル (リクエストごとに child token を切る)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use tokio_util::sync::CancellationToken;

use crate::services::auth::{AuthPolicy, Authenticator, RequestPrincipal, SubjectId};
use crate::services::session::SessionStore;

pub type PrincipalPolicy = dyn AuthPolicy<RequestPrincipal, SubjectId>;
pub type PrincipalAuthenticator = Authenticator<PrincipalPolicy, RequestPrincipal, SubjectId>;
pub type PrincipalSessions = SessionStore<String, SubjectId>;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: PrincipalAuthenticator,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(auth: PrincipalAuthenticator, shutdown: CancellationToken) -> Self {
        Self { auth, shutdown }
    }
}
