use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::services::auth::identity::{SessionKey, Subject};
use crate::services::session::store::SessionStore;

/// Periodically drop expired sessions until `shutdown` is cancelled.
///
/// Lazy eviction in `SessionStore::get` is sufficient for correctness; this
/// only bounds memory held by principals that never come back.
pub fn spawn_sweeper<K, S>(
    store: Arc<SessionStore<K, S>>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    K: SessionKey,
    S: Subject,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!("session sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let purged = store.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = store.len(), "purged expired sessions");
                    }
                }
            }
        }
    })
}
