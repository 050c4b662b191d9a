/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config読み込み → 依存生成 (SessionStore, Policy, Authenticator) → Router 組み立て
 * - session sweeper の起動 (設定されていれば)
 * - axum::serve() で起動し、Ctrl-C で graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::auth::{AllowListPolicy, Authenticator};
use crate::services::session::{Clock, SessionConfig, SessionStore, SystemClock, spawn_sweeper};
use crate::state::{AppState, PrincipalPolicy, PrincipalSessions};

fn init_tracing() {
    // RUST_LOG=info,kitauth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        ttl = ?config.session_ttl,
        refresh_on_access = config.session_refresh_on_access,
        "starting principal service"
    );

    let shutdown = CancellationToken::new();
    let state = build_state(&config, Arc::new(SystemClock), shutdown.clone())?;

    let sweeper = (!config.session_sweep_interval.is_zero()).then(|| {
        spawn_sweeper(
            state.auth.sessions().clone(),
            config.session_sweep_interval,
            shutdown.clone(),
        )
    });

    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "session sweeper task failed");
        }
    }

    tracing::info!("stopped");
    Ok(())
}

/// Wire the session store, policy and authenticator from `Config`.
pub fn build_state(
    config: &Config,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<AppState, AppError> {
    let sessions: Arc<PrincipalSessions> = Arc::new(SessionStore::new(
        SessionConfig::new(config.session_ttl, config.session_refresh_on_access),
        clock,
    )?);

    let policy: Arc<PrincipalPolicy> = Arc::new(AllowListPolicy::new(
        config.auth_allowed_principals.iter().cloned(),
    ));
    if config.auth_allowed_principals.is_empty() {
        tracing::warn!("AUTH_ALLOWED_PRINCIPALS is empty; every principal will be rejected");
    }

    let auth = Authenticator::new(policy, sessions)
        .with_negative_caching(config.session_cache_failures);

    Ok(AppState::new(auth, shutdown))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    middleware::http::apply(router, config)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
