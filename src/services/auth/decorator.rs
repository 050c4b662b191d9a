//! Authentication decorator around request handlers.
//!
//! `Authenticator` owns the policy and the session store. `wrap` turns an inner
//! handler `(RequestContext, Authorized) -> Result<R, E>` into an
//! `Authenticated` handler with the shape `(RequestContext, Option<P>)`, so a
//! transport can register it like any other handler.
//!
//! Per call:
//! 1. no principal, or no usable token: `MissingPrincipal`; the cache is not touched
//! 2. fresh cached decision: reuse it
//! 3. otherwise authenticate; a failure is cached (unless disabled) and rejected
//! 4. authorize the requested subjects, cache the grant, run the inner handler
//!
//! Authorization never runs for an unauthenticated principal, and the inner
//! handler never runs before both decisions exist.
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::services::auth::identity::{Principal, SessionKey, Subject, SubjectSet};
use crate::services::auth::policy::AuthPolicy;
use crate::services::session::store::SessionStore;

#[derive(Debug, Error)]
pub enum AuthError<E> {
    #[error("missing principal")]
    MissingPrincipal,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Inner(E),
}

impl<E> AuthError<E> {
    /// Rejections the transport should map to access denied.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::MissingPrincipal | Self::AuthenticationFailed)
    }
}

/// Per-request input supplied by the transport.
#[derive(Debug, Clone)]
pub struct RequestContext<S: Subject> {
    /// Subjects the caller asks to act on; may be empty.
    pub subjects: SubjectSet<S>,
    /// Advisory: checked before policy evaluation and before the inner handler.
    pub cancel: CancellationToken,
}

impl<S: Subject> RequestContext<S> {
    pub fn new(subjects: SubjectSet<S>) -> Self {
        Self::with_cancel(subjects, CancellationToken::new())
    }

    pub fn with_cancel(subjects: SubjectSet<S>, cancel: CancellationToken) -> Self {
        Self { subjects, cancel }
    }
}

impl<S: Subject> Default for RequestContext<S> {
    fn default() -> Self {
        Self::new(SubjectSet::new())
    }
}

/// What the inner handler receives once the caller is let through.
#[derive(Debug, Clone)]
pub struct Authorized<P, S: Subject> {
    pub principal: P,
    pub subjects: SubjectSet<S>,
}

pub struct Authenticator<Pol: ?Sized, P: Principal, S: Subject> {
    policy: Arc<Pol>,
    sessions: Arc<SessionStore<P::Token, S>>,
    cache_failures: bool,
    _principal: PhantomData<fn(P)>,
}

impl<Pol: ?Sized, P: Principal, S: Subject> Clone for Authenticator<Pol, P, S> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            sessions: self.sessions.clone(),
            cache_failures: self.cache_failures,
            _principal: PhantomData,
        }
    }
}

impl<Pol: ?Sized, P: Principal, S: Subject> std::fmt::Debug for Authenticator<Pol, P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("sessions", &self.sessions)
            .field("cache_failures", &self.cache_failures)
            .finish()
    }
}

impl<Pol, P, S> Authenticator<Pol, P, S>
where
    Pol: AuthPolicy<P, S> + ?Sized,
    P: Principal,
    S: Subject,
{
    pub fn new(policy: Arc<Pol>, sessions: Arc<SessionStore<P::Token, S>>) -> Self {
        Self {
            policy,
            sessions,
            cache_failures: true,
            _principal: PhantomData,
        }
    }

    /// Whether failed authentications are cached for the session TTL.
    pub fn with_negative_caching(mut self, enabled: bool) -> Self {
        self.cache_failures = enabled;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore<P::Token, S>> {
        &self.sessions
    }

    pub fn wrap<H>(&self, inner: H) -> Authenticated<Pol, P, S, H> {
        Authenticated {
            auth: self.clone(),
            inner,
        }
    }

    /// Resolve the authentication/authorization decision for one request.
    pub async fn resolve<E>(
        &self,
        ctx: &RequestContext<S>,
        principal: Option<P>,
    ) -> Result<Authorized<P, S>, AuthError<E>> {
        let Some(principal) = principal else {
            tracing::debug!("request without principal");
            return Err(AuthError::MissingPrincipal);
        };
        let Some(key) = principal.principal_token().filter(|key| key.is_valid()) else {
            tracing::debug!("principal without usable token");
            return Err(AuthError::MissingPrincipal);
        };

        match self.sessions.get(&key) {
            Ok(Some(record)) if record.authenticated => {
                tracing::debug!(key = ?key, "session cache hit");
                return Ok(Authorized {
                    principal,
                    subjects: record.subjects,
                });
            }
            Ok(Some(_)) => {
                tracing::debug!(key = ?key, "cached authentication failure");
                return Err(AuthError::AuthenticationFailed);
            }
            Ok(None) => tracing::debug!(key = ?key, "session cache miss"),
            Err(err) => {
                tracing::warn!(error = %err, "session lookup rejected key");
                return Err(AuthError::MissingPrincipal);
            }
        }

        if ctx.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        if !self.policy.authenticate(&principal).await {
            tracing::warn!(key = ?key, "authentication failed");
            if self.cache_failures {
                self.remember(key, false, SubjectSet::new());
            }
            return Err(AuthError::AuthenticationFailed);
        }

        if ctx.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        let subjects = self.policy.authorize(&principal, &ctx.subjects).await;
        self.remember(key, true, subjects.clone());

        Ok(Authorized {
            principal,
            subjects,
        })
    }

    fn remember(&self, key: P::Token, authenticated: bool, subjects: SubjectSet<S>) {
        if let Err(err) = self.sessions.put(key, authenticated, subjects) {
            tracing::warn!(error = %err, "failed to cache session");
        }
    }
}

/// An inner handler guarded by an `Authenticator`.
pub struct Authenticated<Pol: ?Sized, P: Principal, S: Subject, H> {
    auth: Authenticator<Pol, P, S>,
    inner: H,
}

impl<Pol, P, S, H> Authenticated<Pol, P, S, H>
where
    Pol: AuthPolicy<P, S> + ?Sized,
    P: Principal,
    S: Subject,
{
    /// Inner handler errors come back as `AuthError::Inner`, untouched.
    pub async fn call<Fut, R, E>(
        &self,
        ctx: RequestContext<S>,
        principal: Option<P>,
    ) -> Result<R, AuthError<E>>
    where
        H: Fn(RequestContext<S>, Authorized<P, S>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let authorized = self.auth.resolve::<E>(&ctx, principal).await?;

        if ctx.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        (self.inner)(ctx, authorized).await.map_err(AuthError::Inner)
    }
}
