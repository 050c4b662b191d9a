//! Authentication / authorization strategy plugged into `Authenticator`.
//!
//! Implementations must be safe to call concurrently from many in-flight
//! requests and should be free of side effects: the decorator caches their
//! answers and may call them redundantly for the same principal.
use std::collections::HashSet;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::services::auth::identity::{Principal, SessionKey, Subject, SubjectSet};

#[async_trait]
pub trait AuthPolicy<P: Principal, S: Subject>: Send + Sync {
    /// Is the principal who it claims to be.
    async fn authenticate(&self, principal: &P) -> bool;

    /// Subjects the principal is entitled to, given the requested set.
    async fn authorize(&self, principal: &P, requested: &SubjectSet<S>) -> SubjectSet<S>;
}

/// Adapter for plain predicate functions.
pub struct FnPolicy<A, Z, P, S> {
    authenticate: A,
    authorize: Z,
    _marker: PhantomData<fn(&P, &S)>,
}

impl<A, Z, P, S> FnPolicy<A, Z, P, S>
where
    A: Fn(&P) -> bool + Send + Sync,
    Z: Fn(&P, &SubjectSet<S>) -> SubjectSet<S> + Send + Sync,
    P: Principal,
    S: Subject,
{
    pub fn new(authenticate: A, authorize: Z) -> Self {
        Self {
            authenticate,
            authorize,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<A, Z, P, S> AuthPolicy<P, S> for FnPolicy<A, Z, P, S>
where
    A: Fn(&P) -> bool + Send + Sync,
    Z: Fn(&P, &SubjectSet<S>) -> SubjectSet<S> + Send + Sync,
    P: Principal,
    S: Subject,
{
    async fn authenticate(&self, principal: &P) -> bool {
        (self.authenticate)(principal)
    }

    async fn authorize(&self, principal: &P, requested: &SubjectSet<S>) -> SubjectSet<S> {
        (self.authorize)(principal, requested)
    }
}

/// Accepts principals whose token is in a fixed allow list.
///
/// Grants no subjects: the reference endpoint needs none.
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy<T> {
    allowed: HashSet<T>,
}

impl<T> AllowListPolicy<T>
where
    T: std::hash::Hash + Eq,
{
    pub fn new(allowed: impl IntoIterator<Item = T>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl<T, P, S> AuthPolicy<P, S> for AllowListPolicy<T>
where
    T: SessionKey,
    P: Principal<Token = T>,
    S: Subject,
{
    async fn authenticate(&self, principal: &P) -> bool {
        principal
            .principal_token()
            .is_some_and(|token| self.allowed.contains(&token))
    }

    async fn authorize(&self, _principal: &P, _requested: &SubjectSet<S>) -> SubjectSet<S> {
        SubjectSet::new()
    }
}
