/*
 * Responsibility
 * - Principal / Subject の capability contract
 * - Session key として使える token 型の条件 (SessionKey)
 * - SubjectSet (token で重複排除される順序なし集合)
 * - HTTP binding が使う具体型 (RequestPrincipal, SubjectId)
 */
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

/// A comparable token usable as a session key.
///
/// Two principals share a session iff their tokens are equal.
pub trait SessionKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Whether this key may be cached under. Invalid keys are a caller error.
    fn is_valid(&self) -> bool {
        true
    }
}

impl SessionKey for String {
    fn is_valid(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl SessionKey for &'static str {
    fn is_valid(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl SessionKey for u64 {}
impl SessionKey for i64 {}
impl SessionKey for uuid::Uuid {}

/// The identity making a request.
pub trait Principal: Send + Sync {
    type Token: SessionKey;

    /// `None` means the caller is anonymous.
    fn principal_token(&self) -> Option<Self::Token>;
}

/// An identity or resource a principal may act upon.
pub trait Subject: Clone + Debug + Send + Sync + 'static {
    type Token: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn subject_token(&self) -> Self::Token;
}

/// Unordered set of subjects, deduplicated by subject token.
#[derive(Debug, Clone)]
pub struct SubjectSet<S: Subject> {
    items: HashMap<S::Token, S>,
}

impl<S: Subject> SubjectSet<S> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Returns `false` when a subject with the same token was already present.
    pub fn insert(&mut self, subject: S) -> bool {
        self.items.insert(subject.subject_token(), subject).is_none()
    }

    pub fn contains(&self, token: &S::Token) -> bool {
        self.items.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.items.values()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &S::Token> {
        self.items.keys()
    }
}

impl<S: Subject> Default for SubjectSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Subject> PartialEq for SubjectSet<S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.tokens().all(|t| other.contains(t))
    }
}

impl<S: Subject> Eq for SubjectSet<S> {}

impl<S: Subject> FromIterator<S> for SubjectSet<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for subject in iter {
            set.insert(subject);
        }
        set
    }
}

impl<S: Subject> IntoIterator for SubjectSet<S> {
    type Item = S;
    type IntoIter = hash_map::IntoValues<S::Token, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

/// Principal built by the transport from a request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPrincipal {
    pub id: String,
}

impl RequestPrincipal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Principal for RequestPrincipal {
    type Token = String;

    fn principal_token(&self) -> Option<String> {
        // blank ids are anonymous; anything else is compared verbatim
        (!self.id.trim().is_empty()).then(|| self.id.clone())
    }
}

/// String-identified subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Subject for SubjectId {
    type Token = String;

    fn subject_token(&self) -> String {
        self.0.clone()
    }
}
