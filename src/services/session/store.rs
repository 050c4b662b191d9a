//! In-process session cache.
//!
//! Maps a session key (derived from the principal token) to the last
//! authentication decision for that principal, valid until an absolute
//! `expires_at`. Expired records are evicted lazily on the next access to the
//! same key, or in bulk by `purge_expired`.
//!
//! Every operation runs inside one critical section over the whole map, so the
//! read-and-extend of a sliding refresh is atomic w.r.t. other accessors.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use crate::services::auth::identity::{SessionKey, Subject, SubjectSet};
use crate::services::session::clock::{Clock, SystemClock};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session key")]
    InvalidKey,
    #[error("invalid session ttl: {0:?}")]
    InvalidTtl(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a cached decision stays valid absent refresh.
    pub ttl: Duration,
    /// Slide `expires_at` forward on every cache hit.
    pub refresh_on_access: bool,
}

impl SessionConfig {
    pub fn new(ttl: Duration, refresh_on_access: bool) -> Self {
        Self {
            ttl,
            refresh_on_access,
        }
    }
}

/// Cached authentication decision for one session key.
#[derive(Debug, Clone)]
pub struct SessionRecord<K, S: Subject> {
    pub key: K,
    pub authenticated: bool,
    pub subjects: SubjectSet<S>,
    pub expires_at: DateTime<Utc>,
}

impl<K, S: Subject> SessionRecord<K, S> {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct SessionStore<K, S: Subject> {
    config: SessionConfig,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, SessionRecord<K, S>>>,
}

impl<K, S: Subject> std::fmt::Debug for SessionStore<K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

impl<K: SessionKey, S: Subject> SessionStore<K, S> {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Result<Self, SessionError> {
        if config.ttl.is_zero() {
            return Err(SessionError::InvalidTtl(config.ttl));
        }
        let ttl =
            TimeDelta::from_std(config.ttl).map_err(|_| SessionError::InvalidTtl(config.ttl))?;

        Ok(Self {
            config,
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_system_clock(config: SessionConfig) -> Result<Self, SessionError> {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Look up a fresh record.
    ///
    /// An expired record is removed and reported as absent. With
    /// `refresh_on_access`, a hit moves `expires_at` to `now + ttl` before the
    /// record is returned.
    pub fn get(&self, key: &K) -> Result<Option<SessionRecord<K, S>>, SessionError> {
        ensure_valid(key)?;
        let now = self.clock.now();

        let mut entries = self.entries.lock();
        match entries.entry(key.clone()) {
            Entry::Vacant(_) => Ok(None),
            Entry::Occupied(entry) if !entry.get().is_valid_at(now) => {
                let expired_at = entry.get().expires_at;
                tracing::debug!(key = ?key, expired_at = %expired_at, "session expired");
                entry.remove();
                Ok(None)
            }
            Entry::Occupied(mut entry) => {
                if self.config.refresh_on_access {
                    entry.get_mut().expires_at = self.expiry_from(now);
                }
                Ok(Some(entry.get().clone()))
            }
        }
    }

    /// Insert or overwrite the record for `key` with `expires_at = now + ttl`.
    ///
    /// Last writer wins.
    pub fn put(
        &self,
        key: K,
        authenticated: bool,
        subjects: SubjectSet<S>,
    ) -> Result<SessionRecord<K, S>, SessionError> {
        ensure_valid(&key)?;
        let record = SessionRecord {
            key: key.clone(),
            authenticated,
            subjects,
            expires_at: self.expiry_from(self.clock.now()),
        };

        self.entries.lock().insert(key, record.clone());
        Ok(record)
    }

    /// Drop the record for `key`. Returns whether one was present.
    pub fn remove(&self, key: &K) -> Result<bool, SessionError> {
        ensure_valid(key)?;
        Ok(self.entries.lock().remove(key).is_some())
    }

    /// Remove every expired record; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, record| record.is_valid_at(now));
        before - entries.len()
    }

    /// Number of stored records, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn ensure_valid<K: SessionKey>(key: &K) -> Result<(), SessionError> {
    if key.is_valid() {
        Ok(())
    } else {
        Err(SessionError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::identity::SubjectId;
    use crate::services::session::clock::ManualClock;

    fn store(ttl_secs: u64, refresh: bool) -> (Arc<ManualClock>, SessionStore<String, SubjectId>) {
        let clock = Arc::new(ManualClock::default());
        let store = SessionStore::new(
            SessionConfig::new(Duration::from_secs(ttl_secs), refresh),
            clock.clone(),
        )
        .unwrap();
        (clock, store)
    }

    fn subjects(ids: &[&str]) -> SubjectSet<SubjectId> {
        ids.iter().copied().map(SubjectId::new).collect()
    }

    #[test]
    fn rejects_zero_ttl() {
        let err = SessionStore::<String, SubjectId>::with_system_clock(SessionConfig::new(
            Duration::ZERO,
            false,
        ))
        .unwrap_err();
        assert_eq!(err, SessionError::InvalidTtl(Duration::ZERO));
    }

    #[test]
    fn put_then_get_returns_record() {
        let (clock, store) = store(5, false);
        let t0 = clock.now();

        store.put("1".to_string(), true, subjects(&["a"])).unwrap();
        let record = store.get(&"1".to_string()).unwrap().unwrap();

        assert!(record.authenticated);
        assert_eq!(record.key, "1");
        assert_eq!(record.subjects, subjects(&["a"]));
        assert_eq!(record.expires_at, t0 + TimeDelta::seconds(5));
    }

    #[test]
    fn get_missing_key_is_none() {
        let (_, store) = store(5, false);
        assert!(store.get(&"nobody".to_string()).unwrap().is_none());
    }

    #[test]
    fn blank_keys_are_rejected() {
        let (_, store) = store(5, false);
        assert_eq!(
            store.put(String::new(), true, SubjectSet::new()).unwrap_err(),
            SessionError::InvalidKey
        );
        assert_eq!(
            store.get(&" ".to_string()).unwrap_err(),
            SessionError::InvalidKey
        );
        assert_eq!(
            store.remove(&String::new()).unwrap_err(),
            SessionError::InvalidKey
        );
        assert!(store.is_empty());
    }

    #[test]
    fn record_expires_exactly_at_ttl_and_is_evicted() {
        let (clock, store) = store(5, false);
        store.put("1".to_string(), true, SubjectSet::new()).unwrap();

        clock.advance(TimeDelta::seconds(5) - TimeDelta::milliseconds(1));
        assert!(store.get(&"1".to_string()).unwrap().is_some());

        clock.advance(TimeDelta::milliseconds(1));
        assert!(store.get(&"1".to_string()).unwrap().is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn hit_without_refresh_keeps_expiry() {
        let (clock, store) = store(5, false);
        let first = store.put("1".to_string(), true, SubjectSet::new()).unwrap();

        clock.advance(TimeDelta::seconds(4));
        let hit = store.get(&"1".to_string()).unwrap().unwrap();
        assert_eq!(hit.expires_at, first.expires_at);

        clock.advance(TimeDelta::seconds(2));
        assert!(store.get(&"1".to_string()).unwrap().is_none());
    }

    #[test]
    fn hit_with_refresh_slides_expiry() {
        let (clock, store) = store(5, true);
        let t0 = clock.now();
        store.put("1".to_string(), true, SubjectSet::new()).unwrap();

        clock.advance(TimeDelta::seconds(4));
        let hit = store.get(&"1".to_string()).unwrap().unwrap();
        assert_eq!(hit.expires_at, t0 + TimeDelta::seconds(9));

        // past the first expiry, before the extended one
        clock.advance(TimeDelta::seconds(2));
        assert!(store.get(&"1".to_string()).unwrap().is_some());
    }

    #[test]
    fn put_overwrites_last_writer_wins() {
        let (clock, store) = store(5, false);
        store.put("1".to_string(), false, SubjectSet::new()).unwrap();
        clock.advance(TimeDelta::seconds(3));
        store.put("1".to_string(), true, subjects(&["x"])).unwrap();

        let record = store.get(&"1".to_string()).unwrap().unwrap();
        assert!(record.authenticated);
        assert_eq!(record.subjects, subjects(&["x"]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let (_, store) = store(5, false);
        store.put("1".to_string(), true, SubjectSet::new()).unwrap();
        assert!(store.remove(&"1".to_string()).unwrap());
        assert!(!store.remove(&"1".to_string()).unwrap());
    }

    #[test]
    fn purge_expired_drops_only_stale_records() {
        let (clock, store) = store(5, false);
        store.put("old".to_string(), true, SubjectSet::new()).unwrap();
        clock.advance(TimeDelta::seconds(3));
        store.put("new".to_string(), true, SubjectSet::new()).unwrap();
        clock.advance(TimeDelta::seconds(3));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&"new".to_string()).unwrap().is_some());
    }

    #[test]
    fn concurrent_puts_leave_one_record() {
        let (_, store) = store(5, true);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.put("1".to_string(), true, SubjectSet::new()).unwrap();
                        assert!(store.get(&"1".to_string()).unwrap().is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1);
    }
}
