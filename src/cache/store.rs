//! Cache Store Module
//!
//! Subject-keyed storage of user statistics with TTL classification and
//! retention-based sweeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::{CacheEntry, Freshness};
use crate::github::UserStats;

/// Store handle shared between the coordinator, its fetch tasks and the
/// sweeper.
pub type SharedStore = Arc<RwLock<CacheStore>>;

// == Cache Store ==
/// In-memory map from normalised username to its last good statistics.
///
/// Entries are only ever removed by [`CacheStore::sweep_expired`]; a failed
/// refresh leaves the previous value in place for stale-serving.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Entries removed by sweeps since creation
    evictions: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store wrapped for sharing across tasks.
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    // == Get ==
    /// Returns a copy of the entry for `key`, if any.
    ///
    /// Stale entries are returned as well; freshness is the caller's call.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    // == Put ==
    /// Stores `value` for `key` as fetched at `now`.
    ///
    /// Writes are ordered by timestamp: a write older than the stored one
    /// is ignored. Returns true if the entry was written.
    ///
    /// # Arguments
    /// * `key` - Normalised username
    /// * `value` - Freshly fetched statistics
    /// * `now` - Fetch completion time (Unix milliseconds)
    pub fn put(&mut self, key: impl Into<String>, value: Arc<UserStats>, now: u64) -> bool {
        let key = key.into();
        if let Some(existing) = self.entries.get(&key) {
            if existing.fetched_at > now {
                return false;
            }
        }
        self.entries.insert(key, CacheEntry::new(value, now));
        true
    }

    // == Classify ==
    /// Classifies an entry against `ttl` at `now`.
    pub fn classify(entry: &CacheEntry, now: u64, ttl: Duration) -> Freshness {
        entry.classify(now, ttl)
    }

    // == Freshness ==
    /// Returns the freshness of `key`, including [`Freshness::Absent`].
    pub fn freshness(&self, key: &str, now: u64, ttl: Duration) -> Freshness {
        self.entries
            .get(key)
            .map_or(Freshness::Absent, |entry| entry.classify(now, ttl))
    }

    // == Sweep Expired ==
    /// Removes every entry older than `retention` at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now: u64, retention: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, retention));
        let removed = before - self.entries.len();
        self.evictions += removed as u64;
        removed
    }

    // == Evictions ==
    /// Returns the total number of entries removed by sweeps.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
