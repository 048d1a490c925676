//! Cache Entry Module
//!
//! Defines a cached statistics record and its derived freshness state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::duration_ms;
use crate::github::UserStats;

// == Freshness ==
/// Freshness of a key at a point in time.
///
/// Never stored: always computed from `fetched_at`, the current time and
/// the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Fetched less than one TTL ago.
    Fresh,
    /// Present but older than the TTL; still usable as a fallback.
    Stale,
    /// No entry for the key.
    Absent,
}

// == Cache Entry ==
/// A successfully fetched value and the time it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored statistics
    pub value: Arc<UserStats>,
    /// Fetch timestamp (Unix milliseconds)
    pub fetched_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry fetched at `fetched_at`.
    pub fn new(value: Arc<UserStats>, fetched_at: u64) -> Self {
        Self { value, fetched_at }
    }

    // == Age ==
    /// Milliseconds elapsed since the fetch, zero if `now` precedes it.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.fetched_at)
    }

    // == Classify ==
    /// Classifies the entry as [`Freshness::Fresh`] or [`Freshness::Stale`].
    ///
    /// Boundary condition: an entry whose age equals the TTL is stale.
    pub fn classify(&self, now: u64, ttl: Duration) -> Freshness {
        if self.age_ms(now) < duration_ms(ttl) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }

    // == Is Expired ==
    /// Returns true once the entry is older than the retention ceiling.
    ///
    /// Strictly greater: an entry exactly at the ceiling is kept.
    pub fn is_expired(&self, now: u64, retention: Duration) -> bool {
        self.age_ms(now) > duration_ms(retention)
    }
}
