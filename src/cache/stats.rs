//! Cache Statistics Module
//!
//! Tracks how lookups were satisfied: cache hits, upstream fetches, joined
//! fetches, stale fallbacks and terminal failures.

use serde::Serialize;

// == Cache Stats ==
/// Lookup and fetch counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups that needed a refresh (stale or absent)
    pub misses: u64,
    /// Lookups that waited on another request's fetch
    pub joined: u64,
    /// Calls made to the upstream fetcher
    pub upstream_fetches: u64,
    /// Lookups answered with stale data after a failed refresh
    pub stale_served: u64,
    /// Lookups that ended in a terminal failure
    pub failures: u64,
    /// Entries removed by the expiry sweeper
    pub evictions: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn compute_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Moves a recorded miss to the hits: the refresh found a fresh entry
    /// written after the lookup's first read.
    pub fn record_late_hit(&mut self) {
        self.misses = self.misses.saturating_sub(1);
        self.hits += 1;
    }

    pub fn record_join(&mut self) {
        self.joined += 1;
    }

    pub fn record_upstream_fetch(&mut self) {
        self.upstream_fetches += 1;
    }

    pub fn record_stale_served(&mut self) {
        self.stale_served += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    // == Snapshot ==
    /// Returns a copy completed with store-owned figures and the hit rate.
    pub fn snapshot(&self, total_entries: usize, evictions: u64) -> Self {
        let mut snapshot = self.clone();
        snapshot.total_entries = total_entries;
        snapshot.evictions = evictions;
        snapshot.hit_rate = snapshot.compute_hit_rate();
        snapshot
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.upstream_fetches, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.compute_hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.compute_hit_rate(), 0.75);
    }

    #[test]
    fn test_late_hit_reclassifies_miss() {
        let mut stats = CacheStats::new();
        stats.record_miss();
        stats.record_miss();
        stats.record_late_hit();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.compute_hit_rate(), 0.5);
    }

    #[test]
    fn test_snapshot_fills_store_figures() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_join();
        stats.record_upstream_fetch();
        stats.record_stale_served();
        stats.record_failure();

        let snapshot = stats.snapshot(7, 3);
        assert_eq!(snapshot.total_entries, 7);
        assert_eq!(snapshot.evictions, 3);
        assert_eq!(snapshot.hit_rate, 0.5);
        assert_eq!(snapshot.joined, 1);
        assert_eq!(snapshot.stale_served, 1);
        assert_eq!(snapshot.failures, 1);
        // Source counters are left untouched
        assert_eq!(stats.total_entries, 0);
    }
}
