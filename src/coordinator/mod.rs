//! Coordinator Module
//!
//! Single-flight resolution of user statistics over the cache store.
//!
//! A fresh entry is returned straight from the store. Otherwise the first
//! caller for a key claims it and spawns the upstream fetch; every other
//! caller for that key waits on the same claim and receives the same
//! outcome. Recoverable fetch failures fall back to whatever the store
//! still holds.

mod claim;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

pub use claim::{Claim, ClaimGuard, ClaimRegistry, ClaimWaiter, FetchClaim};

use crate::cache::{cache_key, CacheStats, CacheStore, Freshness, SharedStore};
use crate::clock::Clock;
use crate::error::{FetchFailure, ResolveError};
use crate::github::{StatsFetcher, UserStats};

/// Outcome shared by every waiter on a claim.
pub type Outcome = Result<Resolved, ResolveError>;

// == Served ==
/// How a resolved value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Fresh entry already in the store
    Cached,
    /// Fetched from upstream for this request
    Refreshed,
    /// Refresh failed recoverably; this is the last known value
    Stale { cause: FetchFailure },
}

impl Served {
    /// Short label for headers and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Served::Cached => "cached",
            Served::Refreshed => "refreshed",
            Served::Stale { .. } => "stale",
        }
    }
}

// == Resolved ==
/// A usable value for the caller.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub stats: Arc<UserStats>,
    /// When the value was fetched (Unix milliseconds)
    pub fetched_at: u64,
    pub served: Served,
}

impl Resolved {
    /// Returns true when this is stale data served after a failed refresh.
    pub fn is_degraded(&self) -> bool {
        matches!(self.served, Served::Stale { .. })
    }
}

// == Coordinator ==
/// Owns the store, the claim registry and the fetcher.
///
/// Cheap to clone; clones share all state. Build one per process (or per
/// test) and hand it to whatever serves requests.
#[derive(Clone)]
pub struct Coordinator {
    store: SharedStore,
    claims: ClaimRegistry,
    fetcher: Arc<dyn StatsFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stats: Arc<Mutex<CacheStats>>,
}

impl Coordinator {
    // == Constructor ==
    /// Creates a coordinator with an empty store and registry.
    ///
    /// # Arguments
    /// * `fetcher` - Upstream fetcher
    /// * `clock` - Time source for freshness decisions
    /// * `ttl` - Freshness window
    pub fn new(fetcher: Arc<dyn StatsFetcher>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self::with_store(CacheStore::shared(), fetcher, clock, ttl)
    }

    /// Creates a coordinator over an existing store.
    pub fn with_store(
        store: SharedStore,
        fetcher: Arc<dyn StatsFetcher>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            claims: ClaimRegistry::new(),
            fetcher,
            clock,
            ttl,
            stats: Arc::new(Mutex::new(CacheStats::new())),
        }
    }

    /// The store, for the sweeper and for inspection.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Resolve ==
    /// Resolves statistics for `username`.
    ///
    /// Returns fresh data, freshly fetched data, or stale data after a
    /// rate-limited or transient failure. `NotFound` is never masked by
    /// stale data.
    pub async fn resolve(&self, username: &str) -> Result<Resolved, ResolveError> {
        let key = cache_key(username);
        let now = self.clock.now_ms();

        let cached = self.store.read().await.get(&key);
        if let Some(entry) = cached {
            if entry.classify(now, self.ttl) == Freshness::Fresh {
                self.record(CacheStats::record_hit);
                debug!("Serving cached stats for {}", key);
                return Ok(Resolved {
                    stats: entry.value,
                    fetched_at: entry.fetched_at,
                    served: Served::Cached,
                });
            }
        }
        self.record(CacheStats::record_miss);

        let waiter = match self.claims.claim(&key) {
            Claim::Leader(guard) => {
                let waiter = guard.subscribe();
                let this = self.clone();
                // Detached so that a caller going away never cancels the fetch
                tokio::spawn(async move { this.run_fetch(guard).await });
                waiter
            }
            Claim::Joined(waiter) => {
                self.record(CacheStats::record_join);
                debug!("Joining in-flight fetch for {}", key);
                waiter
            }
        };

        let outcome = waiter.wait().await;
        match &outcome {
            Ok(resolved) if resolved.is_degraded() => self.record(CacheStats::record_stale_served),
            Ok(resolved) if resolved.served == Served::Cached => {
                self.record(CacheStats::record_late_hit)
            }
            Ok(_) => {}
            Err(_) => self.record(CacheStats::record_failure),
        }
        outcome
    }

    /// Runs the claimed fetch and publishes its outcome.
    async fn run_fetch(&self, guard: ClaimGuard) {
        let outcome = self.fetch_and_store(guard.key()).await;
        guard.complete(outcome);
    }

    async fn fetch_and_store(&self, key: &str) -> Outcome {
        // Another fetch may have landed between the caller's read and its claim
        let current = self.store.read().await.get(key);
        if let Some(entry) = &current {
            if entry.classify(self.clock.now_ms(), self.ttl) == Freshness::Fresh {
                return Ok(Resolved {
                    stats: Arc::clone(&entry.value),
                    fetched_at: entry.fetched_at,
                    served: Served::Cached,
                });
            }
        }

        self.record(CacheStats::record_upstream_fetch);
        match self.fetcher.fetch(key).await {
            Ok(stats) => {
                let stats = Arc::new(stats);
                let now = self.clock.now_ms();
                self.store.write().await.put(key, Arc::clone(&stats), now);
                info!("Fetched fresh stats for {}", key);
                Ok(Resolved {
                    stats,
                    fetched_at: now,
                    served: Served::Refreshed,
                })
            }
            Err(cause) if cause.allows_stale() => {
                // Re-read: the sweeper may have run while the fetch was in flight
                let fallback = self.store.read().await.get(key);
                match fallback {
                    Some(entry) => {
                        info!("Serving stale stats for {} ({})", key, cause);
                        Ok(Resolved {
                            stats: entry.value,
                            fetched_at: entry.fetched_at,
                            served: Served::Stale { cause },
                        })
                    }
                    None => {
                        warn!("No cached stats to fall back to for {} ({})", key, cause);
                        Err(ResolveError::NoDataAvailable { cause })
                    }
                }
            }
            Err(_) => {
                info!("User {} not found upstream", key);
                Err(ResolveError::NotFound)
            }
        }
    }

    // == Stats ==
    /// Returns a snapshot of lookup counters and store size.
    pub async fn stats(&self) -> CacheStats {
        let (len, evictions) = {
            let store = self.store.read().await;
            (store.len(), store.evictions())
        };
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(len, evictions)
    }

    fn record(&self, update: fn(&mut CacheStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::github::{Completeness, FetchResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(30 * 60);

    /// Fetcher replaying scripted results, optionally held at a gate.
    struct ScriptedFetcher {
        results: Mutex<VecDeque<FetchResult>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedFetcher {
        fn new(results: Vec<FetchResult>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(results: Vec<FetchResult>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(results)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsFetcher for ScriptedFetcher {
        async fn fetch(&self, _username: &str) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchFailure::Transient))
        }
    }

    fn stats(stars: u64) -> UserStats {
        UserStats {
            total_stars: stars,
            ..UserStats::new("alice", Completeness::Complete)
        }
    }

    fn coordinator(fetcher: Arc<ScriptedFetcher>, clock: Arc<ManualClock>) -> Coordinator {
        Coordinator::new(fetcher, clock, TTL)
    }

    #[tokio::test]
    async fn test_resolve_fetches_then_caches() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(stats(1))]));
        let clock = Arc::new(ManualClock::new(0));
        let coordinator = coordinator(fetcher.clone(), clock.clone());

        let first = coordinator.resolve("alice").await.unwrap();
        assert_eq!(first.served, Served::Refreshed);

        clock.advance(Duration::from_secs(60));
        let second = coordinator.resolve("ALICE").await.unwrap();
        assert_eq!(second.served, Served::Cached);
        assert!(Arc::ptr_eq(&first.stats, &second.stats));
        assert_eq!(fetcher.calls(), 1);

        let snapshot = coordinator.stats().await;
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.upstream_fetches, 1);
        assert_eq!(snapshot.total_entries, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_serves_stale() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(stats(1)),
            Err(FetchFailure::Transient),
        ]));
        let clock = Arc::new(ManualClock::new(0));
        let coordinator = coordinator(fetcher.clone(), clock.clone());

        coordinator.resolve("alice").await.unwrap();
        clock.advance(TTL);

        let resolved = coordinator.resolve("alice").await.unwrap();
        assert_eq!(
            resolved.served,
            Served::Stale {
                cause: FetchFailure::Transient
            }
        );
        assert_eq!(resolved.stats.total_stars, 1);
        assert_eq!(resolved.fetched_at, 0);
        // The failed refresh left the entry untouched
        assert_eq!(coordinator.store().read().await.get("alice").unwrap().fetched_at, 0);
        assert_eq!(coordinator.stats().await.stale_served, 1);
    }

    #[tokio::test]
    async fn test_failure_without_entry_is_no_data() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(FetchFailure::RateLimited)]));
        let coordinator = coordinator(fetcher, Arc::new(ManualClock::new(0)));

        assert_eq!(
            coordinator.resolve("alice").await.unwrap_err(),
            ResolveError::NoDataAvailable {
                cause: FetchFailure::RateLimited
            }
        );
        assert!(coordinator.store().read().await.is_empty());
        assert_eq!(coordinator.stats().await.failures, 1);
    }

    #[tokio::test]
    async fn test_not_found_never_serves_stale() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(stats(1)),
            Err(FetchFailure::NotFound),
        ]));
        let clock = Arc::new(ManualClock::new(0));
        let coordinator = coordinator(fetcher, clock.clone());

        coordinator.resolve("alice").await.unwrap();
        clock.advance(TTL * 2);

        assert_eq!(
            coordinator.resolve("alice").await.unwrap_err(),
            ResolveError::NotFound
        );
        // Eviction is left to the sweeper
        assert!(coordinator.store().read().await.get("alice").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(ScriptedFetcher::gated(vec![Ok(stats(9))], gate.clone()));
        let coordinator = coordinator(fetcher.clone(), Arc::new(ManualClock::new(0)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.resolve("alice").await })
            })
            .collect();

        // Let every task reach its claim before releasing the fetch
        while coordinator.stats().await.misses < 16 {
            tokio::task::yield_now().await;
        }
        assert_eq!(coordinator.claims().inflight_count(), 1);
        gate.notify_one();

        for task in tasks {
            let resolved = task.await.unwrap().unwrap();
            assert_eq!(resolved.stats.total_stars, 9);
        }
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(coordinator.stats().await.joined, 15);
        assert_eq!(coordinator.claims().inflight_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_survives_caller_cancellation() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(ScriptedFetcher::gated(vec![Ok(stats(3))], gate.clone()));
        let coordinator = coordinator(fetcher.clone(), Arc::new(ManualClock::new(0)));

        let caller = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.resolve("alice").await })
        };
        while coordinator.claims().inflight_count() == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();
        gate.notify_one();

        while coordinator.claims().is_inflight("alice") {
            tokio::task::yield_now().await;
        }
        let entry = coordinator.store().read().await.get("alice").unwrap();
        assert_eq!(entry.value.total_stars, 3);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_leader_rechecks_store_before_fetching() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(stats(1))]));
        let coordinator = coordinator(fetcher.clone(), Arc::new(ManualClock::new(0)));

        // Simulate a fetch that landed after the caller's read
        coordinator
            .store()
            .write()
            .await
            .put("alice", Arc::new(stats(5)), 0);
        let Claim::Leader(guard) = coordinator.claims().claim("alice") else {
            panic!("expected leader");
        };
        let waiter = guard.subscribe();
        coordinator.run_fetch(guard).await;

        let resolved = waiter.wait().await.unwrap();
        assert_eq!(resolved.stats.total_stars, 5);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_late_fresh_entry_counts_as_hit() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(stats(1))]));
        let coordinator = coordinator(fetcher.clone(), Arc::new(ManualClock::new(0)));

        let Claim::Leader(guard) = coordinator.claims().claim("alice") else {
            panic!("expected leader");
        };
        let caller = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.resolve("alice").await })
        };
        while coordinator.stats().await.joined == 0 {
            tokio::task::yield_now().await;
        }

        // The entry lands after the caller's read but before the refresh runs
        coordinator
            .store()
            .write()
            .await
            .put("alice", Arc::new(stats(5)), 0);
        coordinator.run_fetch(guard).await;

        let resolved = caller.await.unwrap().unwrap();
        assert_eq!(resolved.served, Served::Cached);
        assert_eq!(fetcher.calls(), 0);

        let snapshot = coordinator.stats().await;
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.upstream_fetches, 0);
        assert_eq!(snapshot.hit_rate, 1.0);
    }
}
