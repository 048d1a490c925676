//! Expiry Sweeper Task
//!
//! Background task that periodically evicts entries older than the
//! retention ceiling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;
use crate::clock::Clock;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between runs.
/// Each run takes the store's write lock only for the duration of
/// [`CacheStore::sweep_expired`](crate::cache::CacheStore::sweep_expired);
/// in-flight fetches are never waited on.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `clock` - Time source used for entry ages
/// * `interval` - Time between sweeps
/// * `retention` - Age beyond which entries are evicted
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = CacheStore::shared();
/// let handle = spawn_sweep_task(store.clone(), Arc::new(SystemClock), interval, retention);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(
    store: SharedStore,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting expiry sweeper every {}s with {}s retention",
            interval.as_secs(),
            retention.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut guard = store.write().await;
                let removed = guard.sweep_expired(clock.now_ms(), retention);
                (removed, guard.len())
            };

            if removed > 0 {
                info!(
                    "Expiry sweep: removed {} entries, {} remaining",
                    removed, remaining
                );
            } else {
                debug!("Expiry sweep: nothing to remove ({} entries)", remaining);
            }
        }
    })
}
