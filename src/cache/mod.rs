//! Cache Module
//!
//! Volatile store of per-user statistics with TTL freshness and a
//! retention ceiling for eviction.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, Freshness};
pub use stats::CacheStats;
pub use store::{CacheStore, SharedStore};

// == Public Constants ==
/// Minimum freshness TTL for cached statistics (30 minutes)
pub const MIN_TTL_SECS: u64 = 1800;

/// Normalises a username into its cache key.
///
/// GitHub logins are case-insensitive, so `Alice` and `alice` share an entry.
pub fn cache_key(username: &str) -> String {
    username.trim().to_ascii_lowercase()
}
