//! GitHub Module
//!
//! Fetches user statistics from GitHub. The enriched tier is a single
//! GraphQL query that needs a token; the reduced tier stitches together
//! REST profile, repository, event and search lookups.

mod client;
mod graphql;
mod rest;
mod stats;
mod tier;

pub use client::{check_status, GitHubClient};
pub use stats::{Completeness, UserStats};
pub use tier::{next_tier, FetchResult, StatsFetcher, StatsSource, TierDecision, TieredFetcher};

// == Public Constants ==
/// Upper bound on repository pages (of 100) walked when summing stars.
pub const MAX_REPO_PAGES: u32 = 10;

/// Maximum GitHub login length.
pub const MAX_USERNAME_LENGTH: usize = 39;

/// Checks a username against GitHub's login rules.
///
/// 1 to 39 ASCII alphanumerics or hyphens; no leading, trailing or
/// consecutive hyphens.
pub fn validate_username(username: &str) -> bool {
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
        return false;
    }
    if username.starts_with('-') || username.ends_with('-') || username.contains("--") {
        return false;
    }
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
