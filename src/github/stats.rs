//! User statistics payload produced by the fetcher and held by the cache.

use serde::Serialize;

// == Completeness ==
/// How much of a user's history the statistics cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Lifetime totals from the enriched query.
    #[default]
    Complete,
    /// Assembled from narrower REST lookups; reviews and contributions only
    /// reflect recent public events.
    Partial,
}

// == User Stats ==
/// Activity counts for one GitHub user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub username: String,
    /// Display name, falling back to the login.
    pub name: String,
    pub avatar_url: String,
    pub followers: u64,
    pub total_repos: u64,
    pub total_stars: u64,
    pub total_commits: u64,
    pub total_prs: u64,
    pub total_prs_merged: u64,
    pub total_issues: u64,
    pub total_reviews: u64,
    /// Number of repositories contributed to.
    pub contributions: u64,
    pub completeness: Completeness,
    /// Non-fatal lookup failures noted while assembling partial data.
    pub errors: Vec<String>,
}

impl UserStats {
    /// Creates an empty record for `username` with the given completeness.
    pub fn new(username: impl Into<String>, completeness: Completeness) -> Self {
        let username = username.into();
        Self {
            name: username.clone(),
            username,
            completeness,
            ..Self::default()
        }
    }

    /// Returns true when the record came from the reduced query path.
    pub fn is_partial(&self) -> bool {
        self.completeness == Completeness::Partial
    }
}
