//! Tiered fetch: enriched GraphQL first, reduced REST lookups as fallback.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{validate_username, UserStats};
use crate::error::{FetchFailure, UpstreamError};

/// Outcome of one classified fetch.
pub type FetchResult = std::result::Result<UserStats, FetchFailure>;

// == Source Trait ==
/// The two upstream query shapes.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Lifetime statistics in one rich query.
    async fn fetch_enriched(&self, username: &str) -> Result<UserStats, UpstreamError>;

    /// Statistics combined from several narrower lookups.
    async fn fetch_reduced(&self, username: &str) -> Result<UserStats, UpstreamError>;
}

// == Fetcher Trait ==
/// Anything that turns a username into a classified [`FetchResult`].
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    async fn fetch(&self, username: &str) -> FetchResult;
}

// == Tier Decision ==
/// What to do after the enriched query returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierDecision {
    /// Use the enriched result as is.
    Accept,
    /// Try the reduced path.
    Fallback,
    /// Stop with this classification.
    Fail(FetchFailure),
}

/// Decides the next tier from the enriched query's result.
///
/// Rate limiting stops immediately because both tiers draw from the same
/// budget. A definitive not-found is final. Everything else (bad or missing
/// credential, unexpected status, malformed body, network trouble,
/// timeout) is worth a try on the reduced path.
pub fn next_tier(primary: &Result<UserStats, UpstreamError>) -> TierDecision {
    match primary {
        Ok(_) => TierDecision::Accept,
        Err(UpstreamError::RateLimited) => TierDecision::Fail(FetchFailure::RateLimited),
        Err(UpstreamError::NotFound) => TierDecision::Fail(FetchFailure::NotFound),
        Err(
            UpstreamError::Unauthorized
            | UpstreamError::Timeout
            | UpstreamError::Http { .. }
            | UpstreamError::Network(_)
            | UpstreamError::Malformed(_),
        ) => TierDecision::Fallback,
    }
}

// == Tiered Fetcher ==
/// [`StatsFetcher`] that applies [`next_tier`] over a [`StatsSource`].
///
/// Holds no state between calls and never retries; stale-serving is the
/// coordinator's business.
#[derive(Debug, Clone)]
pub struct TieredFetcher<S> {
    source: S,
}

impl<S: StatsSource> TieredFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: StatsSource> StatsFetcher for TieredFetcher<S> {
    async fn fetch(&self, username: &str) -> FetchResult {
        if !validate_username(username) {
            debug!("Rejecting invalid username {:?}", username);
            return Err(FetchFailure::NotFound);
        }

        let primary = self.source.fetch_enriched(username).await;
        match next_tier(&primary) {
            TierDecision::Accept => primary.map_err(FetchFailure::from),
            TierDecision::Fail(failure) => {
                warn!("Enriched fetch for {} failed: {}", username, failure);
                Err(failure)
            }
            TierDecision::Fallback => {
                if let Err(err) = &primary {
                    warn!(
                        "Enriched fetch for {} failed ({}), falling back to REST",
                        username, err
                    );
                }
                self.source.fetch_reduced(username).await.map_err(|err| {
                    warn!("Reduced fetch for {} failed: {}", username, err);
                    FetchFailure::from(err)
                })
            }
        }
    }
}
