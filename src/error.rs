//! Error types for the stats card service
//!
//! Provides unified error handling using thiserror.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::card::{render_error_card, svg_response, CardColors, ERROR_CACHE_SECS, NOT_FOUND_CACHE_SECS};

// == Fetch Failure ==
/// Classified failure of one upstream fetch.
///
/// This is all a caller ever learns about an upstream failure; the raw
/// detail stays in the fetcher's logs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Upstream request budget exhausted
    #[error("upstream rate limit exceeded")]
    RateLimited,

    /// The user does not exist
    #[error("user not found")]
    NotFound,

    /// Network failure, timeout or unusable response
    #[error("transient upstream failure")]
    Transient,
}

impl FetchFailure {
    /// Returns true if previously cached data may be served instead.
    pub fn allows_stale(self) -> bool {
        matches!(self, FetchFailure::RateLimited | FetchFailure::Transient)
    }
}

// == Upstream Error ==
/// Detailed outcome of a single upstream query attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Missing, invalid or insufficient credential
    #[error("unauthorized")]
    Unauthorized,

    /// Rate limit response
    #[error("rate limited")]
    RateLimited,

    /// The user does not exist
    #[error("not found")]
    NotFound,

    /// The attempt exceeded its time budget
    #[error("request timed out")]
    Timeout,

    /// Unexpected HTTP status
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Body could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::Http {
                status: status.as_u16(),
            }
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl From<UpstreamError> for FetchFailure {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::RateLimited => FetchFailure::RateLimited,
            UpstreamError::NotFound => FetchFailure::NotFound,
            _ => FetchFailure::Transient,
        }
    }
}

// == Resolve Error ==
/// Terminal outcome of a coordinated lookup.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// The user does not exist; cached data is never substituted
    #[error("user not found")]
    NotFound,

    /// The refresh failed and there was nothing cached to fall back to
    #[error("no data available: {cause}")]
    NoDataAvailable { cause: FetchFailure },
}

// == Api Error ==
/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Username does not follow GitHub's login rules
    #[error("Invalid username format")]
    InvalidUsername,

    /// Username is not on the configured allow-list
    #[error("User not authorized")]
    NotAllowed,

    /// Lookup failed for the named user
    #[error("{username}: {source}")]
    Resolve {
        username: String,
        source: ResolveError,
    },
}

impl ApiError {
    /// Message shown on the error card.
    pub fn card_message(&self) -> String {
        match self {
            ApiError::InvalidUsername | ApiError::NotAllowed => self.to_string(),
            ApiError::Resolve { username, source } => match source {
                ResolveError::NotFound => format!("User '{}' not found on GitHub", username),
                ResolveError::NoDataAvailable {
                    cause: FetchFailure::RateLimited,
                } => "GitHub API rate limit exceeded. Try again later.".to_string(),
                ResolveError::NoDataAvailable { .. } => {
                    "Failed to fetch GitHub data. Try again later.".to_string()
                }
            },
        }
    }

    /// Client cache lifetime for the error card, in seconds.
    pub fn cache_seconds(&self) -> u64 {
        match self {
            ApiError::Resolve {
                source: ResolveError::NotFound,
                ..
            } => NOT_FOUND_CACHE_SECS,
            _ => ERROR_CACHE_SECS,
        }
    }

    /// Renders the error as an SVG card in the given colors.
    pub fn into_card_response(self, colors: &CardColors) -> Response {
        let svg = render_error_card(&self.card_message(), colors);
        svg_response(svg, self.cache_seconds(), None)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_card_response(&CardColors::default())
    }
}
