//! API Handlers
//!
//! HTTP request handlers for each stats card endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use tracing::debug;

use crate::cache::CacheStats;
use crate::card::{render_stats_card, svg_response, FRESH_CACHE_SECS, STALE_CACHE_SECS};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::ApiError;
use crate::github::{validate_username, GitHubClient, StatsFetcher, TieredFetcher};
use crate::models::{CardQuery, HealthResponse};

/// Application state shared across all handlers.
///
/// Holds the coordinator (which owns the cache store) and the loaded config.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState around an existing coordinator.
    pub fn new(coordinator: Coordinator, config: Config) -> Self {
        Self {
            coordinator,
            config: Arc::new(config),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the GitHub client and tiered fetcher, and a coordinator on the
    /// system clock.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let client = GitHubClient::from_config(&config)?;
        let fetcher: Arc<dyn StatsFetcher> = Arc::new(TieredFetcher::new(client));
        let coordinator = Coordinator::new(fetcher, Arc::new(SystemClock), config.cache_ttl);
        Ok(Self::new(coordinator, config))
    }
}

/// Handler for GET /api
///
/// Renders the stats card for `username`. Every outcome is an SVG with
/// status 200; failures render as an error card.
pub async fn card_handler(State(state): State<AppState>, Query(query): Query<CardQuery>) -> Response {
    let colors = query.card_colors();
    match render_card(&state, &query).await {
        Ok(response) => response,
        Err(err) => {
            debug!("Card request failed: {}", err);
            err.into_card_response(&colors)
        }
    }
}

async fn render_card(state: &AppState, query: &CardQuery) -> Result<Response, ApiError> {
    let username = query
        .username()
        .filter(|name| validate_username(name))
        .ok_or(ApiError::InvalidUsername)?;

    if !state.config.is_allowed(username) {
        return Err(ApiError::NotAllowed);
    }

    let resolved = state
        .coordinator
        .resolve(username)
        .await
        .map_err(|source| ApiError::Resolve {
            username: username.to_string(),
            source,
        })?;

    let mut options = query.card_options();
    options.stale = resolved.is_degraded();
    let svg = render_stats_card(&resolved.stats, &options, &query.card_colors());

    let cache_secs = if resolved.is_degraded() {
        STALE_CACHE_SECS
    } else {
        FRESH_CACHE_SECS
    };
    Ok(svg_response(svg, cache_secs, Some(resolved.served.label())))
}

/// Handler for GET /stats
///
/// Returns cache and lookup counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.coordinator.stats().await)
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
