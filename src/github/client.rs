//! HTTP client for the GitHub GraphQL and REST APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::graphql::{self, REPOS_PAGE_QUERY};
use super::{rest, StatsSource, UserStats, MAX_REPO_PAGES};
use crate::config::Config;
use crate::error::UpstreamError;

const CLIENT_USER_AGENT: &str = concat!("stats_card/", env!("CARGO_PKG_VERSION"));
const REST_ACCEPT: &str = "application/vnd.github.v3+json";

// == Status Classification ==
/// Classifies an HTTP response by status, rate-limit header and body.
///
/// GitHub signals exhausted budgets with 403 (primary limit, with
/// `x-ratelimit-remaining: 0` or a "rate limit" message) or 429 (secondary
/// limit). Any other 403 is an ordinary HTTP failure.
pub fn check_status(
    status: u16,
    ratelimit_remaining: Option<&str>,
    body: &str,
) -> Result<(), UpstreamError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(UpstreamError::Unauthorized),
        429 => Err(UpstreamError::RateLimited),
        403 if ratelimit_remaining == Some("0")
            || body.to_ascii_lowercase().contains("rate limit") =>
        {
            Err(UpstreamError::RateLimited)
        }
        404 => Err(UpstreamError::NotFound),
        status => Err(UpstreamError::Http { status }),
    }
}

// == GitHub Client ==
/// GitHub API client implementing both query tiers.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    graphql_url: String,
    token: Option<String>,
}

impl GitHubClient {
    // == Constructor ==
    /// Creates a client with a per-request timeout.
    ///
    /// # Arguments
    /// * `api_url` - REST base URL, e.g. `https://api.github.com`
    /// * `graphql_url` - GraphQL endpoint URL
    /// * `token` - Optional personal access token
    /// * `timeout` - Budget for each HTTP attempt
    pub fn new(
        api_url: impl Into<String>,
        graphql_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            graphql_url: graphql_url.into(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Creates a client from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.github_api_url.clone(),
            config.github_graphql_url.clone(),
            config.github_token.clone(),
            config.upstream_timeout,
        )
    }

    /// Returns true if a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    // == Requests ==
    /// Sends a request and returns the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, UpstreamError> {
        let response = request.send().await?;
        read_body(response).await
    }

    /// GET against the REST API, decoding the JSON body.
    pub(crate) async fn rest_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header(ACCEPT, REST_ACCEPT)
            .query(query);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }

    /// POST a GraphQL query, returning the raw body.
    async fn graphql(&self, token: &str, payload: serde_json::Value) -> Result<String, UpstreamError> {
        let request = self
            .http
            .post(&self.graphql_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .json(&payload);
        self.send(request).await
    }

    /// Adds stars from repository pages after the first.
    async fn sum_remaining_stars(
        &self,
        token: &str,
        username: &str,
        mut cursor: Option<String>,
    ) -> Result<u64, UpstreamError> {
        let mut stars = 0;
        let mut page = 1;
        while let Some(after) = cursor.take() {
            if page >= MAX_REPO_PAGES {
                break;
            }
            page += 1;

            let payload = json!({
                "query": REPOS_PAGE_QUERY,
                "variables": { "username": username, "cursor": after },
            });
            let body = self.graphql(token, payload).await?;
            match graphql::parse_repo_page(&body)? {
                Some(star_page) => {
                    stars += star_page.stars;
                    cursor = star_page.next_cursor;
                }
                None => {
                    debug!("Stopping star pagination for {} at page {}", username, page);
                    break;
                }
            }
        }
        Ok(stars)
    }
}

/// Reads a response body, classifying failures.
async fn read_body(response: Response) -> Result<String, UpstreamError> {
    let status = response.status().as_u16();
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await?;

    check_status(status, remaining.as_deref(), &body)?;
    Ok(body)
}

#[async_trait]
impl StatsSource for GitHubClient {
    async fn fetch_enriched(&self, username: &str) -> Result<UserStats, UpstreamError> {
        let Some(token) = self.token.as_deref() else {
            debug!("No GitHub token configured, skipping GraphQL for {}", username);
            return Err(UpstreamError::Unauthorized);
        };

        let payload = json!({
            "query": graphql::stats_query(username),
            "variables": { "username": username },
        });
        let body = self.graphql(token, payload).await.inspect_err(|err| {
            if *err == UpstreamError::Unauthorized {
                warn!("GitHub token was rejected by the GraphQL API");
            }
        })?;

        let (mut stats, cursor) = graphql::parse_stats(username, &body)?;
        stats.total_stars += self.sum_remaining_stars(token, username, cursor).await?;

        info!("Fetched stats for {} via GraphQL", username);
        Ok(stats)
    }

    async fn fetch_reduced(&self, username: &str) -> Result<UserStats, UpstreamError> {
        let stats = rest::fetch_reduced(self, username).await?;
        info!(
            "Fetched partial stats for {} via REST ({} lookup errors)",
            username,
            stats.errors.len()
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_success() {
        assert_eq!(check_status(200, Some("4999"), "{}"), Ok(()));
        assert_eq!(check_status(204, None, ""), Ok(()));
    }

    #[test]
    fn test_check_status_rate_limited() {
        assert_eq!(
            check_status(403, Some("0"), "{}"),
            Err(UpstreamError::RateLimited)
        );
        assert_eq!(
            check_status(403, Some("12"), r#"{"message":"API Rate Limit exceeded"}"#),
            Err(UpstreamError::RateLimited)
        );
        assert_eq!(check_status(429, None, ""), Err(UpstreamError::RateLimited));
    }

    #[test]
    fn test_check_status_plain_forbidden() {
        assert_eq!(
            check_status(403, Some("100"), r#"{"message":"Resource not accessible"}"#),
            Err(UpstreamError::Http { status: 403 })
        );
    }

    #[test]
    fn test_check_status_other_failures() {
        assert_eq!(check_status(401, None, ""), Err(UpstreamError::Unauthorized));
        assert_eq!(check_status(404, None, ""), Err(UpstreamError::NotFound));
        assert_eq!(
            check_status(502, None, "bad gateway"),
            Err(UpstreamError::Http { status: 502 })
        );
    }

    #[test]
    fn test_client_ignores_blank_token() {
        let client = GitHubClient::new(
            "https://api.github.com/",
            "https://api.github.com/graphql",
            Some("   ".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(!client.has_token());
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[tokio::test]
    async fn test_enriched_without_token_is_unauthorized() {
        let client = GitHubClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/graphql",
            None,
            Duration::from_millis(100),
        )
        .unwrap();

        assert_eq!(
            client.fetch_enriched("alice").await,
            Err(UpstreamError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_or_timeout() {
        // Port 9 (discard) is closed on test hosts
        let client = GitHubClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/graphql",
            None,
            Duration::from_millis(500),
        )
        .unwrap();

        let result: Result<serde_json::Value, _> = client.rest_get("/users/alice", &[]).await;
        assert!(matches!(
            result,
            Err(UpstreamError::Network(_)) | Err(UpstreamError::Timeout)
        ));
    }
}
