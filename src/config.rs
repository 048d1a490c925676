//! Configuration Module
//!
//! Handles loading and managing service configuration from environment
//! variables.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::cache::MIN_TTL_SECS;

/// Default REST base URL
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
/// Default GraphQL endpoint
pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Freshness window for cached statistics
    pub cache_ttl: Duration,
    /// Age after which stale entries are evicted; always greater than the TTL
    pub retention: Duration,
    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
    /// Budget for each upstream HTTP attempt
    pub upstream_timeout: Duration,
    /// Optional GitHub token; enables the GraphQL tier
    pub github_token: Option<String>,
    /// REST base URL
    pub github_api_url: String,
    /// GraphQL endpoint URL
    pub github_graphql_url: String,
    /// Lowercased usernames allowed to render cards; None allows everyone
    pub allowed_users: Option<HashSet<String>>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL` - Freshness TTL in seconds (default and minimum: 1800)
    /// - `CACHE_RETENTION` - Stale retention ceiling in seconds (default: 7200)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `UPSTREAM_TIMEOUT` - Per-request timeout in seconds (default: 15)
    /// - `GITHUB_TOKEN` - Personal access token (optional)
    /// - `GITHUB_API_URL` / `GITHUB_GRAPHQL_URL` - Upstream endpoints
    /// - `ALLOWED_USERS` - Comma-separated allow-list (optional)
    /// - `ALLOWED_USERS_FILE` - Allow-list file used when `ALLOWED_USERS`
    ///   is unset (default: `allowed_users.txt`)
    pub fn from_env() -> Self {
        let allowed_users = env::var("ALLOWED_USERS")
            .ok()
            .and_then(|v| parse_allowed_users(&v))
            .or_else(|| {
                let path = env::var("ALLOWED_USERS_FILE")
                    .unwrap_or_else(|_| "allowed_users.txt".to_string());
                load_allowed_users_file(Path::new(&path))
            });

        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL").unwrap_or(MIN_TTL_SECS)),
            retention: Duration::from_secs(env_parse("CACHE_RETENTION").unwrap_or(7200)),
            sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL").unwrap_or(300)),
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT").unwrap_or(15)),
            github_token: env::var("GITHUB_TOKEN")
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
            github_graphql_url: env::var("GITHUB_GRAPHQL_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_GRAPHQL_URL.to_string()),
            allowed_users,
        }
        .normalized()
    }

    /// Enforces the TTL floor and a retention ceiling above the TTL.
    ///
    /// A retention that does not exceed the TTL is raised to four TTLs.
    pub fn normalized(mut self) -> Self {
        let min_ttl = Duration::from_secs(MIN_TTL_SECS);
        if self.cache_ttl < min_ttl {
            warn!(
                "CACHE_TTL of {}s is below the {}s minimum, using the minimum",
                self.cache_ttl.as_secs(),
                MIN_TTL_SECS
            );
            self.cache_ttl = min_ttl;
        }
        if self.retention <= self.cache_ttl {
            let raised = self.cache_ttl.checked_mul(4).unwrap_or(Duration::MAX);
            warn!(
                "CACHE_RETENTION of {}s does not exceed the TTL, using {}s",
                self.retention.as_secs(),
                raised.as_secs()
            );
            self.retention = raised;
        }
        if self.sweep_interval.is_zero() {
            self.sweep_interval = Duration::from_secs(1);
        }
        self
    }

    /// Returns true if `username` may be served.
    pub fn is_allowed(&self, username: &str) -> bool {
        self.allowed_users
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&username.to_ascii_lowercase()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_ttl: Duration::from_secs(MIN_TTL_SECS),
            retention: Duration::from_secs(7200),
            sweep_interval: Duration::from_secs(300),
            upstream_timeout: Duration::from_secs(15),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_graphql_url: DEFAULT_GITHUB_GRAPHQL_URL.to_string(),
            allowed_users: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parses a comma-separated allow-list; None if it names nobody.
pub fn parse_allowed_users(value: &str) -> Option<HashSet<String>> {
    let users: HashSet<String> = value
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!users.is_empty()).then_some(users)
}

/// Parses an allow-list file body: one username per line, `#` comments.
pub fn parse_allowed_users_lines(text: &str) -> Option<HashSet<String>> {
    let users: HashSet<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_ascii_lowercase)
        .collect();
    (!users.is_empty()).then_some(users)
}

fn load_allowed_users_file(path: &Path) -> Option<HashSet<String>> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| parse_allowed_users_lines(&text))
}
