//! Reduced tier: statistics assembled from REST lookups.
//!
//! Profile, repositories and events share the core rate-limit pool, so a
//! rate limit there fails the whole fetch. Searches have their own pool;
//! their failures are only noted on the result.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use super::{Completeness, GitHubClient, UserStats, MAX_REPO_PAGES};
use crate::error::UpstreamError;

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct Profile {
    name: Option<String>,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    public_repos: u64,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Event {
    #[serde(rename = "type", default)]
    kind: String,
    repo: Option<EventRepo>,
}

#[derive(Debug, Deserialize)]
struct EventRepo {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    total_count: u64,
}

/// Review count and external repositories seen in recent events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EventSummary {
    pub reviews: u64,
    pub contributions: u64,
}

/// Counts review events and distinct repositories outside the user's own.
pub(crate) fn summarize_events(username: &str, events: &[Event]) -> EventSummary {
    let own_prefix = format!("{}/", username.to_ascii_lowercase());
    let mut reviews = 0;
    let mut contributed = HashSet::new();

    for event in events {
        if event.kind == "PullRequestReviewEvent" {
            reviews += 1;
        }
        if let Some(repo) = &event.repo {
            let name = repo.name.to_ascii_lowercase();
            if !name.is_empty() && !name.starts_with(&own_prefix) {
                contributed.insert(name);
            }
        }
    }

    EventSummary {
        reviews,
        contributions: contributed.len() as u64,
    }
}

async fn fetch_profile(client: &GitHubClient, username: &str) -> Result<Profile, UpstreamError> {
    client.rest_get(&format!("/users/{}", username), &[]).await
}

async fn fetch_stars(client: &GitHubClient, username: &str) -> Result<u64, UpstreamError> {
    let path = format!("/users/{}/repos", username);
    let mut total = 0;
    for page in 1..=MAX_REPO_PAGES {
        let query = [
            ("per_page", PER_PAGE.to_string()),
            ("page", page.to_string()),
            ("type", "owner".to_string()),
        ];
        let repos: Vec<Repo> = client.rest_get(&path, &query).await?;
        total += repos.iter().map(|r| r.stargazers_count).sum::<u64>();
        if repos.len() < PER_PAGE {
            break;
        }
    }
    Ok(total)
}

async fn fetch_events(client: &GitHubClient, username: &str) -> Result<EventSummary, UpstreamError> {
    let query = [("per_page", PER_PAGE.to_string())];
    let events: Vec<Event> = client
        .rest_get(&format!("/users/{}/events/public", username), &query)
        .await?;
    Ok(summarize_events(username, &events))
}

async fn search_count(client: &GitHubClient, path: &str, q: String) -> Result<u64, UpstreamError> {
    let query = [("q", q), ("per_page", "1".to_string())];
    let result: SearchResult = client.rest_get(path, &query).await?;
    Ok(result.total_count)
}

/// Records a non-fatal lookup failure on the stats.
fn note(stats: &mut UserStats, label: &str, err: &UpstreamError) {
    let detail = match err {
        UpstreamError::Http { status: 422 } => "search validation error".to_string(),
        other => other.to_string(),
    };
    warn!("Failed to fetch {} for {}: {}", label, stats.username, detail);
    stats.errors.push(format!("{}: {}", label, detail));
}

/// Fills in a search-derived count, or notes why it is missing.
fn apply_search(stats: &mut UserStats, label: &str, result: Result<u64, UpstreamError>, set: fn(&mut UserStats, u64)) {
    match result {
        Ok(count) => set(stats, count),
        Err(err) => note(stats, label, &err),
    }
}

/// Runs the reduced tier for `username`.
///
/// The profile is mandatory: a 404 there means the user does not exist and
/// any other failure fails the fetch. Repository and event failures other
/// than rate limiting, and every search failure, leave zeros and a note.
pub(crate) async fn fetch_reduced(
    client: &GitHubClient,
    username: &str,
) -> Result<UserStats, UpstreamError> {
    let core = async {
        let profile = fetch_profile(client, username).await?;
        let (stars, events) = tokio::join!(
            fetch_stars(client, username),
            fetch_events(client, username)
        );
        Ok::<_, UpstreamError>((profile, stars, events))
    };
    let searches = async {
        tokio::join!(
            search_count(client, "/search/commits", format!("author:{}", username)),
            search_count(client, "/search/issues", format!("author:{} type:pr", username)),
            search_count(
                client,
                "/search/issues",
                format!("author:{} type:pr is:merged", username)
            ),
            search_count(client, "/search/issues", format!("author:{} type:issue", username)),
        )
    };

    let (core, (commits, prs, merged, issues)) = tokio::join!(core, searches);
    let (profile, stars, events) = core?;

    for result in [stars.as_ref().err(), events.as_ref().err()].into_iter().flatten() {
        if *result == UpstreamError::RateLimited {
            return Err(UpstreamError::RateLimited);
        }
    }

    let mut stats = UserStats::new(username, Completeness::Partial);
    if let Some(name) = profile.name.filter(|n| !n.is_empty()) {
        stats.name = name;
    }
    stats.followers = profile.followers;
    stats.total_repos = profile.public_repos;
    stats.avatar_url = profile.avatar_url.unwrap_or_default();

    match stars {
        Ok(total) => stats.total_stars = total,
        Err(err) => note(&mut stats, "repos", &err),
    }
    match events {
        Ok(summary) => {
            stats.total_reviews = summary.reviews;
            stats.contributions = summary.contributions;
        }
        Err(err) => note(&mut stats, "events", &err),
    }

    apply_search(&mut stats, "commits", commits, |s, n| s.total_commits = n);
    apply_search(&mut stats, "prs", prs, |s, n| s.total_prs = n);
    apply_search(&mut stats, "merged_prs", merged, |s, n| s.total_prs_merged = n);
    apply_search(&mut stats, "issues", issues, |s, n| s.total_issues = n);

    Ok(stats)
}
