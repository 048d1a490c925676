//! Enriched tier: GraphQL query text and response decoding.

use serde::Deserialize;

use super::{Completeness, UserStats};
use crate::error::UpstreamError;

/// Profile, contributions, first page of repositories and PR search counts.
///
/// `$USERNAME` is substituted literally because GraphQL variables are not
/// expanded inside search query strings.
const STATS_QUERY: &str = r#"
query($username: String!) {
  user(login: $username) {
    name
    avatarUrl
    followers { totalCount }
    repositories(ownerAffiliations: OWNER, first: 100, orderBy: {field: STARGAZERS, direction: DESC}) {
      totalCount
      nodes { stargazerCount }
      pageInfo { hasNextPage endCursor }
    }
    contributionsCollection {
      totalCommitContributions
      restrictedContributionsCount
      totalPullRequestContributions
      totalIssueContributions
      totalPullRequestReviewContributions
      totalRepositoriesWithContributedCommits
    }
  }
  merged: search(query: "author:$USERNAME type:pr is:merged", type: ISSUE) { issueCount }
  total_prs: search(query: "author:$USERNAME type:pr", type: ISSUE) { issueCount }
}
"#;

/// Next page of repositories for star counting.
pub(crate) const REPOS_PAGE_QUERY: &str = r#"
query($username: String!, $cursor: String!) {
  user(login: $username) {
    repositories(ownerAffiliations: OWNER, first: 100, orderBy: {field: STARGAZERS, direction: DESC}, after: $cursor) {
      nodes { stargazerCount }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

/// Returns the stats query with the username substituted into searches.
pub(crate) fn stats_query(username: &str) -> String {
    STATS_QUERY.replace("$USERNAME", username)
}

// == Response Shapes ==

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsData {
    user: Option<UserNode>,
    merged: Option<SearchCount>,
    total_prs: Option<SearchCount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    name: Option<String>,
    avatar_url: Option<String>,
    followers: TotalCount,
    repositories: RepositoryConnection,
    contributions_collection: Contributions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchCount {
    issue_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryConnection {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    nodes: Vec<RepoNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoNode {
    stargazer_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contributions {
    total_commit_contributions: u64,
    restricted_contributions_count: u64,
    total_issue_contributions: u64,
    total_pull_request_review_contributions: u64,
    total_repositories_with_contributed_commits: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoPageData {
    user: Option<RepoPageUser>,
}

#[derive(Debug, Deserialize)]
struct RepoPageUser {
    repositories: RepositoryConnection,
}

impl RepositoryConnection {
    fn stars(&self) -> u64 {
        self.nodes.iter().map(|node| node.stargazer_count).sum()
    }

    fn next_cursor(&self) -> Option<String> {
        if self.page_info.has_next_page {
            self.page_info.end_cursor.clone()
        } else {
            None
        }
    }
}

/// Stars on one page plus the cursor of the following page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StarPage {
    pub stars: u64,
    pub next_cursor: Option<String>,
}

// == Decoding ==

/// Maps GraphQL-level errors onto upstream errors.
///
/// `NOT_FOUND` wins over `RATE_LIMITED`, which wins over anything else.
pub(crate) fn check_errors(errors: &[GraphQlError]) -> Result<(), UpstreamError> {
    if errors.is_empty() {
        return Ok(());
    }
    let has_kind = |kind: &str| errors.iter().any(|e| e.kind.as_deref() == Some(kind));
    if has_kind("NOT_FOUND") {
        return Err(UpstreamError::NotFound);
    }
    if has_kind("RATE_LIMITED") {
        return Err(UpstreamError::RateLimited);
    }
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    Err(UpstreamError::Malformed(messages.join("; ")))
}

/// Splits a GraphQL body into its raw `data` and classified errors.
///
/// Errors are checked before `data` is given a shape, since GitHub pairs
/// errors with partial or null data.
fn decode_envelope(body: &str) -> Result<GraphQlResponse<serde_json::Value>, UpstreamError> {
    serde_json::from_str(body).map_err(|e| UpstreamError::Malformed(e.to_string()))
}

fn decode_data<T: serde::de::DeserializeOwned>(
    data: Option<serde_json::Value>,
) -> Result<T, UpstreamError> {
    let data = data
        .filter(|value| !value.is_null())
        .ok_or_else(|| UpstreamError::Malformed("missing data".to_string()))?;
    serde_json::from_value(data).map_err(|e| UpstreamError::Malformed(e.to_string()))
}

/// Decodes the stats query body.
///
/// Returns complete statistics with the first page's stars, and the cursor
/// for the next repository page.
pub(crate) fn parse_stats(
    username: &str,
    body: &str,
) -> Result<(UserStats, Option<String>), UpstreamError> {
    let response = decode_envelope(body)?;
    check_errors(&response.errors)?;

    let data: StatsData = decode_data(response.data)?;
    let user = data.user.ok_or(UpstreamError::NotFound)?;
    let (merged, total_prs) = data
        .merged
        .zip(data.total_prs)
        .ok_or_else(|| UpstreamError::Malformed("missing search counts".to_string()))?;
    let contrib = &user.contributions_collection;

    let mut stats = UserStats::new(username, Completeness::Complete);
    if let Some(name) = user.name.filter(|n| !n.is_empty()) {
        stats.name = name;
    }
    stats.avatar_url = user.avatar_url.unwrap_or_default();
    stats.followers = user.followers.total_count;
    stats.total_repos = user.repositories.total_count;
    stats.total_stars = user.repositories.stars();
    stats.total_commits =
        contrib.total_commit_contributions + contrib.restricted_contributions_count;
    stats.total_prs = total_prs.issue_count;
    stats.total_prs_merged = merged.issue_count;
    stats.total_issues = contrib.total_issue_contributions;
    stats.total_reviews = contrib.total_pull_request_review_contributions;
    stats.contributions = contrib.total_repositories_with_contributed_commits;

    Ok((stats, user.repositories.next_cursor()))
}

/// Decodes one repository page.
///
/// A page carrying GraphQL errors yields `Ok(None)`: star counting simply
/// stops there.
pub(crate) fn parse_repo_page(body: &str) -> Result<Option<StarPage>, UpstreamError> {
    let response = decode_envelope(body)?;
    if !response.errors.is_empty() {
        return Ok(None);
    }
    let data: RepoPageData = decode_data(response.data)?;
    let repositories = data
        .user
        .map(|user| user.repositories)
        .ok_or_else(|| UpstreamError::Malformed("missing repositories".to_string()))?;

    Ok(Some(StarPage {
        stars: repositories.stars(),
        next_cursor: repositories.next_cursor(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_BODY: &str = r#"{
      "data": {
        "user": {
          "name": "Alice Liddell",
          "avatarUrl": "https://avatars.example/alice",
          "followers": {"totalCount": 42},
          "repositories": {
            "totalCount": 150,
            "nodes": [{"stargazerCount": 100}, {"stargazerCount": 20}, {"stargazerCount": 3}],
            "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vyc29yOjEwMA=="}
          },
          "contributionsCollection": {
            "totalCommitContributions": 500,
            "restrictedContributionsCount": 25,
            "totalPullRequestContributions": 60,
            "totalIssueContributions": 12,
            "totalPullRequestReviewContributions": 7,
            "totalRepositoriesWithContributedCommits": 9
          }
        },
        "merged": {"issueCount": 55},
        "total_prs": {"issueCount": 61}
      }
    }"#;

    #[test]
    fn test_stats_query_substitutes_username() {
        let query = stats_query("alice");
        assert!(query.contains("author:alice type:pr is:merged"));
        assert!(!query.contains("$USERNAME"));
        // The GraphQL variable itself is left alone
        assert!(query.contains("user(login: $username)"));
    }

    #[test]
    fn test_parse_stats() {
        let (stats, cursor) = parse_stats("alice", STATS_BODY).unwrap();

        assert_eq!(stats.name, "Alice Liddell");
        assert_eq!(stats.followers, 42);
        assert_eq!(stats.total_repos, 150);
        assert_eq!(stats.total_stars, 123);
        assert_eq!(stats.total_commits, 525);
        assert_eq!(stats.total_prs, 61);
        assert_eq!(stats.total_prs_merged, 55);
        assert_eq!(stats.total_issues, 12);
        assert_eq!(stats.total_reviews, 7);
        assert_eq!(stats.contributions, 9);
        assert_eq!(stats.completeness, Completeness::Complete);
        assert_eq!(cursor.as_deref(), Some("Y3Vyc29yOjEwMA=="));
    }

    #[test]
    fn test_parse_stats_not_found_error() {
        let body = r#"{"data": {"user": null}, "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a User"}]}"#;
        assert_eq!(parse_stats("ghost", body).unwrap_err(), UpstreamError::NotFound);
    }

    #[test]
    fn test_parse_stats_rate_limited_error() {
        let body = r#"{"errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}"#;
        assert_eq!(parse_stats("alice", body).unwrap_err(), UpstreamError::RateLimited);
    }

    #[test]
    fn test_parse_stats_rate_limited_with_partial_data() {
        let body = r#"{"data": {"user": null}, "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}"#;
        assert_eq!(parse_stats("alice", body).unwrap_err(), UpstreamError::RateLimited);
    }

    #[test]
    fn test_parse_stats_null_user_without_errors_is_not_found() {
        let body = r#"{"data": {"user": null}}"#;
        assert_eq!(parse_stats("ghost", body).unwrap_err(), UpstreamError::NotFound);
    }

    #[test]
    fn test_parse_stats_missing_search_counts_is_malformed() {
        let body = STATS_BODY.replace(r#""total_prs": {"issueCount": 61}"#, r#""other": null"#);
        assert!(matches!(
            parse_stats("alice", &body),
            Err(UpstreamError::Malformed(msg)) if msg.contains("search counts")
        ));
    }

    #[test]
    fn test_parse_stats_other_errors_are_malformed() {
        let body = r#"{"errors": [{"message": "Something went wrong"}]}"#;
        assert!(matches!(
            parse_stats("alice", body),
            Err(UpstreamError::Malformed(msg)) if msg.contains("Something went wrong")
        ));
    }

    #[test]
    fn test_parse_stats_invalid_json() {
        assert!(matches!(
            parse_stats("alice", "<html>"),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_repo_page() {
        let body = r#"{"data": {"user": {"repositories": {
            "nodes": [{"stargazerCount": 2}, {"stargazerCount": 1}],
            "pageInfo": {"hasNextPage": false, "endCursor": "abc"}
        }}}}"#;

        let page = parse_repo_page(body).unwrap().unwrap();
        assert_eq!(page.stars, 3);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_parse_repo_page_with_errors_stops() {
        let body = r#"{"errors": [{"message": "timeout"}]}"#;
        assert_eq!(parse_repo_page(body).unwrap(), None);
    }
}
