use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig};

const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl GitHubError {
    /// Only transport hiccups and 5xx/429 answers are worth asking again
    pub fn is_retryable(&self) -> bool {
        match self {
            GitHubError::RequestFailed { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            GitHubError::RateLimitExceeded => true,
            GitHubError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// One page of open issues plus the advisory total
#[derive(Debug, Clone)]
pub struct IssueListing {
    pub issues: Vec<GitHubIssue>,
    /// Best-effort estimate. Never use it for offset math; a page shorter
    /// than `per_page` is the only reliable end-of-data signal.
    pub total_count: u64,
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise or a local test server
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Grapevine/0.1.0"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::none(),
        })
    }

    /// Opt into automatic retries. The default is a single attempt.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// List open issues of `owner/repo`, one page at a time
    pub async fn list_open_issues(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<IssueListing> {
        if page == 0 {
            return Err(GitHubError::InvalidArgument("page must be at least 1".into()));
        }
        if per_page == 0 {
            return Err(GitHubError::InvalidArgument(
                "per_page must be greater than 0".into(),
            ));
        }

        let url = format!("{}/repos/{}/{}/issues", self.base_url, owner, repo);
        let full_name = format!("{}/{}", owner, repo);
        let page_param = page.to_string();
        let per_page_param = per_page.to_string();

        debug!("Fetching open issues of {} (page {}, {} per page)", full_name, page, per_page);

        with_retry(&self.retry_config, GitHubError::is_retryable, || async {
            let request = self.authorize(self.client.get(&url)).query(&[
                ("state", "open"),
                ("per_page", per_page_param.as_str()),
                ("page", page_param.as_str()),
            ]);

            let response = check_status(request.send().await?, &full_name).await?;

            let explicit_total = response
                .headers()
                .get("x-total-count")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let last_page = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_last_page);

            let body = response.text().await?;
            let issues: Vec<GitHubIssue> = serde_json::from_str(&body)?;
            let total_count =
                estimate_total_count(explicit_total, last_page, page, per_page, issues.len());

            Ok(IssueListing {
                issues,
                total_count,
            })
        })
        .await
    }

    /// Get a single issue by its per-repository number
    pub async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<GitHubIssue> {
        let url = format!("{}/repos/{}/{}/issues/{}", self.base_url, owner, repo, number);
        let what = format!("{}/{}#{}", owner, repo, number);

        with_retry(&self.retry_config, GitHubError::is_retryable, || async {
            let response =
                check_status(self.authorize(self.client.get(&url)).send().await?, &what).await?;
            let body = response.text().await?;
            let issue: GitHubIssue = serde_json::from_str(&body)?;
            Ok(issue)
        })
        .await
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GitHubError::NotFound(what.to_string()));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GitHubError::AuthRequired);
    }

    let rate_limited = status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || (status == reqwest::StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0"));
    if rate_limited {
        return Err(GitHubError::RateLimitExceeded);
    }

    let message = response.text().await.unwrap_or_default();
    Err(GitHubError::RequestFailed {
        status: status.as_u16(),
        message,
    })
}

/// Pull the page number out of the `rel="last"` entry of a `Link` header
pub fn parse_last_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_last = parts.any(|p| p.trim() == "rel=\"last\"");
        if !is_last {
            return None;
        }

        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let (_, query) = url.split_once('?')?;
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some(("page", value)) => value.parse().ok(),
            _ => None,
        })
    })
}

/// Best-effort total, in priority order:
/// an explicit count header, then `last_page * per_page`, then a guess from
/// how full the current page is.
pub fn estimate_total_count(
    explicit_total: Option<u64>,
    last_page: Option<u32>,
    page: u32,
    per_page: u32,
    returned: usize,
) -> u64 {
    if let Some(total) = explicit_total {
        return total;
    }

    let page = page as u64;
    let per_page = per_page as u64;

    if let Some(last) = last_page {
        return last as u64 * per_page;
    }

    let returned = returned as u64;
    if returned >= per_page {
        // Full page: assume at least one more
        page * per_page + per_page
    } else {
        page * per_page - (per_page - returned)
    }
}

/// Issue as the GitHub REST API returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: GitHubUser,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments: u32,
    pub labels: Vec<GitHubLabel>,
    pub state: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
    /// Hex without the leading '#'
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn issue_json(id: u64, number: u64, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "number": number,
            "title": title,
            "body": null,
            "user": { "login": "octocat", "avatar_url": "https://avatars.example/octocat" },
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-02T10:00:00Z",
            "comments": 2,
            "labels": [{ "name": "bug", "color": "d73a4a", "default": true }],
            "state": "open",
            "html_url": format!("https://github.com/acme/forum/issues/{}", number)
        })
    }

    #[derive(Clone)]
    struct ServerState {
        hits: Arc<AtomicUsize>,
    }

    async fn issues_handler(
        State(state): State<ServerState>,
        Path((owner, repo)): Path<(String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        state.hits.fetch_add(1, Ordering::SeqCst);
        assert_eq!(params.get("state").map(String::as_str), Some("open"));

        match (owner.as_str(), repo.as_str()) {
            ("acme", "counted") => {
                let body = json!([issue_json(1, 1, "one"), issue_json(2, 2, "two")]);
                ([("x-total-count", "42")], axum::Json(body)).into_response()
            }
            ("acme", "linked") => {
                let body = json!([issue_json(1, 1, "one"), issue_json(2, 2, "two")]);
                let link = "<http://localhost/repos/acme/linked/issues?state=open&per_page=2&page=2>; rel=\"next\", \
                            <http://localhost/repos/acme/linked/issues?state=open&per_page=2&page=7>; rel=\"last\"";
                ([("link", link)], axum::Json(body)).into_response()
            }
            ("acme", "short") => {
                axum::Json(json!([issue_json(9, 3, "only")])).into_response()
            }
            ("acme", "broken") => axum::Json(json!([{ "id": 1, "title": "no number" }])).into_response(),
            ("acme", "limited") => (
                StatusCode::FORBIDDEN,
                [("x-ratelimit-remaining", "0")],
                "API rate limit exceeded",
            )
                .into_response(),
            ("acme", "flaky") => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
            _ => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }

    async fn issue_handler(Path((_owner, _repo, number)): Path<(String, String, u64)>) -> Response {
        axum::Json(issue_json(100 + number, number, "single")).into_response()
    }

    async fn spawn_test_server() -> (String, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/repos/{owner}/{repo}/issues", get(issues_handler))
            .route("/repos/{owner}/{repo}/issues/{number}", get(issue_handler))
            .with_state(ServerState { hits: hits.clone() });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), hits, handle)
    }

    #[test]
    fn test_parse_last_page() {
        let link = "<https://api.github.com/repositories/1/issues?per_page=10&page=2>; rel=\"next\", \
                    <https://api.github.com/repositories/1/issues?per_page=10&page=5>; rel=\"last\"";
        assert_eq!(parse_last_page(link), Some(5));

        // per_page must not be mistaken for page
        let only_next = "<https://api.github.com/x?page=2&per_page=10>; rel=\"next\"";
        assert_eq!(parse_last_page(only_next), None);
        assert_eq!(parse_last_page(""), None);
    }

    #[test]
    fn test_estimate_total_count_priorities() {
        assert_eq!(estimate_total_count(Some(17), Some(9), 1, 10, 10), 17);
        assert_eq!(estimate_total_count(None, Some(4), 1, 10, 10), 40);
        // Full page: assume one more page
        assert_eq!(estimate_total_count(None, None, 2, 10, 10), 30);
        // Partial page: this is the last one
        assert_eq!(estimate_total_count(None, None, 2, 10, 3), 13);
        assert_eq!(estimate_total_count(None, None, 1, 10, 0), 0);
    }

    #[tokio::test]
    async fn test_list_open_issues_reads_total_header() {
        let (base, _, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(None, base).unwrap();

        let listing = client.list_open_issues("acme", "counted", 1, 2).await.unwrap();
        assert_eq!(listing.issues.len(), 2);
        assert_eq!(listing.total_count, 42);
        assert_eq!(listing.issues[0].user.login, "octocat");
        assert_eq!(listing.issues[0].labels[0].color, "d73a4a");
        assert!(listing.issues[0].body.is_none());

        server.abort();
    }

    #[tokio::test]
    async fn test_list_open_issues_uses_link_header_and_heuristic() {
        let (base, _, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(None, base).unwrap();

        let linked = client.list_open_issues("acme", "linked", 1, 2).await.unwrap();
        assert_eq!(linked.total_count, 14);

        let short = client.list_open_issues("acme", "short", 3, 10).await.unwrap();
        assert_eq!(short.issues.len(), 1);
        assert_eq!(short.total_count, 21);

        server.abort();
    }

    #[tokio::test]
    async fn test_invalid_pagination_never_hits_network() {
        let (base, hits, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(None, base).unwrap();

        let zero_page = client.list_open_issues("acme", "counted", 0, 10).await;
        assert!(matches!(zero_page, Err(GitHubError::InvalidArgument(_))));
        let zero_size = client.list_open_issues("acme", "counted", 1, 0).await;
        assert!(matches!(zero_size, Err(GitHubError::InvalidArgument(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let (base, hits, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(None, base).unwrap();

        let missing = client.list_open_issues("acme", "nope", 1, 10).await;
        assert!(matches!(missing, Err(GitHubError::NotFound(_))));

        let limited = client.list_open_issues("acme", "limited", 1, 10).await;
        assert!(matches!(limited, Err(GitHubError::RateLimitExceeded)));

        let broken = client.list_open_issues("acme", "broken", 1, 10).await;
        assert!(matches!(broken, Err(GitHubError::ParseError(_))));

        // No automatic retry by default
        let before = hits.load(Ordering::SeqCst);
        let flaky = client.list_open_issues("acme", "flaky", 1, 10).await;
        assert!(matches!(flaky, Err(GitHubError::RequestFailed { status: 502, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), before + 1);

        server.abort();
    }

    #[tokio::test]
    async fn test_opt_in_retry_repeats_server_errors() {
        let (base, hits, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(None, base)
            .unwrap()
            .with_retry_config(RetryConfig {
                max_retries: 2,
                initial_delay_ms: 5,
                max_delay_ms: 10,
                backoff_multiplier: 2.0,
            });

        let flaky = client.list_open_issues("acme", "flaky", 1, 10).await;
        assert!(flaky.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        server.abort();
    }

    #[tokio::test]
    async fn test_get_issue() {
        let (base, _, server) = spawn_test_server().await;
        let client = GitHubClient::with_base_url(Some("token".into()), format!("{}/", base)).unwrap();

        let issue = client.get_issue("acme", "forum", 7).await.unwrap();
        assert_eq!(issue.number, 7);
        assert_eq!(issue.id, 107);

        server.abort();
    }
}
