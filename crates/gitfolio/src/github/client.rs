//! GitHub REST client: authenticated requests and page walking.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::error::{GitHubError, response_error_entry, short_error_message};
use super::pagination::{page_number, parse_link_header};
use super::rate_limit::{ApiRateLimiter, RateLimitInfo};
use super::types::{FetchOutcome, GitHubUser};
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::sync::{ErrorEntry, ProgressCallback, SyncProgress, emit};

/// Public GitHub API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// REST API version pinned on every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub rejects requests without a User-Agent.
pub const USER_AGENT: &str = "gitfolio";

/// Timeout for requests made during a sync.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for token validation lookups.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

const PER_PAGE: u32 = 100;

/// Client for one access token.
///
/// Cheap to clone; the transport and rate limiter are shared.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Arc<str>,
    token: Arc<str>,
    timeout: Duration,
    rate_limiter: Option<ApiRateLimiter>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client against the public API with the sync timeout.
    pub fn new(transport: Arc<dyn HttpTransport>, token: &str) -> Self {
        Self {
            transport,
            base_url: Arc::from(DEFAULT_API_BASE_URL),
            token: Arc::from(token),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limiter: None,
        }
    }

    /// Point the client at another API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Arc::from(base_url.trim_end_matches('/'));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Option<ApiRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// First page of the authenticated user's repositories.
    pub fn user_repos_url(&self) -> String {
        format!("{}/user/repos?per_page={PER_PAGE}", self.base_url)
    }

    /// First page of commits in `full_name` authored by `author`.
    pub fn commits_url(&self, full_name: &str, author: &str) -> String {
        let author: String = url::form_urlencoded::byte_serialize(author.as_bytes()).collect();
        format!(
            "{}/repos/{full_name}/commits?author={author}&per_page={PER_PAGE}",
            self.base_url
        )
    }

    fn request(&self, url: &str) -> HttpRequest {
        HttpRequest::get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
        let resp = self.transport.send(self.request(url)).await?;
        if let Some(info) = RateLimitInfo::from_response(&resp) {
            tracing::trace!(
                remaining = info.remaining,
                limit = info.limit,
                reset_at = %info.reset_at,
                "GitHub quota"
            );
        }
        Ok(resp)
    }

    /// Walk every page of a list endpoint starting at `url`.
    ///
    /// Never fails: a transport error, a non-200 page or an undecodable body
    /// ends the walk and is reported in [`FetchOutcome::errors`], keeping the
    /// items gathered from earlier pages.
    pub async fn fetch_all(&self, url: &str) -> FetchOutcome {
        self.fetch_all_with_progress(url, None).await
    }

    /// [`Self::fetch_all`], emitting a [`SyncProgress::FetchedPage`] per page.
    pub async fn fetch_all_with_progress(
        &self,
        url: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = Some(url.to_string());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                tracing::warn!(%url, "Link header points back to a visited page, stopping");
                break;
            }

            let resp = match self.get(&url).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(%url, error = %short_error_message(&e), "GitHub request failed");
                    outcome.errors.push(ErrorEntry::transport(&url, &e));
                    break;
                }
            };

            if resp.status != 200 {
                let entry = response_error_entry(&url, &resp);
                tracing::warn!(%url, status = resp.status, error = %entry.message(), "GitHub page failed");
                outcome.errors.push(entry);
                break;
            }

            let items = match serde_json::from_slice::<serde_json::Value>(&resp.body) {
                Ok(serde_json::Value::Array(items)) => items,
                Ok(_) => {
                    outcome
                        .errors
                        .push(ErrorEntry::transport(&url, "expected a JSON array"));
                    break;
                }
                Err(e) => {
                    outcome
                        .errors
                        .push(ErrorEntry::transport(&url, format!("invalid JSON body: {e}")));
                    break;
                }
            };

            let count = items.len();
            outcome.items.extend(items);
            tracing::debug!(%url, count, total = outcome.items.len(), "Fetched page");
            emit(
                on_progress,
                SyncProgress::FetchedPage {
                    page: page_number(&url),
                    url: url.clone(),
                    count,
                    total_so_far: outcome.items.len(),
                },
            );

            next = resp.header("link").map(parse_link_header).and_then(|l| l.next);
        }

        outcome
    }

    /// Status of `GET /user` without decoding the body.
    pub async fn authenticated_user_status(&self) -> Result<u16, HttpError> {
        let url = format!("{}/user", self.base_url);
        Ok(self.get(&url).await?.status)
    }

    /// `GET /user` for the token's owner.
    pub async fn get_authenticated_user(&self) -> Result<GitHubUser, GitHubError> {
        let url = format!("{}/user", self.base_url);
        let resp = self.get(&url).await?;
        if resp.status != 200 {
            return Err(GitHubError::from_response(&resp));
        }
        serde_json::from_slice(&resp.body).map_err(|e| GitHubError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, json_response};
    use serde_json::json;

    const BASE: &str = "https://api.test";

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::new(Arc::new(transport.clone()), "gho_secret").with_base_url(BASE)
    }

    fn page(body: serde_json::Value, next: Option<&str>) -> HttpResponse {
        let mut resp = json_response(200, &body);
        if let Some(next) = next {
            resp.headers
                .push(("Link".to_string(), format!(r#"<{next}>; rel="next""#)));
        }
        resp
    }

    #[test]
    fn builds_endpoint_urls() {
        let transport = MockTransport::new();
        let client = GitHubClient::new(Arc::new(transport), "t").with_base_url("https://api.test/");
        assert_eq!(client.user_repos_url(), "https://api.test/user/repos?per_page=100");
        assert_eq!(
            client.commits_url("octocat/Hello-World", "octo cat"),
            "https://api.test/repos/octocat/Hello-World/commits?author=octo+cat&per_page=100"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let client = client(&MockTransport::new());
        let debug = format!("{client:?}");
        assert!(!debug.contains("gho_secret"));
    }

    #[tokio::test]
    async fn fetch_all_follows_next_links_in_order() {
        let transport = MockTransport::new();
        let first = format!("{BASE}/user/repos?per_page=100");
        let second = format!("{BASE}/user/repos?per_page=100&page=2");
        transport.push_response(
            HttpMethod::Get,
            &first,
            page(json!([{"id": 1}, {"id": 2}]), Some(&second)),
        );
        transport.push_response(HttpMethod::Get, &second, page(json!([{"id": 3}]), None));

        let outcome = client(&transport).fetch_all(&first).await;

        assert!(outcome.is_clean());
        let ids: Vec<i64> = outcome
            .items
            .iter()
            .filter_map(|item| item["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn fetch_all_sends_auth_and_version_headers() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/user/repos?per_page=100");
        transport.push_json(&url, json!([]));

        client(&transport).fetch_all(&url).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        let get = |name| crate::http::header_get(headers, name);
        assert_eq!(get("authorization"), Some("Bearer gho_secret"));
        assert_eq!(get("accept"), Some("application/vnd.github+json"));
        assert_eq!(get("x-github-api-version"), Some(GITHUB_API_VERSION));
        assert_eq!(get("user-agent"), Some(USER_AGENT));
        assert_eq!(requests[0].timeout, Some(DEFAULT_REQUEST_TIMEOUT));
    }

    #[tokio::test]
    async fn rate_limited_page_stops_walk_and_keeps_earlier_items() {
        let transport = MockTransport::new();
        let first = format!("{BASE}/user/repos?per_page=100");
        let second = format!("{BASE}/user/repos?per_page=100&page=2");
        transport.push_response(
            HttpMethod::Get,
            &first,
            page(json!([{"id": 1}]), Some(&second)),
        );
        transport.push_response(
            HttpMethod::Get,
            &second,
            HttpResponse {
                status: 403,
                headers: vec![("X-RateLimit-Reset".to_string(), "1700000000".to_string())],
                body: br#"{"message":"API rate limit exceeded"}"#.to_vec(),
            },
        );

        let outcome = client(&transport).fetch_all(&first).await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(
            outcome.errors,
            vec![ErrorEntry::RateLimit {
                url: second,
                status_code: 403,
                error: "Rate limit exceeded. Reset at 1700000000".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn transport_failure_becomes_url_error_entry() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/user/repos?per_page=100");
        transport.push_error(
            HttpMethod::Get,
            &url,
            HttpError::Timeout("operation timed out".to_string()),
        );

        let outcome = client(&transport).fetch_all(&url).await;

        assert!(outcome.items.is_empty());
        match &outcome.errors[..] {
            [ErrorEntry::Transport { url: failed, error }] => {
                assert_eq!(failed, &url);
                assert!(error.contains("timed out"));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_array_body_is_an_error() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/user/repos?per_page=100");
        transport.push_json(&url, json!({"message": "Not Found"}));

        let outcome = client(&transport).fetch_all(&url).await;
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message().contains("JSON array"));
    }

    #[tokio::test]
    async fn self_referencing_link_does_not_loop() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/user/repos?per_page=100");
        transport.push_response(HttpMethod::Get, &url, page(json!([{"id": 1}]), Some(&url)));

        let outcome = client(&transport).fetch_all(&url).await;
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn get_authenticated_user_decodes_profile() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{BASE}/user"),
            json!({"id": 583231, "login": "octocat", "followers": 20}),
        );

        let user = client(&transport)
            .get_authenticated_user()
            .await
            .expect("user");
        assert_eq!(user.id, 583231);
        assert_eq!(user.followers, 20);
    }

    #[tokio::test]
    async fn get_authenticated_user_reports_bad_credentials() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/user"),
            json_response(401, &json!({"message": "Bad credentials"})),
        );

        let err = client(&transport)
            .get_authenticated_user()
            .await
            .expect_err("401 should fail");
        assert!(matches!(err, GitHubError::Unauthorized));
    }
}
