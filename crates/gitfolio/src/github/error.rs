//! GitHub API error types and response classification.

use thiserror::Error;

use crate::http::{HttpError, HttpResponse};
use crate::sync::{ErrorEntry, MAX_ERROR_BODY_CHARS};

/// Errors from single-shot GitHub calls (user lookup, token checks).
///
/// List endpoints never return these; see [`super::GitHubClient::fetch_all`].
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{message}")]
    RateLimited { message: String },

    #[error("Bad credentials")]
    Unauthorized,

    #[error("GitHub returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl GitHubError {
    /// Build an error from a non-success response.
    pub fn from_response(resp: &HttpResponse) -> Self {
        if let Some(message) = rate_limit_message(resp) {
            return Self::RateLimited { message };
        }
        if resp.status == 401 {
            return Self::Unauthorized;
        }
        Self::Status {
            status: resp.status,
            body: resp.body_excerpt(MAX_ERROR_BODY_CHARS),
        }
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Rate-limit message for a response, if GitHub rate limited it.
///
/// A 403 counts only when its body mentions "rate limit"; a 429 always
/// counts. The message carries the raw `x-ratelimit-reset` header value.
pub fn rate_limit_message(resp: &HttpResponse) -> Option<String> {
    let reset = resp.header("x-ratelimit-reset").unwrap_or("unknown");
    match resp.status {
        403 if resp
            .body_excerpt(MAX_ERROR_BODY_CHARS)
            .to_lowercase()
            .contains("rate limit") =>
        {
            Some(format!("Rate limit exceeded. Reset at {reset}"))
        }
        429 => Some(format!("Too many requests. Reset at {reset}")),
        _ => None,
    }
}

/// Error entry for a non-200 page response.
pub fn response_error_entry(url: &str, resp: &HttpResponse) -> ErrorEntry {
    match rate_limit_message(resp) {
        Some(error) => ErrorEntry::RateLimit {
            url: url.to_string(),
            status_code: resp.status,
            error,
        },
        None => ErrorEntry::Http {
            url: url.to_string(),
            status_code: resp.status,
            error: resp.body_excerpt(MAX_ERROR_BODY_CHARS),
        },
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn forbidden_with_rate_limit_body_is_rate_limited() {
        let resp = response(
            403,
            &[("X-RateLimit-Reset", "1700000000")],
            r#"{"message":"API rate limit exceeded for user ID 1."}"#,
        );
        assert_eq!(
            rate_limit_message(&resp).as_deref(),
            Some("Rate limit exceeded. Reset at 1700000000")
        );
    }

    #[test]
    fn too_many_requests_is_rate_limited_regardless_of_body() {
        let resp = response(429, &[("x-ratelimit-reset", "42")], "slow down");
        assert_eq!(
            rate_limit_message(&resp).as_deref(),
            Some("Too many requests. Reset at 42")
        );
    }

    #[test]
    fn plain_forbidden_is_not_rate_limited() {
        let resp = response(403, &[], r#"{"message":"Resource not accessible"}"#);
        assert_eq!(rate_limit_message(&resp), None);

        let entry = response_error_entry("https://api.github.com/user/repos", &resp);
        match entry {
            ErrorEntry::Http {
                status_code, error, ..
            } => {
                assert_eq!(status_code, 403);
                assert!(error.contains("Resource not accessible"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn missing_reset_header_is_reported_as_unknown() {
        let resp = response(429, &[], "");
        assert_eq!(
            rate_limit_message(&resp).as_deref(),
            Some("Too many requests. Reset at unknown")
        );
    }

    #[test]
    fn other_errors_keep_first_500_chars_of_body() {
        let body = "x".repeat(1200);
        let resp = response(502, &[], &body);
        let entry = response_error_entry("https://api.github.com/user/repos", &resp);
        assert_eq!(entry.message().len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn from_response_distinguishes_unauthorized() {
        let resp = response(401, &[], r#"{"message":"Bad credentials"}"#);
        assert!(matches!(
            GitHubError::from_response(&resp),
            GitHubError::Unauthorized
        ));

        let resp = response(429, &[("x-ratelimit-reset", "9")], "");
        let err = GitHubError::from_response(&resp);
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Too many requests. Reset at 9");
    }

    #[test]
    fn short_error_message_keeps_first_line() {
        let err = HttpError::Transport("connection reset\nbacktrace...".to_string());
        assert_eq!(
            short_error_message(&err),
            "http transport error: connection reset"
        );
    }
}
