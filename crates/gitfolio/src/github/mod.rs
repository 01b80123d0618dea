//! GitHub REST API access.
//!
//! # Module Structure
//!
//! - [`client`] - Authenticated client, page walking, user lookup
//! - [`error`] - Error types and rate-limit classification
//! - [`pagination`] - Link header parsing
//! - [`rate_limit`] - Client-side throttle and quota headers
//! - [`revoke`] - OAuth grant revocation
//! - [`types`] - Payload types and timestamp parsing
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gitfolio::github::GitHubClient;
//! use gitfolio::http::ReqwestTransport;
//!
//! let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
//! let client = GitHubClient::new(transport, &token);
//! let outcome = client.fetch_all(&client.user_repos_url()).await;
//! println!("{} repos, {} errors", outcome.items.len(), outcome.errors.len());
//! ```

pub mod client;
pub mod error;
pub mod pagination;
pub mod rate_limit;
pub mod revoke;
pub mod types;

pub use client::{
    DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, GITHUB_API_VERSION, GitHubClient, USER_AGENT,
    VALIDATION_TIMEOUT,
};
pub use error::{GitHubError, rate_limit_message, short_error_message};
pub use pagination::{LinkPagination, parse_link_header};
pub use rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS, RateLimitInfo};
pub use revoke::{OAuthApp, RevokeError, revoke_grant};
pub use types::{FetchOutcome, GitHubUser, parse_timestamp};
