//! Runtime settings for the sync engine and worker pool.

use std::time::Duration;

use crate::github::{
    ApiRateLimiter, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, GITHUB_DEFAULT_RPS,
    VALIDATION_TIMEOUT,
};

/// Default number of sync workers.
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// GitHub REST API root.
    pub api_base_url: String,
    /// Timeout for each request made during a sync.
    pub request_timeout: Duration,
    /// Timeout for token validation lookups.
    pub validation_timeout: Duration,
    /// Client-side request budget; `None` disables proactive throttling.
    pub requests_per_second: Option<u32>,
    /// Number of worker-pool consumers.
    pub workers: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            validation_timeout: VALIDATION_TIMEOUT,
            requests_per_second: Some(GITHUB_DEFAULT_RPS),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_requests_per_second(mut self, rps: Option<u32>) -> Self {
        self.requests_per_second = rps;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Rate limiter for the configured budget, if any.
    pub fn rate_limiter(&self) -> Option<ApiRateLimiter> {
        self.requests_per_second
            .filter(|rps| *rps > 0)
            .map(ApiRateLimiter::new)
    }
}
