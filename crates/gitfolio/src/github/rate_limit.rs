use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::HttpResponse;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub: 5000 requests/hour = ~1.4/sec, we use 10/sec to allow bursts.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// A proactive client-side throttle using the governor crate.
///
/// Cloning shares the quota, so one limiter can pace every client a worker
/// pool hands out.
///
/// # Example
///
/// ```ignore
/// use gitfolio::github::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A value of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

/// Quota state reported in GitHub's `x-ratelimit-*` response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: usize,
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Extract rate limit info from response headers; `None` unless all three
    /// headers are present and numeric.
    pub fn from_response(resp: &HttpResponse) -> Option<Self> {
        let limit = resp.header("x-ratelimit-limit")?.parse::<usize>().ok()?;
        let remaining = resp.header("x-ratelimit-remaining")?.parse::<usize>().ok()?;
        let reset_epoch = resp.header("x-ratelimit-reset")?.parse::<i64>().ok()?;
        let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }
}
