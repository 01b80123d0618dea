//! Cached GitHub token validation.
//!
//! A permission check asks [`TokenValidator`] whether a user's stored token
//! still works. Answers are cached per user so repeated checks do not hit
//! `GET /user` on every request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::time::Instant;
use uuid::Uuid;

use crate::github::{DEFAULT_API_BASE_URL, GitHubClient, VALIDATION_TIMEOUT};
use crate::http::HttpTransport;
use crate::profile::{self, ProfileError};

/// How long a working token is trusted.
pub const VALID_TTL: Duration = Duration::from_secs(600);

/// How long a rejected token stays rejected.
pub const INVALID_TTL: Duration = Duration::from_secs(60);

/// Storage for validation results.
pub trait ValidityCache: Send + Sync {
    fn get(&self, user_id: Uuid) -> Option<bool>;

    fn set(&self, user_id: Uuid, valid: bool, ttl: Duration);

    fn invalidate(&self, user_id: Uuid);
}

/// In-process cache with per-entry expiry.
///
/// Expired entries are dropped on lookup and swept on every write, so the map
/// only holds users checked within the last [`VALID_TTL`].
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<Uuid, (bool, Instant)>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, (bool, Instant)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ValidityCache for TtlCache {
    fn get(&self, user_id: Uuid) -> Option<bool> {
        let mut entries = self.lock();
        match entries.get(&user_id) {
            Some(&(valid, expires_at)) if Instant::now() < expires_at => Some(valid),
            Some(_) => {
                entries.remove(&user_id);
                None
            }
            None => None,
        }
    }

    fn set(&self, user_id: Uuid, valid: bool, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, &mut (_, expires_at)| now < expires_at);
        entries.insert(user_id, (valid, now + ttl));
    }

    fn invalidate(&self, user_id: Uuid) {
        self.lock().remove(&user_id);
    }
}

/// Cache that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ValidityCache for NoopCache {
    fn get(&self, _user_id: Uuid) -> Option<bool> {
        None
    }

    fn set(&self, _user_id: Uuid, _valid: bool, _ttl: Duration) {}

    fn invalidate(&self, _user_id: Uuid) {}
}

/// Checks tokens against `GET /user`.
///
/// A 200 is valid, any other status is invalid. A transport failure counts
/// as invalid but is not cached, so the next check asks GitHub again.
#[derive(Clone)]
pub struct TokenValidator {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn ValidityCache>,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<dyn ValidityCache>) -> Self {
        Self {
            transport,
            cache,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: VALIDATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `token` works for `user_id`, answering from cache when possible.
    pub async fn is_valid(&self, user_id: Uuid, token: &str) -> bool {
        if let Some(valid) = self.cache.get(user_id) {
            return valid;
        }

        let client = GitHubClient::new(Arc::clone(&self.transport), token)
            .with_base_url(&self.base_url)
            .with_timeout(self.timeout);

        match client.authenticated_user_status().await {
            Ok(200) => {
                self.cache.set(user_id, true, VALID_TTL);
                true
            }
            Ok(status) => {
                tracing::debug!(%user_id, status, "GitHub rejected stored token");
                self.cache.set(user_id, false, INVALID_TTL);
                false
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "GitHub API connection error");
                false
            }
        }
    }

    /// Whether the user has a linked profile whose token still works.
    pub async fn check_user(&self, db: &DatabaseConnection, user_id: Uuid) -> Result<bool, ProfileError> {
        match profile::credential_for(db, user_id).await {
            Ok(token) => Ok(self.is_valid(user_id, &token).await),
            Err(ProfileError::NotFound { .. } | ProfileError::MissingCredential { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop the cached answer for a user, e.g. after re-login or disconnect.
    pub fn forget(&self, user_id: Uuid) {
        self.cache.invalidate(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpMethod, HttpResponse, MockTransport};

    const USER_URL: &str = "https://api.test/user";

    fn status(code: u16) -> HttpResponse {
        HttpResponse {
            status: code,
            headers: Vec::new(),
            body: b"{}".to_vec(),
        }
    }

    fn validator(transport: &MockTransport, cache: Arc<dyn ValidityCache>) -> TokenValidator {
        TokenValidator::new(Arc::new(transport.clone()), cache).with_base_url("https://api.test")
    }

    #[tokio::test(start_paused = true)]
    async fn valid_token_is_cached_for_ten_minutes() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        transport.push_response(HttpMethod::Get, USER_URL, status(401));
        let validator = validator(&transport, Arc::new(TtlCache::new()));
        let user = Uuid::new_v4();

        assert!(validator.is_valid(user, "gho").await);
        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(validator.is_valid(user, "gho").await);
        assert_eq!(transport.requests().len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!validator.is_valid(user, "gho").await);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_token_is_cached_for_one_minute() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Get, USER_URL, status(401));
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        let validator = validator(&transport, Arc::new(TtlCache::new()));
        let user = Uuid::new_v4();

        assert!(!validator.is_valid(user, "gho").await);
        assert!(!validator.is_valid(user, "gho").await);
        tokio::time::advance(INVALID_TTL).await;
        assert!(validator.is_valid(user, "gho").await);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_not_cached() {
        let transport = MockTransport::new();
        transport.push_error(
            HttpMethod::Get,
            USER_URL,
            HttpError::Timeout("5s elapsed".to_string()),
        );
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        let cache = Arc::new(TtlCache::new());
        let validator = validator(&transport, cache.clone());
        let user = Uuid::new_v4();

        assert!(!validator.is_valid(user, "gho").await);
        assert_eq!(cache.get(user), None);
        assert!(validator.is_valid(user, "gho").await);
    }

    #[tokio::test]
    async fn noop_cache_always_asks_github() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        let validator = validator(&transport, Arc::new(NoopCache));
        let user = Uuid::new_v4();

        assert!(validator.is_valid(user, "gho").await);
        assert!(validator.is_valid(user, "gho").await);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn validation_uses_short_timeout() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Get, USER_URL, status(200));
        let validator = validator(&transport, Arc::new(NoopCache));

        validator.is_valid(Uuid::new_v4(), "gho").await;
        assert_eq!(transport.requests()[0].timeout, Some(VALIDATION_TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries() {
        let cache = TtlCache::new();
        for _ in 0..3 {
            cache.set(Uuid::new_v4(), false, INVALID_TTL);
        }
        let recent = Uuid::new_v4();
        cache.set(recent, true, VALID_TTL);
        assert_eq!(cache.len(), 4);

        tokio::time::advance(INVALID_TTL).await;
        let newcomer = Uuid::new_v4();
        cache.set(newcomer, true, VALID_TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(recent), Some(true));
        assert_eq!(cache.get(newcomer), Some(true));
    }

    #[test]
    fn forget_clears_cached_answer() {
        let cache = Arc::new(TtlCache::new());
        let validator = TokenValidator::new(Arc::new(MockTransport::new()), cache.clone());
        let user = Uuid::new_v4();
        cache.set(user, true, VALID_TTL);
        validator.forget(user);
        assert_eq!(cache.get(user), None);
    }
}
