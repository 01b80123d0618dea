//! Retry utilities for database writes that must not be lost.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use sea_orm::DbErr;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 5_000;

/// Maximum retries for one write.
pub const MAX_WRITE_RETRIES: usize = 5;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_WRITE_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Build the default exponential backoff strategy for database writes.
#[must_use]
pub fn default_backoff() -> ExponentialBuilder {
    RetryConfig::default().into_backoff()
}

/// Whether a database error is transient (lock contention, lost connection).
pub fn is_transient_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Run a database write, retrying transient failures with backoff.
///
/// `what` names the write in retry logs.
pub async fn with_db_retry<T, F, Fut>(operation: F, what: &str) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    with_db_retry_config(operation, what, RetryConfig::default()).await
}

/// [`with_db_retry`] with an explicit backoff configuration.
pub async fn with_db_retry_config<T, F, Fut>(
    mut operation: F,
    what: &str,
    config: RetryConfig,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::warn!(
                attempt = attempt.load(Ordering::SeqCst),
                retry_in_ms = dur.as_millis() as u64,
                error = %err,
                "Transient database error during {what}, retrying"
            );
        })
        .when(is_transient_db_error)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, MAX_WRITE_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_retry_config_custom() {
        let config = RetryConfig::new(Duration::from_secs(2), Duration::from_secs(30), 3)
            .with_jitter(false);

        assert_eq!(config.min_delay, Duration::from_secs(2));
        assert_eq!(config.max_retries, 3);
        assert!(!config.with_jitter);
    }

    #[test]
    fn transient_errors_are_classified() {
        assert!(is_transient_db_error(&DbErr::Conn(
            sea_orm::RuntimeErr::Internal("reset".to_string())
        )));
        assert!(is_transient_db_error(&DbErr::Exec(
            sea_orm::RuntimeErr::Internal("database is locked".to_string())
        )));
        assert!(!is_transient_db_error(&DbErr::Exec(
            sea_orm::RuntimeErr::Internal("UNIQUE constraint failed".to_string())
        )));
        assert!(!is_transient_db_error(&DbErr::RecordNotFound(
            "sync_logs".to_string()
        )));
    }

    fn fast() -> RetryConfig {
        RetryConfig::new(Duration::from_millis(1), Duration::from_millis(2), 3).with_jitter(false)
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_db_retry_config(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(DbErr::Exec(sea_orm::RuntimeErr::Internal(
                            "database is locked".to_string(),
                        )))
                    } else {
                        Ok(7u32)
                    }
                }
            },
            "test write",
            fast(),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = with_db_retry_config(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    calls_capture.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(DbErr::RecordNotFound("sync_logs".to_string()))
                }
            },
            "test write",
            fast(),
        )
        .await
        .expect_err("permanent error");

        assert!(matches!(err, DbErr::RecordNotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
