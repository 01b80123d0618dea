//! Shared sync types and constants.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::sync_status::SyncStatus;
use crate::entity::sync_type::SyncType;

/// Maximum number of error entries stored on a sync log.
pub const MAX_RECORDED_ERRORS: usize = 50;

/// Maximum characters of a response body kept in an error entry.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// What a sync job should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Repositories,
    Commits,
    /// Repositories first, then commits for every stored repository.
    All,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncKind::Repositories => write!(f, "repositories"),
            SyncKind::Commits => write!(f, "commits"),
            SyncKind::All => write!(f, "all"),
        }
    }
}

impl FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repositories" | "repos" => Ok(SyncKind::Repositories),
            "commits" => Ok(SyncKind::Commits),
            "all" => Ok(SyncKind::All),
            other => Err(format!(
                "unknown sync kind '{other}' (expected repositories, commits or all)"
            )),
        }
    }
}

/// A queued sync job.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Local user whose profile is synced.
    pub user_id: Uuid,
    /// Token to use; the profile's stored token when `None`.
    pub credential: Option<String>,
    pub kind: SyncKind,
}

impl SyncRequest {
    pub fn new(user_id: Uuid, kind: SyncKind) -> Self {
        Self {
            user_id,
            credential: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_credential(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(token.into());
        self
    }
}

impl fmt::Debug for SyncRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRequest")
            .field("user_id", &self.user_id)
            .field("has_credential", &self.credential.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}

/// One structured failure recorded during a sync invocation.
///
/// Serialized into the sync log's `errors` column with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorEntry {
    /// Request never produced a usable response (timeout, connect, bad body).
    Transport { url: String, error: String },
    /// GitHub refused the request because of rate limiting.
    RateLimit {
        url: String,
        status_code: u16,
        error: String,
    },
    /// Any other non-200 response.
    Http {
        url: String,
        status_code: u16,
        error: String,
    },
    /// A single fetched record could not be mapped or stored.
    Item { item: String, error: String },
    /// The sync body itself failed or panicked.
    Critical { error: String },
}

impl ErrorEntry {
    pub fn transport(url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            error: error.to_string(),
        }
    }

    pub fn item(item: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Item {
            item: item.into(),
            error: error.to_string(),
        }
    }

    pub fn critical(error: impl fmt::Display) -> Self {
        Self::Critical {
            error: error.to_string(),
        }
    }

    /// The human-readable message of this entry.
    pub fn message(&self) -> &str {
        match self {
            ErrorEntry::Transport { error, .. }
            | ErrorEntry::RateLimit { error, .. }
            | ErrorEntry::Http { error, .. }
            | ErrorEntry::Item { error, .. }
            | ErrorEntry::Critical { error } => error,
        }
    }

    #[inline]
    pub fn is_critical(&self) -> bool {
        matches!(self, ErrorEntry::Critical { .. })
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ErrorEntry::RateLimit { .. })
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorEntry::Transport { url, error } => write!(f, "{url}: {error}"),
            ErrorEntry::RateLimit {
                url,
                status_code,
                error,
            }
            | ErrorEntry::Http {
                url,
                status_code,
                error,
            } => write!(f, "{url} ({status_code}): {error}"),
            ErrorEntry::Item { item, error } => write!(f, "{item}: {error}"),
            ErrorEntry::Critical { error } => write!(f, "critical: {error}"),
        }
    }
}

/// Error entries with an exact total but a bounded stored list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
    total: usize,
    critical: bool,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. Past the cap only the count grows, except that a
    /// critical entry replaces the last kept one so it is never lost.
    pub fn push(&mut self, entry: ErrorEntry) {
        self.total += 1;
        if entry.is_critical() {
            self.critical = true;
            if self.entries.len() >= MAX_RECORDED_ERRORS {
                self.entries.truncate(MAX_RECORDED_ERRORS - 1);
                self.entries.push(entry);
                return;
            }
        }
        if self.entries.len() < MAX_RECORDED_ERRORS {
            self.entries.push(entry);
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ErrorEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Merge another log, keeping its exact count even for dropped entries.
    pub fn absorb(&mut self, other: ErrorLog) {
        let dropped = other.total - other.entries.len();
        self.critical |= other.critical;
        self.extend(other.entries);
        self.total += dropped;
    }

    /// Total number of errors seen, including ones not kept.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Whether a critical entry was recorded.
    #[inline]
    pub fn has_critical(&self) -> bool {
        self.critical
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// JSON array stored in the sync log.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.entries).unwrap_or_else(|_| serde_json::json!([]))
    }
}

/// Running counters shared between the sync body and its finalizer.
///
/// The body runs as a spawned task; whatever it recorded before failing is
/// still visible to the finalizer through these handles.
#[derive(Debug, Clone, Default)]
pub struct SyncTally {
    synced: Arc<AtomicUsize>,
    errors: Arc<Mutex<ErrorLog>>,
}

impl SyncTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_synced(&self, count: usize) {
        self.synced.fetch_add(count, Ordering::SeqCst);
    }

    pub fn synced(&self) -> usize {
        self.synced.load(Ordering::SeqCst)
    }

    pub fn record(&self, entry: ErrorEntry) {
        self.lock_errors().push(entry);
    }

    pub fn record_all(&self, log: ErrorLog) {
        self.lock_errors().absorb(log);
    }

    /// Snapshot of the error log.
    pub fn errors(&self) -> ErrorLog {
        self.lock_errors().clone()
    }

    // A panic while holding the lock must not hide the errors collected so far.
    fn lock_errors(&self) -> std::sync::MutexGuard<'_, ErrorLog> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Final state of one finalized sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub log_id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub synced: usize,
    pub error_count: usize,
    pub duration_ms: i64,
}

/// Result of one `run` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub repositories: Option<SyncOutcome>,
    pub commits: Option<SyncOutcome>,
    /// Commits stored per repository, keyed by full name.
    pub commits_by_repository: BTreeMap<String, usize>,
}

impl SyncReport {
    pub fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            repositories: None,
            commits: None,
            commits_by_repository: BTreeMap::new(),
        }
    }

    /// Outcomes in the order they ran.
    pub fn outcomes(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.repositories.iter().chain(self.commits.iter())
    }

    /// Whether any invocation in this report ended `failed`.
    pub fn any_failed(&self) -> bool {
        self.outcomes().any(|o| o.status == SyncStatus::Failed)
    }
}
