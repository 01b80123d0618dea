//! Progress reporting types for sync operations.

use std::sync::Arc;

use crate::entity::sync_status::SyncStatus;
use crate::entity::sync_type::SyncType;

/// Progress events emitted while a sync invocation runs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A sync log was created and the invocation started.
    Started {
        username: String,
        sync_type: SyncType,
    },

    /// A page of items was fetched from GitHub.
    FetchedPage {
        url: String,
        /// Page number taken from the URL, if it carries one.
        page: Option<u32>,
        count: usize,
        total_so_far: usize,
    },

    /// A fetch or reconcile step recorded an error.
    ErrorRecorded { message: String },

    /// Commit sync moved on to the next repository.
    SyncingRepository { full_name: String },

    /// Commit sync was skipped because no repositories were stored.
    CommitsSkipped,

    /// The sync log was finalized.
    Finished {
        sync_type: SyncType,
        status: SyncStatus,
        synced: usize,
        error_count: usize,
        duration_ms: i64,
    },
}

/// Callback for progress updates.
///
/// Shared with the spawned sync body, hence `Arc`.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
