//! Sync orchestration and the types shared by every sync invocation.
//!
//! # Module Structure
//!
//! - [`types`] - Core types: `SyncKind`, `SyncRequest`, `ErrorEntry`, `ErrorLog`, reports
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - `SyncEngine`: runs repository and commit syncs with guaranteed finalization

pub mod engine;
mod progress;
mod types;

pub use engine::{SyncEngine, SyncError};

pub use types::{
    ErrorEntry, ErrorLog, SyncKind, SyncOutcome, SyncReport, SyncRequest, SyncTally,
};

pub use types::{MAX_ERROR_BODY_CHARS, MAX_RECORDED_ERRORS};

pub use progress::{ProgressCallback, SyncProgress, emit};
