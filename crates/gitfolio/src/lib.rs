//! gitfolio - GitHub synchronization for a developer-portfolio backend.
//!
//! Pulls a user's repositories and their own commits from the GitHub REST
//! API into the local database, recording every invocation as a sync log.
//!
//! # Features
//!
//! - `sqlite` (default) / `postgres` - Database backends.
//! - `migrate` (default) - Enables database migration support. When enabled,
//!   you can use [`connect_and_migrate`] to run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gitfolio::{SyncEngine, SyncKind, SyncSettings, connect_and_migrate};
//! use gitfolio::dispatch::{WorkerPool, enqueue_sync};
//! use gitfolio::http::ReqwestTransport;
//!
//! let db = Arc::new(connect_and_migrate("sqlite://gitfolio.db?mode=rwc").await?);
//! let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
//! let engine = Arc::new(SyncEngine::new(Arc::clone(&db), transport, SyncSettings::default()));
//! let pool = WorkerPool::new(engine, 4);
//!
//! let job = enqueue_sync(&pool, &db, user_id, None, SyncKind::All).await?;
//! let report = job.wait().await?;
//! ```

pub mod auth_cache;
pub mod db;
pub mod dispatch;
pub mod entity;
pub mod github;
pub mod http;
pub mod profile;
pub mod reconcile;
pub mod retry;
pub mod settings;
pub mod sync;
pub mod sync_log;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use dispatch::{DispatchError, JobHandle, SyncExecutor, enqueue_sync};
pub use entity::prelude::*;
pub use profile::ProfileError;
pub use settings::SyncSettings;
pub use sync::{SyncEngine, SyncError, SyncKind, SyncReport, SyncRequest};
