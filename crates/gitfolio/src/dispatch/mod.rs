//! Fire-and-forget dispatch of sync jobs.
//!
//! A trigger hands a [`SyncRequest`] to a [`SyncExecutor`] and gets a
//! [`JobHandle`] back immediately. The job runs to completion whether or not
//! anyone waits on the handle.
//!
//! # Module Structure
//!
//! - [`pool`] - `WorkerPool`: bounded set of tokio workers fed by a queue
//! - [`inline`] - `InlineExecutor`: runs the job inside `submit`

mod inline;
mod pool;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::profile::{self, ProfileError};
use crate::sync::{SyncEngine, SyncError, SyncKind, SyncReport, SyncRequest};

pub use inline::InlineExecutor;
pub use pool::{DEFAULT_QUEUE_CAPACITY, WorkerPool};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No token was given and none is stored for the user.
    #[error("No GitHub access token available for user {user_id}")]
    MissingCredential { user_id: Uuid },

    #[error(transparent)]
    Profile(ProfileError),

    /// The executor no longer accepts jobs.
    #[error("Sync executor is shut down")]
    Closed,

    /// The job ended without reporting back.
    #[error("Sync job {job_id} was lost before reporting a result")]
    JobLost { job_id: Uuid },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<ProfileError> for DispatchError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound { user_id } | ProfileError::MissingCredential { user_id } => {
                DispatchError::MissingCredential { user_id }
            }
            other => DispatchError::Profile(other),
        }
    }
}

/// Something that can run a sync request to completion.
#[async_trait]
pub trait SyncRunner: Send + Sync + 'static {
    async fn run(&self, request: SyncRequest) -> Result<SyncReport, SyncError>;
}

#[async_trait]
impl SyncRunner for SyncEngine {
    async fn run(&self, request: SyncRequest) -> Result<SyncReport, SyncError> {
        SyncEngine::run(self, request).await
    }
}

/// Accepts sync jobs without waiting for them.
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    async fn submit(&self, request: SyncRequest) -> Result<JobHandle, DispatchError>;
}

pub(crate) type JobReply = oneshot::Sender<Result<SyncReport, SyncError>>;

/// Acknowledgement of a submitted job.
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    rx: oneshot::Receiver<Result<SyncReport, SyncError>>,
}

impl JobHandle {
    pub(crate) fn new() -> (Self, JobReply) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                id: Uuid::new_v4(),
                rx,
            },
            tx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the job to finish and return its report.
    pub async fn wait(self) -> Result<SyncReport, DispatchError> {
        match self.rx.await {
            Ok(result) => result.map_err(DispatchError::from),
            Err(_) => Err(DispatchError::JobLost { job_id: self.id }),
        }
    }
}

/// Queue a sync for `user_id`.
///
/// Without an explicit token the user's stored token must exist; that check
/// happens here, before anything is queued. Everything after submission is
/// reported through the job's sync logs.
pub async fn enqueue_sync(
    executor: &dyn SyncExecutor,
    db: &DatabaseConnection,
    user_id: Uuid,
    access_token: Option<String>,
    kind: SyncKind,
) -> Result<JobHandle, DispatchError> {
    let credential = match access_token.filter(|t| !t.trim().is_empty()) {
        Some(token) => Some(token),
        None => {
            profile::credential_for(db, user_id).await?;
            None
        }
    };

    let request = SyncRequest {
        user_id,
        credential,
        kind,
    };
    let handle = executor.submit(request).await?;
    tracing::info!(%user_id, %kind, job_id = %handle.id(), "Queued GitHub sync");
    Ok(handle)
}
