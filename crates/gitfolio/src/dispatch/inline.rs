use std::sync::Arc;

use async_trait::async_trait;

use super::{DispatchError, JobHandle, SyncExecutor, SyncRunner};
use crate::sync::SyncRequest;

/// Runs each job to completion inside `submit`.
///
/// For tests and one-shot CLI runs where nothing else would drive a queue.
#[derive(Debug)]
pub struct InlineExecutor<R> {
    runner: Arc<R>,
}

impl<R: SyncRunner> InlineExecutor<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: SyncRunner> SyncExecutor for InlineExecutor<R> {
    async fn submit(&self, request: SyncRequest) -> Result<JobHandle, DispatchError> {
        let (handle, reply) = JobHandle::new();
        let result = self.runner.run(request).await;
        if let Err(ref e) = result {
            tracing::error!(job_id = %handle.id(), error = %e, "Sync job failed");
        }
        let _ = reply.send(result);
        Ok(handle)
    }
}
