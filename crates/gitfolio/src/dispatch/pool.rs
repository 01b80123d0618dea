use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::{DispatchError, JobHandle, JobReply, SyncExecutor, SyncRunner};
use crate::sync::SyncRequest;

/// Jobs that can wait in the queue before `submit` applies backpressure.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct Job {
    request: SyncRequest,
    handle_id: uuid::Uuid,
    reply: JobReply,
}

/// A fixed set of tokio workers consuming one job queue.
///
/// Jobs run concurrently across workers with no ordering guarantee.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Start `workers` workers (at least one) running jobs on `runner`.
    pub fn new<R: SyncRunner>(runner: Arc<R>, workers: usize) -> Self {
        Self::with_capacity(runner, workers, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity<R: SyncRunner>(runner: Arc<R>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|worker| {
                let runner = Arc::clone(&runner);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(run_worker(worker, runner, receiver))
            })
            .collect();

        Self { sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, let the workers drain the queue, and wait for them.
    pub async fn shutdown(self) {
        let Self { sender, workers } = self;
        drop(sender);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Sync worker ended abnormally");
            }
        }
        tracing::debug!("Worker pool shut down");
    }
}

async fn run_worker<R: SyncRunner>(
    worker: usize,
    runner: Arc<R>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            break;
        };

        tracing::debug!(worker, job_id = %job.handle_id, user_id = %job.request.user_id, "Running sync job");

        // A panicking job must not take the worker down with it.
        let runner = Arc::clone(&runner);
        let request = job.request;
        let result = tokio::spawn(async move { runner.run(request).await }).await;

        match result {
            Ok(result) => {
                if let Err(ref e) = result {
                    tracing::error!(worker, job_id = %job.handle_id, error = %e, "Sync job failed");
                }
                let _ = job.reply.send(result);
            }
            Err(e) => {
                tracing::error!(worker, job_id = %job.handle_id, error = %e, "Sync job panicked");
            }
        }
    }
    tracing::debug!(worker, "Sync worker stopped");
}

#[async_trait]
impl SyncExecutor for WorkerPool {
    async fn submit(&self, request: SyncRequest) -> Result<JobHandle, DispatchError> {
        let (handle, reply) = JobHandle::new();
        let job = Job {
            request,
            handle_id: handle.id(),
            reply,
        };
        self.sender
            .send(job)
            .await
            .map_err(|_| DispatchError::Closed)?;
        Ok(handle)
    }
}
