use std::sync::Arc;
use std::time::Duration;

use gitfolio::dispatch::{DispatchError, WorkerPool, enqueue_sync};
use gitfolio::http::HttpTransport;
use gitfolio::{SyncEngine, SyncKind, SyncSettings, profile};
use sea_orm::DatabaseConnection;

use super::transport;
use crate::progress::ProgressReporter;
use crate::shutdown::is_shutdown_requested;

/// Counts for one scheduler pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PassSummary {
    pub due: usize,
    pub queued: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Enqueue every due profile and wait for its job.
///
/// Waiting keeps a slow sync from being queued twice by the next pass.
pub(crate) async fn run_pass(
    pool: &WorkerPool,
    db: &DatabaseConnection,
) -> Result<PassSummary, Box<dyn std::error::Error>> {
    let now = chrono::Utc::now().fixed_offset();
    let due = profile::find_due_for_auto_sync(db, now).await?;
    let mut summary = PassSummary {
        due: due.len(),
        ..PassSummary::default()
    };

    let mut jobs = Vec::with_capacity(due.len());
    for p in due {
        match enqueue_sync(pool, db, p.user_id, None, SyncKind::All).await {
            Ok(job) => {
                summary.queued += 1;
                jobs.push((p.github_username, job));
            }
            Err(DispatchError::MissingCredential { user_id }) => {
                tracing::warn!(%user_id, username = %p.github_username, "No stored token, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for (username, job) in jobs {
        match job.wait().await {
            Ok(report) if !report.any_failed() => {}
            Ok(_) => summary.failed += 1,
            Err(e) => {
                tracing::error!(username = %username, error = %e, "Scheduled sync failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

pub(crate) async fn handle_schedule(
    db: Arc<DatabaseConnection>,
    settings: SyncSettings,
    interval: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn HttpTransport> = transport(settings.request_timeout)?;
    let workers = settings.workers;
    let reporter = Arc::new(ProgressReporter::new());
    let engine =
        SyncEngine::new(Arc::clone(&db), transport, settings).with_progress(reporter.as_callback());
    let pool = WorkerPool::new(Arc::new(engine), workers);
    tracing::info!(workers = pool.worker_count(), interval = ?interval, "Scheduler started");

    let result = loop {
        let summary = match run_pass(&pool, &db).await {
            Ok(summary) => summary,
            Err(e) => break Err(e),
        };
        tracing::info!(
            due = summary.due,
            queued = summary.queued,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scheduler pass complete"
        );

        let Some(secs) = interval else {
            break Ok(());
        };
        if wait_or_shutdown(Duration::from_secs(secs)).await {
            break Ok(());
        }
    };

    pool.shutdown().await;
    result
}

/// Sleep for `period`, returning early (with `true`) once Ctrl+C was pressed.
async fn wait_or_shutdown(period: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + period;
    while tokio::time::Instant::now() < deadline {
        if is_shutdown_requested() {
            return true;
        }
        let step = Duration::from_millis(250).min(deadline - tokio::time::Instant::now());
        tokio::time::sleep(step).await;
    }
    is_shutdown_requested()
}
