use gitfolio::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::Started {
                username,
                sync_type,
            } => {
                tracing::info!(username = %username, sync_type = ?sync_type, "Sync started");
            }

            SyncProgress::FetchedPage {
                url,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(url = %url, page = ?page, count, total_so_far, "Fetched page");
            }

            SyncProgress::ErrorRecorded { message } => {
                tracing::warn!(error = %message, "Sync error recorded");
            }

            SyncProgress::SyncingRepository { full_name } => {
                tracing::debug!(repo = %full_name, "Syncing commits");
            }

            SyncProgress::CommitsSkipped => {
                tracing::info!("No repositories synced, skipping commits");
            }

            SyncProgress::Finished {
                sync_type,
                status,
                synced,
                error_count,
                duration_ms,
            } => {
                tracing::info!(
                    sync_type = ?sync_type,
                    status = ?status,
                    synced,
                    error_count,
                    duration_ms,
                    "Sync finished"
                );
            }

            _ => {}
        }
    }
}
