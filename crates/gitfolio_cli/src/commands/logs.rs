use gitfolio::{SyncLogModel, profile, sync_log};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::{OutputFormat, print_rows};

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct LogRow {
    #[tabled(rename = "Started")]
    pub started_at: String,
    #[tabled(rename = "Type")]
    pub sync_type: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Repos")]
    pub repos_synced: i32,
    #[tabled(rename = "Commits")]
    pub commits_synced: i32,
    #[tabled(rename = "Errors")]
    pub error_count: i32,
    #[tabled(rename = "Duration (ms)")]
    pub duration_ms: String,
    #[tabled(rename = "First Error")]
    pub first_error: String,
}

impl From<&SyncLogModel> for LogRow {
    fn from(log: &SyncLogModel) -> Self {
        let first_error = log
            .errors
            .as_array()
            .and_then(|errors| errors.first())
            .and_then(|e| e["error"].as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            started_at: log.started_at.format("%Y-%m-%d %H:%M:%S %z").to_string(),
            sync_type: format!("{:?}", log.sync_type).to_lowercase(),
            status: format!("{:?}", log.status).to_lowercase(),
            repos_synced: log.repos_synced,
            commits_synced: log.commits_synced,
            error_count: log.error_count,
            duration_ms: log
                .duration_ms
                .map_or_else(|| "-".to_string(), |ms| ms.to_string()),
            first_error,
        }
    }
}

pub(crate) async fn handle_logs(
    db: &DatabaseConnection,
    user_id: Uuid,
    limit: u64,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = profile::get_by_user_id(db, user_id).await?;
    let logs = sync_log::recent_for_profile(db, profile.id, limit).await?;
    if logs.is_empty() {
        println!("No syncs recorded for {}.", profile.github_username);
        return Ok(());
    }
    print_rows(logs.iter().map(LogRow::from).collect(), output);
    Ok(())
}
