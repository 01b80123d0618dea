use std::sync::Arc;

use console::style;
use gitfolio::dispatch::{InlineExecutor, enqueue_sync};
use gitfolio::http::HttpTransport;
use gitfolio::sync::SyncOutcome;
use gitfolio::{SyncEngine, SyncKind, SyncReport, SyncSettings};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::{OutputFormat, print_rows, transport};
use crate::progress::ProgressReporter;

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct OutcomeRow {
    #[tabled(rename = "Type")]
    pub sync_type: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Synced")]
    pub synced: usize,
    #[tabled(rename = "Errors")]
    pub errors: usize,
    #[tabled(rename = "Duration (ms)")]
    pub duration_ms: i64,
    #[tabled(rename = "Log")]
    pub log_id: String,
}

impl From<&SyncOutcome> for OutcomeRow {
    fn from(outcome: &SyncOutcome) -> Self {
        Self {
            sync_type: format!("{:?}", outcome.sync_type).to_lowercase(),
            status: format!("{:?}", outcome.status).to_lowercase(),
            synced: outcome.synced,
            errors: outcome.error_count,
            duration_ms: outcome.duration_ms,
            log_id: outcome.log_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
struct RepositoryCommitsRow {
    #[tabled(rename = "Repository")]
    repository: String,
    #[tabled(rename = "Commits")]
    commits: usize,
}

pub(crate) fn print_report(report: &SyncReport, output: OutputFormat) {
    if let OutputFormat::Json = output {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
        return;
    }

    print_rows(report.outcomes().map(OutcomeRow::from).collect(), output);
    if !report.commits_by_repository.is_empty() {
        let rows = report
            .commits_by_repository
            .iter()
            .map(|(repository, commits)| RepositoryCommitsRow {
                repository: repository.clone(),
                commits: *commits,
            })
            .collect();
        print_rows(rows, output);
    }
}

pub(crate) async fn handle_sync(
    db: Arc<DatabaseConnection>,
    settings: SyncSettings,
    user_id: Uuid,
    kind: SyncKind,
    token: Option<String>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn HttpTransport> = transport(settings.request_timeout)?;
    let reporter = Arc::new(ProgressReporter::new());
    let engine = SyncEngine::new(Arc::clone(&db), transport, settings).with_progress(reporter.as_callback());
    let executor = InlineExecutor::new(Arc::new(engine));

    let job = enqueue_sync(&executor, &db, user_id, token, kind).await?;
    let report = job.wait().await?;

    print_report(&report, output);
    if report.any_failed() {
        eprintln!(
            "{} At least one sync failed; see `gitfolio logs --user {}`",
            style("✗").red().bold(),
            user_id
        );
        std::process::exit(1);
    }
    Ok(())
}
