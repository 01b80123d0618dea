use console::{Term, style};
use gitfolio::SyncStatus;
use gitfolio::sync::SyncProgress;

/// Styled status lines on stderr.
pub struct InteractiveReporter {
    term: Term,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        if let Some(line) = render(&event) {
            // Losing a progress line is not worth failing the sync over.
            let _ = self.term.write_line(&line);
        }
    }
}

fn render(event: &SyncProgress) -> Option<String> {
    let line = match event {
        SyncProgress::Started {
            username,
            sync_type,
        } => format!(
            "{} Syncing {:?} for {}",
            style("→").cyan().bold(),
            sync_type,
            style(username).cyan()
        ),
        SyncProgress::FetchedPage {
            page, total_so_far, ..
        } => format!(
            "  {} page {} ({} items so far)",
            style("↓").dim(),
            page.map_or_else(|| "?".to_string(), |p| p.to_string()),
            total_so_far
        ),
        SyncProgress::ErrorRecorded { message } => {
            format!("  {} {}", style("⚠").yellow().bold(), message)
        }
        SyncProgress::SyncingRepository { full_name } => {
            format!("  {} {}", style("·").dim(), full_name)
        }
        SyncProgress::CommitsSkipped => format!(
            "{} No repositories synced, skipping commits",
            style("⚠").yellow().bold()
        ),
        SyncProgress::Finished {
            sync_type,
            status,
            synced,
            error_count,
            duration_ms,
        } => {
            let mark = match status {
                SyncStatus::Success => style("✓").green().bold(),
                SyncStatus::Partial => style("⚠").yellow().bold(),
                _ => style("✗").red().bold(),
            };
            format!(
                "{} {:?} {:?}: {} synced, {} errors in {} ms",
                mark, sync_type, status, synced, error_count, duration_ms
            )
        }
        _ => return None,
    };
    Some(line)
}
