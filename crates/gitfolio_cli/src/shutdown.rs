use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;

/// Set once Ctrl+C is pressed; the scheduler checks it between passes.
static STOP_SCHEDULER: AtomicBool = AtomicBool::new(false);

const STOP_NOTICE: &str = "Stopping scheduler: no new passes, waiting for queued syncs to finalize";
const FORCE_HINT: &str = "Press Ctrl+C again to exit now (unfinished sync logs stay pending).";

#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    STOP_SCHEDULER.load(Ordering::Acquire)
}

#[inline]
fn request_shutdown() {
    STOP_SCHEDULER.store(true, Ordering::Release);
}

/// Install the scheduler's Ctrl+C handler.
///
/// The first Ctrl+C stops the scheduler after in-flight syncs finalize;
/// the second exits immediately, leaving their logs `pending`.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable, scheduler runs until killed");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n{STOP_NOTICE}.");
            eprintln!("{FORCE_HINT}");
        } else {
            tracing::warn!("{STOP_NOTICE}");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Scheduler interrupted with syncs in flight");
            std::process::exit(130);
        }
    });
}
