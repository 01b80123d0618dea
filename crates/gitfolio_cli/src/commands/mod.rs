pub(crate) mod disconnect;
pub(crate) mod logs;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod profile;
pub(crate) mod schedule;
pub(crate) mod sync;

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use gitfolio::http::ReqwestTransport;

/// Output format for tabular results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

pub(crate) fn print_rows<T>(rows: Vec<T>, format: OutputFormat)
where
    T: tabled::Tabled + serde::Serialize,
{
    match format {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        },
    }
}

/// Shared reqwest transport; per-request timeouts come from the client.
pub(crate) fn transport(timeout: Duration) -> Result<Arc<ReqwestTransport>, Box<dyn std::error::Error>> {
    Ok(Arc::new(ReqwestTransport::with_timeout(timeout)?))
}
