//! gitfolio CLI - operate the GitHub sync core from the command line.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::Term;
use gitfolio::SyncKind;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "gitfolio")]
#[command(version)]
#[command(about = "GitHub sync for a developer portfolio")]
#[command(
    long_about = "gitfolio pulls a user's repositories and their own commits from the GitHub \
REST API into the portfolio database. Every sync is recorded as a sync log with its status, \
counts, and a capped list of errors."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync everything for a user:
        $ gitfolio sync --user 7d3c1a8e-2f4b-4c47-9a0e-5b6f1c2d3e4f

    Sync only repositories with an explicit token:
        $ gitfolio sync --user <uuid> --kind repositories --token gho_...

    Run the auto-sync scheduler every 5 minutes with 8 workers:
        $ gitfolio schedule --interval 300 --workers 8

    Show the last 10 sync logs as JSON:
        $ gitfolio logs --user <uuid> --limit 10 --output json

    Generate shell completions:
        $ gitfolio completions bash > ~/.local/share/bash-completion/completions/gitfolio

CONFIGURATION
    gitfolio reads configuration from:
      1. ~/.config/gitfolio/config.toml (or $XDG_CONFIG_HOME/gitfolio/config.toml)
      2. ./gitfolio.toml
      3. Environment variables (GITFOLIO_* prefix, e.g., GITFOLIO_DATABASE__URL)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITFOLIO_DATABASE__URL          Database connection string (default: ~/.local/state/gitfolio/gitfolio.db)
    GITFOLIO_GITHUB__API_BASE_URL   GitHub REST API root
    GITFOLIO_GITHUB__CLIENT_ID      OAuth app client id (for --revoke)
    GITFOLIO_GITHUB__CLIENT_SECRET  OAuth app client secret (for --revoke)
    GITFOLIO_SYNC__WORKERS          Worker pool size
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Sync a user's repositories and/or commits from GitHub
    Sync {
        /// Portfolio user id
        #[arg(short, long)]
        user: Uuid,
        /// What to sync
        #[arg(short, long, value_enum, default_value_t = KindArg::All)]
        kind: KindArg,
        /// Access token to use instead of the stored one
        #[arg(short, long)]
        token: Option<String>,
        /// Disable proactive rate limiting (may cause API throttling)
        #[arg(short = 'R', long)]
        no_rate_limit: bool,
        /// Output format for the report
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Enqueue syncs for every profile whose auto-sync is due
    Schedule {
        /// Seconds between scheduler passes (runs a single pass if omitted)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Worker pool size (default from config or 4)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Disable proactive rate limiting (may cause API throttling)
        #[arg(short = 'R', long)]
        no_rate_limit: bool,
    },
    /// Show recent sync logs for a user
    Logs {
        /// Portfolio user id
        #[arg(short, long)]
        user: Uuid,
        /// Maximum number of logs to show
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Linked GitHub profile operations
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Unlink a user's GitHub account and delete its synced data
    Disconnect {
        /// Portfolio user id
        #[arg(short, long)]
        user: Uuid,
        /// Also revoke the OAuth grant on GitHub
        #[arg(long)]
        revoke: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Re-fetch the GitHub user record and update the stored profile
    Refresh {
        /// Portfolio user id
        #[arg(short, long)]
        user: Uuid,
    },
    /// Check whether the stored token is still accepted by GitHub
    Validate {
        /// Portfolio user id
        #[arg(short, long)]
        user: Uuid,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum KindArg {
    All,
    Repositories,
    Commits,
}

impl From<KindArg> for SyncKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::All => SyncKind::All,
            KindArg::Repositories => SyncKind::Repositories,
            KindArg::Commits => SyncKind::Commits,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal; the
    // interactive reporter owns stderr otherwise.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("gitfolio=info,gitfolio_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { action } => {
            let database_url = prepare_database_url(&config)?;
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Sync {
            user,
            kind,
            token,
            no_rate_limit,
            output,
        } => {
            let db = Arc::new(gitfolio::connect_and_migrate(&prepare_database_url(&config)?).await?);
            let settings = config.sync_settings(None, no_rate_limit);
            commands::sync::handle_sync(db, settings, user, kind.into(), token, output).await?;
        }
        Commands::Schedule {
            interval,
            workers,
            no_rate_limit,
        } => {
            shutdown::setup_shutdown_handler();
            let db = Arc::new(gitfolio::connect_and_migrate(&prepare_database_url(&config)?).await?);
            let settings = config.sync_settings(workers, no_rate_limit);
            commands::schedule::handle_schedule(db, settings, interval).await?;
        }
        Commands::Logs {
            user,
            limit,
            output,
        } => {
            let db = gitfolio::connect_and_migrate(&prepare_database_url(&config)?).await?;
            commands::logs::handle_logs(&db, user, limit, output).await?;
        }
        Commands::Profile { action } => {
            let db = Arc::new(gitfolio::connect_and_migrate(&prepare_database_url(&config)?).await?);
            let settings = config.sync_settings(None, false);
            match action {
                ProfileAction::Refresh { user } => {
                    commands::profile::handle_refresh(db, settings, user).await?;
                }
                ProfileAction::Validate { user } => {
                    commands::profile::handle_validate(&db, settings, user).await?;
                }
            }
        }
        Commands::Disconnect { user, revoke } => {
            let db = gitfolio::connect_and_migrate(&prepare_database_url(&config)?).await?;
            commands::disconnect::handle_disconnect(&db, &config, user, revoke).await?;
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
    }

    Ok(())
}

/// Resolve the database URL, creating the parent directory of a SQLite file.
fn prepare_database_url(config: &config::Config) -> Result<String, Box<dyn std::error::Error>> {
    let database_url = config.database_url()?;

    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        if let Some(parent) = std::path::Path::new(db_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(database_url)
}
