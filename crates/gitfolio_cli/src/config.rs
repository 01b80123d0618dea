//! Configuration file support for gitfolio.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GITFOLIO_`, sections split by `__`, e.g., `GITFOLIO_DATABASE__URL`)
//! 3. Config file (~/.config/gitfolio/config.toml or ./gitfolio.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/gitfolio/gitfolio.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/gitfolio"  # optional, SQLite in the state dir otherwise
//!
//! [github]
//! api_base_url = "https://api.github.com"
//! client_id = "Iv1.abc"        # OAuth app, needed for `disconnect --revoke`
//! client_secret = "..."        # or use GITFOLIO_GITHUB__CLIENT_SECRET env var
//!
//! [sync]
//! workers = 4
//! requests_per_second = 10
//! request_timeout_secs = 30
//! no_rate_limit = false
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitfolio::SyncSettings;
use gitfolio::github::{DEFAULT_API_BASE_URL, GITHUB_DEFAULT_RPS, OAuthApp};
use gitfolio::settings::DEFAULT_WORKERS;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory for the default database")]
    NoStateDir,

    #[error("github.client_id and github.client_secret must be set to revoke grants")]
    MissingOAuthApp,
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Default sync options.
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API root, overridable for GitHub Enterprise.
    pub api_base_url: String,
    /// OAuth application client id.
    pub client_id: Option<String>,
    /// OAuth application client secret.
    pub client_secret: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of worker-pool consumers.
    pub workers: usize,
    /// Proactive request budget.
    pub requests_per_second: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Whether to disable proactive rate limiting.
    pub no_rate_limit: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            requests_per_second: GITHUB_DEFAULT_RPS,
            request_timeout_secs: 30,
            no_rate_limit: false,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/gitfolio/config.toml)
    /// 3. Local config file (./gitfolio.toml)
    /// 4. Environment variables with GITFOLIO_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("gitfolio.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitfolio.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // GITFOLIO_SYNC__WORKERS -> sync.workers
        builder = builder.add_source(
            Environment::with_prefix("GITFOLIO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter makes SQLite create the file if it doesn't exist.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }
        let state_dir = Self::default_state_dir().ok_or(ConfigError::NoStateDir)?;
        let db_path = state_dir.join("gitfolio.db");
        Ok(format!("sqlite://{}?mode=rwc", db_path.display()))
    }

    /// Engine and pool settings, with CLI overrides applied on top.
    pub fn sync_settings(&self, workers: Option<usize>, no_rate_limit: bool) -> SyncSettings {
        let rps = if no_rate_limit || self.sync.no_rate_limit {
            None
        } else {
            Some(self.sync.requests_per_second)
        };
        SyncSettings::default()
            .with_api_base_url(&self.github.api_base_url)
            .with_request_timeout(Duration::from_secs(self.sync.request_timeout_secs))
            .with_requests_per_second(rps)
            .with_workers(workers.unwrap_or(self.sync.workers))
    }

    /// OAuth app credentials for grant revocation.
    pub fn oauth_app(&self) -> Result<OAuthApp, ConfigError> {
        match (&self.github.client_id, &self.github.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok(OAuthApp {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => Err(ConfigError::MissingOAuthApp),
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitfolio").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gitfolio` or `~/.local/state/gitfolio`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitfolio").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
