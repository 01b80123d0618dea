//! Sync orchestration for one GitHub profile.
//!
//! Each invocation (repositories or commits) owns exactly one sync log. The
//! body runs as a spawned task sharing a [`SyncTally`] with the finalizer, so
//! whatever the body recorded survives an error or a panic and the log is
//! always moved out of `pending`.
//!
//! # Example
//!
//! ```ignore
//! use gitfolio::sync::{SyncEngine, SyncKind, SyncRequest};
//!
//! let engine = SyncEngine::new(Arc::new(db), transport, SyncSettings::default());
//! let report = engine.run(SyncRequest::new(user_id, SyncKind::All)).await?;
//! for outcome in report.outcomes() {
//!     println!("{}: {} ({} synced)", outcome.sync_type, outcome.status, outcome.synced);
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{ErrorEntry, ErrorLog, SyncKind, SyncOutcome, SyncReport, SyncRequest, SyncTally};
use crate::entity::github_profile::Model as ProfileModel;
use crate::entity::sync_type::SyncType;
use crate::github::{ApiRateLimiter, GitHubClient, GitHubError};
use crate::http::HttpTransport;
use crate::profile::{self, ProfileError};
use crate::reconcile::{CommitReconciler, RepositoryReconciler, reconcile};
use crate::settings::SyncSettings;
use crate::sync_log;

/// Failures that keep a sync from producing a log at all.
///
/// Everything that happens after the log exists is recorded on it instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No GitHub profile for user {user_id}")]
    ProfileNotFound { user_id: Uuid },

    #[error("No GitHub access token available for user {user_id}")]
    MissingCredential { user_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Profile(ProfileError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),
}

impl From<ProfileError> for SyncError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound { user_id } => SyncError::ProfileNotFound { user_id },
            ProfileError::MissingCredential { user_id } => SyncError::MissingCredential { user_id },
            ProfileError::Database(e) => SyncError::Database(e),
            other => SyncError::Profile(other),
        }
    }
}

/// Runs sync invocations against GitHub and the database.
#[derive(Clone)]
pub struct SyncEngine {
    db: Arc<DatabaseConnection>,
    transport: Arc<dyn HttpTransport>,
    settings: SyncSettings,
    rate_limiter: Option<ApiRateLimiter>,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("settings", &self.settings)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        db: Arc<DatabaseConnection>,
        transport: Arc<dyn HttpTransport>,
        settings: SyncSettings,
    ) -> Self {
        let rate_limiter = settings.rate_limiter();
        Self {
            db,
            transport,
            settings,
            rate_limiter,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// A client for `token` sharing this engine's transport and rate limiter.
    pub fn client(&self, token: &str) -> GitHubClient {
        GitHubClient::new(Arc::clone(&self.transport), token)
            .with_base_url(&self.settings.api_base_url)
            .with_timeout(self.settings.request_timeout)
            .with_rate_limiter(self.rate_limiter.clone())
    }

    fn emit(&self, event: SyncProgress) {
        emit(self.on_progress.as_ref(), event);
    }

    /// The profile of `user_id` and the token to use for it.
    async fn load(
        &self,
        user_id: Uuid,
        credential: Option<&str>,
    ) -> Result<(ProfileModel, String), SyncError> {
        let profile = profile::find_by_user_id(&self.db, user_id)
            .await?
            .ok_or(SyncError::ProfileNotFound { user_id })?;
        let token = credential
            .map(String::from)
            .or_else(|| profile.access_token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or(SyncError::MissingCredential { user_id })?;
        Ok((profile, token))
    }

    /// Run one sync request to completion.
    ///
    /// Returns `Err` only when no sync log could be written. The profile's
    /// `last_sync` is stamped when no invocation ended `failed`.
    pub async fn run(&self, request: SyncRequest) -> Result<SyncReport, SyncError> {
        let (profile, token) = self
            .load(request.user_id, request.credential.as_deref())
            .await?;
        let client = self.client(&token);
        let mut report = SyncReport::new(request.kind);

        tracing::info!(
            user_id = %request.user_id,
            username = %profile.github_username,
            kind = %request.kind,
            "Starting GitHub sync"
        );

        match request.kind {
            SyncKind::Repositories => {
                report.repositories = Some(self.sync_repositories(&profile, &client).await?);
            }
            SyncKind::Commits => {
                let (outcome, per_repository) = self.sync_commits(&profile, &client).await?;
                report.commits = Some(outcome);
                report.commits_by_repository = per_repository;
            }
            SyncKind::All => {
                let repositories = self.sync_repositories(&profile, &client).await?;
                let skip_commits = repositories.synced == 0;
                report.repositories = Some(repositories);

                if skip_commits {
                    tracing::info!(
                        username = %profile.github_username,
                        "No repositories synced, skipping commit sync"
                    );
                    self.emit(SyncProgress::CommitsSkipped);
                } else {
                    let (outcome, per_repository) = self.sync_commits(&profile, &client).await?;
                    report.commits = Some(outcome);
                    report.commits_by_repository = per_repository;
                }
            }
        }

        if !report.any_failed() {
            if let Err(e) = profile::mark_synced(&self.db, profile.id, Utc::now().fixed_offset()).await {
                tracing::warn!(profile_id = %profile.id, error = %e, "Failed to stamp last_sync");
            }
        }

        Ok(report)
    }

    /// Sync the authenticated user's repositories into `profile`.
    pub async fn sync_repositories(
        &self,
        profile: &ProfileModel,
        client: &GitHubClient,
    ) -> Result<SyncOutcome, SyncError> {
        let log = sync_log::start(&self.db, profile.id, SyncType::Repositories).await?;
        self.emit(SyncProgress::Started {
            username: profile.github_username.clone(),
            sync_type: SyncType::Repositories,
        });

        let tally = SyncTally::new();
        let body = tokio::spawn(sync_repositories_body(
            Arc::clone(&self.db),
            client.clone(),
            profile.id,
            tally.clone(),
            self.on_progress.clone(),
        ));

        let (outcome, ()) = self.finish(&log, &tally, body).await?;
        Ok(outcome)
    }

    /// Sync commits of every stored repository of `profile`, filtered to the
    /// profile's own GitHub login.
    ///
    /// Also returns the number of commits stored per repository full name.
    pub async fn sync_commits(
        &self,
        profile: &ProfileModel,
        client: &GitHubClient,
    ) -> Result<(SyncOutcome, BTreeMap<String, usize>), SyncError> {
        let log = sync_log::start(&self.db, profile.id, SyncType::Commits).await?;
        self.emit(SyncProgress::Started {
            username: profile.github_username.clone(),
            sync_type: SyncType::Commits,
        });

        let tally = SyncTally::new();
        let body = tokio::spawn(sync_commits_body(
            Arc::clone(&self.db),
            client.clone(),
            profile.id,
            profile.github_username.clone(),
            tally.clone(),
            self.on_progress.clone(),
        ));

        self.finish(&log, &tally, body).await
    }

    /// Wait for a sync body, turn its failure into a critical entry, and
    /// finalize the log from the tally.
    async fn finish<T: Default>(
        &self,
        log: &crate::entity::sync_log::Model,
        tally: &SyncTally,
        body: JoinHandle<Result<T, SyncError>>,
    ) -> Result<(SyncOutcome, T), SyncError> {
        let value = match body.await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::error!(log_id = %log.id, error = %e, "Sync body failed");
                self.record_critical(tally, e.to_string());
                T::default()
            }
            Err(join_error) => {
                let message = join_error_message(join_error);
                tracing::error!(log_id = %log.id, error = %message, "Sync task failed");
                self.record_critical(tally, message);
                T::default()
            }
        };

        let outcome = sync_log::finalize(&self.db, log, tally.synced(), &tally.errors()).await?;
        self.emit(SyncProgress::Finished {
            sync_type: outcome.sync_type,
            status: outcome.status,
            synced: outcome.synced,
            error_count: outcome.error_count,
            duration_ms: outcome.duration_ms,
        });
        Ok((outcome, value))
    }

    fn record_critical(&self, tally: &SyncTally, message: String) {
        self.emit(SyncProgress::ErrorRecorded {
            message: message.clone(),
        });
        tally.record(ErrorEntry::critical(message));
    }

    /// Refresh the account data of `user_id`'s profile from `GET /user`.
    pub async fn refresh_profile(&self, user_id: Uuid) -> Result<ProfileModel, SyncError> {
        let (profile, token) = self.load(user_id, None).await?;
        let user = self.client(&token).get_authenticated_user().await?;
        if user.id != profile.github_id {
            tracing::warn!(
                %user_id,
                stored = profile.github_id,
                returned = user.id,
                "Token belongs to a different GitHub account, not refreshing"
            );
            return Err(SyncError::Profile(ProfileError::AccountLinkedElsewhere {
                github_login: user.login,
            }));
        }
        let refreshed = profile::apply_github_user(&self.db, profile, &user).await?;
        tracing::info!(%user_id, login = %refreshed.github_username, "Refreshed GitHub profile");
        Ok(refreshed)
    }
}

/// Human-readable reason a spawned body did not return.
fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let reason = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        format!("sync task panicked: {reason}")
    } else if err.is_cancelled() {
        "Task was cancelled".to_string()
    } else {
        format!("Task failed: {err}")
    }
}

fn record_errors(tally: &SyncTally, errors: ErrorLog, on_progress: Option<&ProgressCallback>) {
    for entry in errors.entries() {
        emit(
            on_progress,
            SyncProgress::ErrorRecorded {
                message: entry.to_string(),
            },
        );
    }
    tally.record_all(errors);
}

fn fetch_errors(entries: Vec<ErrorEntry>) -> ErrorLog {
    let mut log = ErrorLog::new();
    log.extend(entries);
    log
}

async fn sync_repositories_body(
    db: Arc<DatabaseConnection>,
    client: GitHubClient,
    profile_id: Uuid,
    tally: SyncTally,
    on_progress: Option<ProgressCallback>,
) -> Result<(), SyncError> {
    let on_progress = on_progress.as_ref();
    let fetched = client
        .fetch_all_with_progress(&client.user_repos_url(), on_progress)
        .await;
    record_errors(&tally, fetch_errors(fetched.errors), on_progress);

    if fetched.items.is_empty() {
        return Ok(());
    }

    let outcome = reconcile(&db, &fetched.items, &RepositoryReconciler::new(profile_id)).await?;
    tally.add_synced(outcome.synced);
    record_errors(&tally, outcome.errors, on_progress);
    Ok(())
}

async fn sync_commits_body(
    db: Arc<DatabaseConnection>,
    client: GitHubClient,
    profile_id: Uuid,
    username: String,
    tally: SyncTally,
    on_progress: Option<ProgressCallback>,
) -> Result<BTreeMap<String, usize>, SyncError> {
    let on_progress = on_progress.as_ref();
    let repositories = profile::repositories_for_profile(&db, profile_id).await?;
    let mut per_repository = BTreeMap::new();

    for repository in repositories {
        emit(
            on_progress,
            SyncProgress::SyncingRepository {
                full_name: repository.full_name.clone(),
            },
        );

        let url = client.commits_url(&repository.full_name, &username);
        let fetched = client.fetch_all_with_progress(&url, on_progress).await;
        record_errors(&tally, fetch_errors(fetched.errors), on_progress);

        let mut stored = 0;
        if !fetched.items.is_empty() {
            let reconciler = CommitReconciler::new(profile_id, repository.id);
            let outcome = reconcile(&db, &fetched.items, &reconciler).await?;
            stored = outcome.synced;
            tally.add_synced(outcome.synced);
            record_errors(&tally, outcome.errors, on_progress);
        }

        tracing::debug!(repository = %repository.full_name, stored, "Synced commits");
        per_repository.insert(repository.full_name, stored);
    }

    Ok(per_repository)
}
