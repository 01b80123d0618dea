use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{NullOrdering, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::github_profile::{Column, Entity as GithubProfile, Model};
use crate::entity::repository::{
    Column as RepositoryColumn, Entity as Repository, Model as RepositoryModel,
};
use crate::entity::sync_frequency::SyncFrequency;
use crate::sync_log;

use super::errors::{ProfileError, Result};

// ─── Scheduling ──────────────────────────────────────────────────────────────

/// Profiles the automatic scheduler should sync at `now`: never synced
/// first, then least recently synced.
///
/// The frequency window runs from the later of `last_sync` and the latest
/// sync attempt, so failing profiles are not retried on every pass.
pub async fn find_due_for_auto_sync(
    db: &DatabaseConnection,
    now: DateTime<FixedOffset>,
) -> Result<Vec<Model>> {
    let candidates = GithubProfile::find()
        .filter(Column::AutoSync.eq(true))
        .filter(Column::SyncFrequency.ne(SyncFrequency::Manual))
        .filter(Column::AccessToken.is_not_null())
        .order_by_with_nulls(Column::LastSync, Order::Asc, NullOrdering::First)
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;

    let mut due = Vec::new();
    for profile in candidates {
        if !profile.is_due_for_sync(now) {
            continue;
        }
        let last_attempt = sync_log::latest_attempt_at(db, profile.id).await?;
        if profile.is_due_after_attempt(now, last_attempt) {
            due.push(profile);
        } else {
            tracing::debug!(username = %profile.github_username, "Recent sync attempt, deferring");
        }
    }
    Ok(due)
}

/// Every stored repository of a profile, by full name.
pub async fn repositories_for_profile(
    db: &DatabaseConnection,
    profile_id: Uuid,
) -> Result<Vec<RepositoryModel>> {
    Repository::find()
        .filter(RepositoryColumn::ProfileId.eq(profile_id))
        .order_by_asc(RepositoryColumn::FullName)
        .all(db)
        .await
        .map_err(ProfileError::from)
}

// ─── Preferences ─────────────────────────────────────────────────────────────

/// Partial update of a profile's sync and portfolio preferences.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub auto_sync: Option<bool>,
    pub sync_frequency: Option<SyncFrequency>,
    pub show_forked_repos: Option<bool>,
    pub excluded_repos: Option<Vec<String>>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub async fn update_preferences(
    db: &DatabaseConnection,
    profile: Model,
    update: PreferencesUpdate,
) -> Result<Model> {
    if update.is_empty() {
        return Ok(profile);
    }
    let mut model = profile.into_active_model();
    if let Some(auto_sync) = update.auto_sync {
        model.auto_sync = Set(auto_sync);
    }
    if let Some(frequency) = update.sync_frequency {
        model.sync_frequency = Set(frequency);
    }
    if let Some(show) = update.show_forked_repos {
        model.show_forked_repos = Set(show);
    }
    if let Some(excluded) = update.excluded_repos {
        model.excluded_repos = Set(serde_json::json!(excluded));
    }
    model.updated_at = Set(Utc::now().fixed_offset());
    model.update(db).await.map_err(ProfileError::from)
}

/// Names in the profile's `excluded_repos` list; non-string entries are ignored.
pub fn excluded_repo_names(profile: &Model) -> Vec<String> {
    profile
        .excluded_repos
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Repositories shown on the portfolio: not hidden, not excluded, and forks
/// only when the profile opts in.
pub async fn portfolio_repositories(
    db: &DatabaseConnection,
    profile: &Model,
) -> Result<Vec<RepositoryModel>> {
    let excluded = excluded_repo_names(profile);
    let repositories = repositories_for_profile(db, profile.id).await?;
    Ok(repositories
        .into_iter()
        .filter(|r| !r.is_hidden)
        .filter(|r| profile.show_forked_repos || !r.is_fork)
        .filter(|r| !excluded.iter().any(|name| *name == r.name || *name == r.full_name))
        .collect())
}
