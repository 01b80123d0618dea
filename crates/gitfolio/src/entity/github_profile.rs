//! GithubProfile entity - the link between a local user and a GitHub account.
//!
//! A profile is the aggregation root for synced data: repositories, commits
//! and sync logs are all deleted together with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::sync_frequency::SyncFrequency;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "github_profiles")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Account Linkage ─────────────────────────────────────────────────────
    /// Local user this profile belongs to (one profile per user).
    #[sea_orm(unique)]
    pub user_id: Uuid,
    /// Stable numeric GitHub account id.
    #[sea_orm(unique)]
    pub github_id: i64,
    /// GitHub login.
    #[sea_orm(unique)]
    pub github_username: String,
    /// OAuth access token. Never serialized.
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,

    // ─── GitHub Stats ────────────────────────────────────────────────────────
    pub public_repos: i32,
    pub followers: i32,
    pub following: i32,
    pub joined_at: Option<DateTimeWithTimeZone>,

    // ─── Profile Data ────────────────────────────────────────────────────────
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,

    // ─── Sync Settings ───────────────────────────────────────────────────────
    pub auto_sync: bool,
    pub sync_frequency: SyncFrequency,
    pub last_sync: Option<DateTimeWithTimeZone>,

    // ─── Portfolio Preferences ───────────────────────────────────────────────
    pub show_forked_repos: bool,
    /// Repository names the user hid from the portfolio (JSON array).
    #[sea_orm(column_type = "Json")]
    pub excluded_repos: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repository::Entity")]
    Repositories,
    #[sea_orm(has_many = "super::commit::Entity")]
    Commits,
    #[sea_orm(has_many = "super::sync_log::Entity")]
    SyncLogs,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repositories.def()
    }
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commits.def()
    }
}

impl Related<super::sync_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether a usable credential is stored for this profile.
    pub fn has_credential(&self) -> bool {
        self.access_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Whether the automatic scheduler should sync this profile at `now`.
    pub fn is_due_for_sync(&self, now: DateTimeWithTimeZone) -> bool {
        self.is_due_after_attempt(now, None)
    }

    /// Like [`Model::is_due_for_sync`], but the frequency window also runs
    /// from `last_attempt`, the start of the latest sync whatever its result.
    ///
    /// A profile whose syncs keep failing is retried once per window instead
    /// of on every scheduler pass.
    pub fn is_due_after_attempt(
        &self,
        now: DateTimeWithTimeZone,
        last_attempt: Option<DateTimeWithTimeZone>,
    ) -> bool {
        if !self.auto_sync || !self.has_credential() {
            return false;
        }
        let Some(interval) = self.sync_frequency.interval() else {
            return false;
        };
        match self.last_sync.max(last_attempt) {
            Some(last) => last + interval <= now,
            None => true,
        }
    }
}
