//! SyncLog entity - append-only audit record of one sync invocation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::sync_status::SyncStatus;
use crate::entity::sync_type::SyncType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub profile_id: Uuid,

    pub sync_type: SyncType,
    pub status: SyncStatus,

    // ─── Results ─────────────────────────────────────────────────────────────
    pub repos_synced: i32,
    pub commits_synced: i32,
    /// Total errors seen, including those dropped from `errors`.
    pub error_count: i32,
    /// Bounded list of structured error entries (JSON array).
    #[sea_orm(column_type = "Json")]
    pub errors: serde_json::Value,

    // ─── Timing ──────────────────────────────────────────────────────────────
    pub started_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub duration_ms: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::github_profile::Entity",
        from = "Column::ProfileId",
        to = "super::github_profile::Column::Id",
        on_delete = "Cascade"
    )]
    GithubProfile,
}

impl Related<super::github_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GithubProfile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the invocation reached its terminal state.
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal() && self.completed_at.is_some()
    }
}
