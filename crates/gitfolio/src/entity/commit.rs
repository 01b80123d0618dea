//! Commit entity - a commit authored by the profile owner.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repository_id: Uuid,
    pub profile_id: Uuid,

    /// Content-addressed commit id, unique across all repositories.
    #[sea_orm(unique)]
    pub sha: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub committed_at: Option<DateTimeWithTimeZone>,
    pub html_url: Option<String>,

    // Stats for the contribution graph. The list endpoint omits them, so they
    // stay at zero unless a payload carries a `stats` object.
    pub additions: i32,
    pub deletions: i32,
    pub total_changes: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "Cascade"
    )]
    Repository,
    #[sea_orm(
        belongs_to = "super::github_profile::Entity",
        from = "Column::ProfileId",
        to = "super::github_profile::Column::Id",
        on_delete = "Cascade"
    )]
    GithubProfile,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::github_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GithubProfile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Abbreviated SHA as shown in the GitHub UI.
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}
