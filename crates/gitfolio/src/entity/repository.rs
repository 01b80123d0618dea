//! Repository entity - one GitHub repository shown on a portfolio.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository model.
///
/// Sync writes only the GitHub-sourced columns. The display overrides
/// (`is_featured`, `is_hidden`, `custom_description`, `demo_url`) belong to the
/// user and are left untouched by every sync.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub profile_id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// GitHub repository id. Together with `profile_id` this is the natural key.
    pub github_id: i64,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    // ─── URLs ────────────────────────────────────────────────────────────────
    pub html_url: Option<String>,
    pub clone_url: Option<String>,
    pub git_url: Option<String>,

    // ─── Counters ────────────────────────────────────────────────────────────
    pub stars_count: i32,
    pub forks_count: i32,
    pub watchers_count: i32,
    pub open_issues_count: i32,
    pub language: Option<String>,

    // ─── Flags ───────────────────────────────────────────────────────────────
    pub is_private: bool,
    pub is_fork: bool,
    pub is_archived: bool,

    // ─── GitHub Timestamps ───────────────────────────────────────────────────
    pub created_at_github: Option<DateTimeWithTimeZone>,
    pub updated_at_github: Option<DateTimeWithTimeZone>,
    pub pushed_at_github: Option<DateTimeWithTimeZone>,

    // ─── Portfolio Display Overrides ─────────────────────────────────────────
    pub is_featured: bool,
    pub is_hidden: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_description: Option<String>,
    pub demo_url: Option<String>,

    /// When sync last wrote this row.
    pub last_synced: DateTimeWithTimeZone,
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
    #[sea_orm(has_many = "super::commit::Entity")]
    Commits,
}

impl Related<super::github_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GithubProfile.def()
    }
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Description to show on the portfolio: the user's override wins.
    pub fn display_description(&self) -> Option<&str> {
        self.custom_description
            .as_deref()
            .or(self.description.as_deref())
    }
}
