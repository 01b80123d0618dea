//! Resource kind recorded on a sync log.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The resource a single sync invocation targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    #[sea_orm(string_value = "repositories")]
    Repositories,
    #[sea_orm(string_value = "commits")]
    Commits,
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncType::Repositories => write!(f, "repositories"),
            SyncType::Commits => write!(f, "commits"),
        }
    }
}
