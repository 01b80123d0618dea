//! Terminal and in-flight states of a sync invocation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status recorded on a sync log.
///
/// A log starts as `Pending` and moves to exactly one of the other variants
/// when the invocation finishes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    /// Some items were stored and some failed.
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl SyncStatus {
    /// Resolve the terminal status from the number of stored items and the
    /// total number of errors seen during the invocation.
    ///
    /// Zero items with zero errors is a success: there was nothing to sync.
    #[must_use]
    pub fn classify(synced: usize, error_count: usize) -> Self {
        match (synced, error_count) {
            (_, 0) => SyncStatus::Success,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        }
    }

    /// Whether this status is one of the terminal states.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SyncStatus::Pending)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Partial => write!(f, "partial"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}
