//! How often a profile wants to be synced automatically.

use chrono::Duration;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    #[sea_orm(string_value = "hourly")]
    Hourly,
    #[sea_orm(string_value = "daily")]
    #[default]
    Daily,
    #[sea_orm(string_value = "weekly")]
    Weekly,
    /// Only synced when the user asks for it.
    #[sea_orm(string_value = "manual")]
    Manual,
}

impl SyncFrequency {
    /// Minimum time between two automatic syncs, or `None` for manual profiles.
    #[must_use]
    pub fn interval(self) -> Option<Duration> {
        match self {
            SyncFrequency::Hourly => Some(Duration::hours(1)),
            SyncFrequency::Daily => Some(Duration::days(1)),
            SyncFrequency::Weekly => Some(Duration::weeks(1)),
            SyncFrequency::Manual => None,
        }
    }
}

impl std::fmt::Display for SyncFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncFrequency::Hourly => write!(f, "hourly"),
            SyncFrequency::Daily => write!(f, "daily"),
            SyncFrequency::Weekly => write!(f, "weekly"),
            SyncFrequency::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for SyncFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(SyncFrequency::Hourly),
            "daily" => Ok(SyncFrequency::Daily),
            "weekly" => Ok(SyncFrequency::Weekly),
            "manual" => Ok(SyncFrequency::Manual),
            _ => Err(format!("Unknown sync frequency: {}", s)),
        }
    }
}
