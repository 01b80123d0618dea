//! GitHub API data types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::sync::ErrorEntry;

/// Result of walking every page of a list endpoint.
///
/// Items fetched before a failing page are kept; the failure is reported in
/// `errors` instead of aborting the walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub items: Vec<serde_json::Value>,
    pub errors: Vec<ErrorEntry>,
}

impl FetchOutcome {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The authenticated user as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub public_repos: i32,
    #[serde(default)]
    pub followers: i32,
    #[serde(default)]
    pub following: i32,
    /// Account creation time, kept raw and parsed leniently.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GitHubUser {
    /// When the account was created, if GitHub sent a parsable timestamp.
    pub fn joined_at(&self) -> Option<DateTime<FixedOffset>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse a GitHub ISO 8601 timestamp (`2011-01-26T19:01:12Z`).
///
/// Returns `None` for anything unparsable.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}
