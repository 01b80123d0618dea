//! Allow-list mapping from GitHub payloads to storage rows.
//!
//! Only the fields named here are read; everything else in a payload is
//! ignored.

use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::commit::ActiveModel as CommitActiveModel;
use crate::entity::repository::ActiveModel as RepositoryActiveModel;
use crate::github::parse_timestamp;

/// Label used for a payload in error entries when it has no usable name.
pub const UNKNOWN_ITEM: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

fn required_i64(item: &Value, field: &'static str) -> Result<i64, MappingError> {
    match item.get(field) {
        None | Some(Value::Null) => Err(MappingError::Missing(field)),
        Some(value) => value.as_i64().ok_or(MappingError::WrongType {
            field,
            expected: "integer",
        }),
    }
}

fn required_str(item: &Value, field: &'static str) -> Result<String, MappingError> {
    match item.get(field) {
        None | Some(Value::Null) => Err(MappingError::Missing(field)),
        Some(Value::String(s)) if s.is_empty() => Err(MappingError::Missing(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MappingError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn optional_str(item: &Value, field: &str) -> Option<String> {
    item.get(field).and_then(Value::as_str).map(String::from)
}

fn count(item: &Value, field: &str) -> i32 {
    item.get(field)
        .and_then(Value::as_i64)
        .map(|n| n.clamp(0, i64::from(i32::MAX)) as i32)
        .unwrap_or(0)
}

fn flag(item: &Value, field: &str) -> bool {
    item.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<FixedOffset>> {
    value.and_then(Value::as_str).and_then(parse_timestamp)
}

/// GitHub-sourced columns of a repository row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFields {
    pub github_id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub clone_url: Option<String>,
    pub git_url: Option<String>,
    pub stars_count: i32,
    pub forks_count: i32,
    pub watchers_count: i32,
    pub open_issues_count: i32,
    pub language: Option<String>,
    pub is_private: bool,
    pub is_fork: bool,
    pub is_archived: bool,
    pub created_at_github: Option<DateTime<FixedOffset>>,
    pub updated_at_github: Option<DateTime<FixedOffset>>,
    pub pushed_at_github: Option<DateTime<FixedOffset>>,
}

impl RepositoryFields {
    /// Map one element of `GET /user/repos`.
    pub fn from_payload(item: &Value) -> Result<Self, MappingError> {
        Ok(Self {
            github_id: required_i64(item, "id")?,
            name: required_str(item, "name")?,
            full_name: required_str(item, "full_name")?,
            description: optional_str(item, "description"),
            html_url: optional_str(item, "html_url"),
            clone_url: optional_str(item, "clone_url"),
            git_url: optional_str(item, "git_url"),
            stars_count: count(item, "stargazers_count"),
            forks_count: count(item, "forks_count"),
            watchers_count: count(item, "watchers_count"),
            open_issues_count: count(item, "open_issues_count"),
            language: optional_str(item, "language"),
            is_private: flag(item, "private"),
            is_fork: flag(item, "fork"),
            is_archived: flag(item, "archived"),
            created_at_github: timestamp(item.get("created_at")),
            updated_at_github: timestamp(item.get("updated_at")),
            pushed_at_github: timestamp(item.get("pushed_at")),
        })
    }

    /// Label for error entries: the full name when present.
    pub fn label(item: &Value) -> String {
        optional_str(item, "full_name").unwrap_or_else(|| UNKNOWN_ITEM.to_string())
    }

    /// Insert model for this repository.
    ///
    /// Display overrides get their defaults here; the upsert never updates
    /// them on conflict.
    pub fn into_active_model(
        self,
        profile_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> RepositoryActiveModel {
        RepositoryActiveModel {
            id: Set(Uuid::new_v4()),
            profile_id: Set(profile_id),
            github_id: Set(self.github_id),
            name: Set(self.name),
            full_name: Set(self.full_name),
            description: Set(self.description),
            html_url: Set(self.html_url),
            clone_url: Set(self.clone_url),
            git_url: Set(self.git_url),
            stars_count: Set(self.stars_count),
            forks_count: Set(self.forks_count),
            watchers_count: Set(self.watchers_count),
            open_issues_count: Set(self.open_issues_count),
            language: Set(self.language),
            is_private: Set(self.is_private),
            is_fork: Set(self.is_fork),
            is_archived: Set(self.is_archived),
            created_at_github: Set(self.created_at_github),
            updated_at_github: Set(self.updated_at_github),
            pushed_at_github: Set(self.pushed_at_github),
            is_featured: Set(false),
            is_hidden: Set(false),
            custom_description: Set(None),
            demo_url: Set(None),
            last_synced: Set(now),
        }
    }
}

/// GitHub-sourced columns of a commit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFields {
    pub sha: String,
    pub message: String,
    pub committed_at: Option<DateTime<FixedOffset>>,
    pub html_url: Option<String>,
    pub additions: i32,
    pub deletions: i32,
    pub total_changes: i32,
}

impl CommitFields {
    /// Map one element of `GET /repos/{full_name}/commits`.
    ///
    /// The commit date is the author date, falling back to the committer
    /// date.
    pub fn from_payload(item: &Value) -> Result<Self, MappingError> {
        let sha = required_str(item, "sha")?;
        let detail = item.get("commit");
        let message = detail
            .and_then(|c| c.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let committed_at = detail.and_then(|c| {
            timestamp(c.pointer("/author/date")).or_else(|| timestamp(c.pointer("/committer/date")))
        });
        let stats = item.get("stats");
        let stat = |field| stats.map_or(0, |s| count(s, field));

        Ok(Self {
            sha,
            message,
            committed_at,
            html_url: optional_str(item, "html_url"),
            additions: stat("additions"),
            deletions: stat("deletions"),
            total_changes: stat("total"),
        })
    }

    /// Label for error entries: the SHA when present.
    pub fn label(item: &Value) -> String {
        optional_str(item, "sha").unwrap_or_else(|| UNKNOWN_ITEM.to_string())
    }

    pub fn into_active_model(
        self,
        repository_id: Uuid,
        profile_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> CommitActiveModel {
        CommitActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(repository_id),
            profile_id: Set(profile_id),
            sha: Set(self.sha),
            message: Set(self.message),
            committed_at: Set(self.committed_at),
            html_url: Set(self.html_url),
            additions: Set(self.additions),
            deletions: Set(self.deletions),
            total_changes: Set(self.total_changes),
            created_at: Set(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_payload() -> Value {
        json!({
            "id": 1296269,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "description": "This your first repo!",
            "html_url": "https://github.com/octocat/Hello-World",
            "clone_url": "https://github.com/octocat/Hello-World.git",
            "git_url": "git:github.com/octocat/Hello-World.git",
            "stargazers_count": 80,
            "forks_count": 9,
            "watchers_count": 80,
            "open_issues_count": 0,
            "language": "Rust",
            "private": false,
            "fork": true,
            "archived": false,
            "created_at": "2011-01-26T19:01:12Z",
            "updated_at": "not a date",
            "owner": {"login": "octocat"},
            "topics": ["octocat"]
        })
    }

    #[test]
    fn maps_repository_payload() {
        let fields = RepositoryFields::from_payload(&repo_payload()).expect("valid payload");
        assert_eq!(fields.github_id, 1296269);
        assert_eq!(fields.full_name, "octocat/Hello-World");
        assert_eq!(fields.stars_count, 80);
        assert!(fields.is_fork);
        assert!(fields.created_at_github.is_some());
        // Unparsable and absent timestamps are not errors.
        assert_eq!(fields.updated_at_github, None);
        assert_eq!(fields.pushed_at_github, None);
    }

    #[test]
    fn repository_without_id_is_a_mapping_error() {
        let mut payload = repo_payload();
        payload.as_object_mut().unwrap().remove("id");
        assert_eq!(
            RepositoryFields::from_payload(&payload),
            Err(MappingError::Missing("id"))
        );
        assert_eq!(RepositoryFields::label(&payload), "octocat/Hello-World");
    }

    #[test]
    fn repository_with_non_numeric_id_is_a_mapping_error() {
        let mut payload = repo_payload();
        payload["id"] = json!("1296269");
        assert!(matches!(
            RepositoryFields::from_payload(&payload),
            Err(MappingError::WrongType { field: "id", .. })
        ));
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let fields = RepositoryFields::from_payload(&json!({
            "id": 1, "name": "a", "full_name": "o/a"
        }))
        .expect("minimal payload");
        assert_eq!(fields.forks_count, 0);
        assert!(!fields.is_private);
        assert_eq!(fields.description, None);
    }

    #[test]
    fn label_falls_back_to_unknown() {
        assert_eq!(RepositoryFields::label(&json!({"id": 1})), UNKNOWN_ITEM);
        assert_eq!(CommitFields::label(&json!({})), UNKNOWN_ITEM);
    }

    #[test]
    fn maps_commit_payload() {
        let fields = CommitFields::from_payload(&json!({
            "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "html_url": "https://github.com/octocat/Hello-World/commit/6dcb09b",
            "commit": {
                "message": "Fix all the bugs",
                "author": {"name": "Monalisa Octocat", "date": "2011-04-14T16:00:49Z"},
                "committer": {"date": "2011-04-15T16:00:49Z"}
            },
            "stats": {"additions": 104, "deletions": 4, "total": 108}
        }))
        .expect("valid commit");

        assert_eq!(fields.message, "Fix all the bugs");
        assert_eq!(
            fields.committed_at.map(|t| t.to_rfc3339()),
            Some("2011-04-14T16:00:49+00:00".to_string())
        );
        assert_eq!(fields.total_changes, 108);
    }

    #[test]
    fn commit_falls_back_to_committer_date_and_requires_sha() {
        let fields = CommitFields::from_payload(&json!({
            "sha": "abc",
            "commit": {"committer": {"date": "2024-01-02T03:04:05Z"}}
        }))
        .expect("valid commit");
        assert!(fields.committed_at.is_some());
        assert_eq!(fields.message, "");
        assert_eq!(fields.additions, 0);

        assert_eq!(
            CommitFields::from_payload(&json!({"commit": {}})),
            Err(MappingError::Missing("sha"))
        );
    }
}
