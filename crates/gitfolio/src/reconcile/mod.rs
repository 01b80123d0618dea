//! Idempotent upsert of fetched GitHub records.
//!
//! A batch runs in one transaction and every item in its own savepoint: a
//! failing item is rolled back alone, recorded, and the batch continues.
//!
//! # Module Structure
//!
//! - [`fields`] - Allow-list payload mapping (`RepositoryFields`, `CommitFields`)

pub mod fields;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Alias, Expr, OnConflict};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, TransactionTrait};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::commit::{Column as CommitColumn, Entity as Commit};
use crate::entity::repository::{Column as RepositoryColumn, Entity as Repository};
use crate::sync::{ErrorEntry, ErrorLog};

pub use fields::{CommitFields, MappingError, RepositoryFields, UNKNOWN_ITEM};

/// Result of reconciling one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Items written (inserted or updated).
    pub synced: usize,
    /// Items left alone because another owner already holds their key.
    pub skipped: usize,
    pub errors: ErrorLog,
}

/// How one kind of payload is mapped and stored.
#[async_trait]
pub trait Reconcile: Send + Sync {
    type Fields: Send;

    /// Name of the item in error entries.
    fn label(&self, item: &Value) -> String;

    fn map(&self, item: &Value) -> Result<Self::Fields, MappingError>;

    /// Write one item, returning whether a row was inserted or updated.
    async fn upsert(&self, txn: &DatabaseTransaction, fields: Self::Fields) -> Result<bool, DbErr>;
}

/// Stores repositories of one profile, keyed by `(profile_id, github_id)`.
#[derive(Debug, Clone)]
pub struct RepositoryReconciler {
    pub profile_id: Uuid,
    pub synced_at: DateTime<FixedOffset>,
}

impl RepositoryReconciler {
    pub fn new(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            synced_at: Utc::now().fixed_offset(),
        }
    }
}

/// ON CONFLICT clause for repository upserts.
///
/// Only GitHub-sourced columns are updated; display overrides, the row id
/// and the natural key are left alone.
pub(crate) fn repository_on_conflict() -> OnConflict {
    OnConflict::columns([RepositoryColumn::ProfileId, RepositoryColumn::GithubId])
        .update_columns([
            RepositoryColumn::Name,
            RepositoryColumn::FullName,
            RepositoryColumn::Description,
            RepositoryColumn::HtmlUrl,
            RepositoryColumn::CloneUrl,
            RepositoryColumn::GitUrl,
            RepositoryColumn::StarsCount,
            RepositoryColumn::ForksCount,
            RepositoryColumn::WatchersCount,
            RepositoryColumn::OpenIssuesCount,
            RepositoryColumn::Language,
            RepositoryColumn::IsPrivate,
            RepositoryColumn::IsFork,
            RepositoryColumn::IsArchived,
            RepositoryColumn::CreatedAtGithub,
            RepositoryColumn::UpdatedAtGithub,
            RepositoryColumn::PushedAtGithub,
            RepositoryColumn::LastSynced,
        ])
        .to_owned()
}

#[async_trait]
impl Reconcile for RepositoryReconciler {
    type Fields = RepositoryFields;

    fn label(&self, item: &Value) -> String {
        RepositoryFields::label(item)
    }

    fn map(&self, item: &Value) -> Result<RepositoryFields, MappingError> {
        RepositoryFields::from_payload(item)
    }

    async fn upsert(&self, txn: &DatabaseTransaction, fields: RepositoryFields) -> Result<bool, DbErr> {
        let written = Repository::insert(fields.into_active_model(self.profile_id, self.synced_at))
            .on_conflict(repository_on_conflict())
            .exec_without_returning(txn)
            .await?;
        Ok(written > 0)
    }
}

/// Stores commits of one repository, keyed by SHA.
///
/// A SHA is globally unique, so a commit reachable from several repositories
/// (a fork and its parent, say) belongs to whichever repository stored it
/// first. Later repositories neither take it over nor count it as synced.
#[derive(Debug, Clone)]
pub struct CommitReconciler {
    pub profile_id: Uuid,
    pub repository_id: Uuid,
    pub synced_at: DateTime<FixedOffset>,
}

impl CommitReconciler {
    pub fn new(profile_id: Uuid, repository_id: Uuid) -> Self {
        Self {
            profile_id,
            repository_id,
            synced_at: Utc::now().fixed_offset(),
        }
    }
}

/// ON CONFLICT clause for commit upserts.
///
/// The update only applies when the stored row belongs to the same
/// repository; otherwise the statement affects no rows.
pub(crate) fn commit_on_conflict() -> OnConflict {
    OnConflict::column(CommitColumn::Sha)
        .update_columns([
            CommitColumn::Message,
            CommitColumn::CommittedAt,
            CommitColumn::HtmlUrl,
            CommitColumn::Additions,
            CommitColumn::Deletions,
            CommitColumn::TotalChanges,
        ])
        .action_and_where(
            Expr::col((Commit, CommitColumn::RepositoryId))
                .eq(Expr::col((Alias::new("excluded"), CommitColumn::RepositoryId))),
        )
        .to_owned()
}

#[async_trait]
impl Reconcile for CommitReconciler {
    type Fields = CommitFields;

    fn label(&self, item: &Value) -> String {
        CommitFields::label(item)
    }

    fn map(&self, item: &Value) -> Result<CommitFields, MappingError> {
        CommitFields::from_payload(item)
    }

    async fn upsert(&self, txn: &DatabaseTransaction, fields: CommitFields) -> Result<bool, DbErr> {
        let written = Commit::insert(fields.into_active_model(
            self.repository_id,
            self.profile_id,
            self.synced_at,
        ))
        .on_conflict(commit_on_conflict())
        .exec_without_returning(txn)
        .await?;
        Ok(written > 0)
    }
}

/// Map and upsert every item of a fetched batch.
///
/// Mapping failures and per-item write failures become item error entries.
/// Only a failure of the transaction itself (begin, savepoint, commit) is
/// returned as `Err`, in which case nothing from the batch is kept.
pub async fn reconcile<R: Reconcile>(
    db: &DatabaseConnection,
    items: &[Value],
    reconciler: &R,
) -> Result<ReconcileOutcome, DbErr> {
    let mut outcome = ReconcileOutcome::default();
    if items.is_empty() {
        return Ok(outcome);
    }

    let txn = db.begin().await?;

    for item in items {
        let fields = match reconciler.map(item) {
            Ok(fields) => fields,
            Err(e) => {
                let label = reconciler.label(item);
                tracing::warn!(item = %label, error = %e, "Skipping unmappable item");
                outcome.errors.push(ErrorEntry::item(label, e));
                continue;
            }
        };

        let savepoint = txn.begin().await?;
        match reconciler.upsert(&savepoint, fields).await {
            Ok(true) => {
                savepoint.commit().await?;
                outcome.synced += 1;
            }
            Ok(false) => {
                savepoint.commit().await?;
                tracing::debug!(item = %reconciler.label(item), "Already stored under another owner");
                outcome.skipped += 1;
            }
            Err(e) => {
                savepoint.rollback().await?;
                let label = reconciler.label(item);
                tracing::warn!(item = %label, error = %e, "Failed to store item");
                outcome.errors.push(ErrorEntry::item(label, e));
            }
        }
    }

    txn.commit().await?;

    tracing::debug!(
        synced = outcome.synced,
        skipped = outcome.skipped,
        errors = outcome.errors.total(),
        "Reconciled batch"
    );
    Ok(outcome)
}
