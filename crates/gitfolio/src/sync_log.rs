//! Sync log lifecycle and queries.
//!
//! Every invocation writes exactly one row: created `pending` by [`start`]
//! and moved to a terminal status once by [`finalize`].

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::sync_log::{ActiveModel, Column, Entity as SyncLog, Model};
use crate::entity::sync_status::SyncStatus;
use crate::entity::sync_type::SyncType;
use crate::retry::with_db_retry;
use crate::sync::{ErrorLog, SyncOutcome};

/// Create the `pending` log for a new invocation.
pub async fn start(
    db: &DatabaseConnection,
    profile_id: Uuid,
    sync_type: SyncType,
) -> Result<Model, DbErr> {
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        profile_id: Set(profile_id),
        sync_type: Set(sync_type),
        status: Set(SyncStatus::Pending),
        repos_synced: Set(0),
        commits_synced: Set(0),
        error_count: Set(0),
        errors: Set(serde_json::json!([])),
        started_at: Set(Utc::now().fixed_offset()),
        completed_at: Set(None),
        duration_ms: Set(None),
    };
    let log = model.insert(db).await?;
    tracing::debug!(log_id = %log.id, %sync_type, "Sync log started");
    Ok(log)
}

fn clamp_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Move a pending log to its terminal state.
///
/// The status is derived from `synced` and the error total; a critical error
/// always means `failed`. The write is retried on transient database errors.
pub async fn finalize(
    db: &DatabaseConnection,
    log: &Model,
    synced: usize,
    errors: &ErrorLog,
) -> Result<SyncOutcome, DbErr> {
    finalize_at(db, log, synced, errors, Utc::now().fixed_offset()).await
}

pub(crate) async fn finalize_at(
    db: &DatabaseConnection,
    log: &Model,
    synced: usize,
    errors: &ErrorLog,
    completed_at: DateTime<FixedOffset>,
) -> Result<SyncOutcome, DbErr> {
    let status = if errors.has_critical() {
        SyncStatus::Failed
    } else {
        SyncStatus::classify(synced, errors.total())
    };
    let duration_ms = (completed_at - log.started_at).num_milliseconds().max(0);
    let (repos_synced, commits_synced) = match log.sync_type {
        SyncType::Repositories => (clamp_i32(synced), 0),
        SyncType::Commits => (0, clamp_i32(synced)),
    };

    let update = ActiveModel {
        id: Set(log.id),
        status: Set(status),
        repos_synced: Set(repos_synced),
        commits_synced: Set(commits_synced),
        error_count: Set(clamp_i32(errors.total())),
        errors: Set(errors.to_json()),
        completed_at: Set(Some(completed_at)),
        duration_ms: Set(Some(duration_ms)),
        ..Default::default()
    };

    with_db_retry(|| update.clone().update(db), "sync log finalization").await?;

    tracing::info!(
        log_id = %log.id,
        sync_type = %log.sync_type,
        %status,
        synced,
        errors = errors.total(),
        duration_ms,
        "Sync finished"
    );

    Ok(SyncOutcome {
        log_id: log.id,
        sync_type: log.sync_type,
        status,
        synced,
        error_count: errors.total(),
        duration_ms,
    })
}

/// Most recent logs of a profile, newest first.
pub async fn recent_for_profile(
    db: &DatabaseConnection,
    profile_id: Uuid,
    limit: u64,
) -> Result<Vec<Model>, DbErr> {
    SyncLog::find()
        .filter(Column::ProfileId.eq(profile_id))
        .order_by_desc(Column::StartedAt)
        .limit(limit)
        .all(db)
        .await
}

/// Latest log of a given type for a profile.
pub async fn latest_for_profile(
    db: &DatabaseConnection,
    profile_id: Uuid,
    sync_type: SyncType,
) -> Result<Option<Model>, DbErr> {
    SyncLog::find()
        .filter(Column::ProfileId.eq(profile_id))
        .filter(Column::SyncType.eq(sync_type))
        .order_by_desc(Column::StartedAt)
        .one(db)
        .await
}

/// Start time of the most recent log of any type for a profile.
pub async fn latest_attempt_at(
    db: &DatabaseConnection,
    profile_id: Uuid,
) -> Result<Option<DateTime<FixedOffset>>, DbErr> {
    let latest = SyncLog::find()
        .filter(Column::ProfileId.eq(profile_id))
        .order_by_desc(Column::StartedAt)
        .one(db)
        .await?;
    Ok(latest.map(|log| log.started_at))
}

/// Logs still `pending`, oldest first. A row that stays here means the
/// process died before finalizing.
pub async fn find_pending(db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
    SyncLog::find()
        .filter(Column::Status.eq(SyncStatus::Pending))
        .order_by_asc(Column::StartedAt)
        .all(db)
        .await
}
