//! Worker pool dispatch against a real engine and database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

mod common;

use std::sync::Arc;

use common::*;
use gitfolio::dispatch::{DispatchError, InlineExecutor, WorkerPool, enqueue_sync};
use gitfolio::{SyncKind, SyncLog, SyncStatus, profile};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn dropped_handle_still_runs_to_finalization() {
    let fx = fixture().await;
    let transport = ScriptedTransport::new();
    transport.respond_json(REPOS_URL, json!([repo(1, "alpha")]));
    let pool = WorkerPool::new(Arc::new(engine(&fx, Arc::new(transport))), 2);

    let handle = enqueue_sync(&pool, fx.db.as_ref(), fx.user_id, None, SyncKind::Repositories)
        .await
        .expect("queued");
    drop(handle);
    tokio::time::timeout(SYNC_TIMEOUT, pool.shutdown())
        .await
        .expect("pool drained");

    let logs = SyncLog::find().all(fx.db.as_ref()).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SyncStatus::Success);
    assert_eq!(logs[0].repos_synced, 1);
}

#[tokio::test]
async fn handle_returns_the_report() {
    let fx = fixture().await;
    let transport = ScriptedTransport::new();
    transport.respond_json(REPOS_URL, json!([repo(1, "alpha")]));
    transport.respond_json(
        commits_url("octocat/alpha"),
        json!([{"sha": "abc", "commit": {"message": "hi"}}]),
    );
    let pool = WorkerPool::new(Arc::new(engine(&fx, Arc::new(transport))), 1);

    let handle = enqueue_sync(
        &pool,
        fx.db.as_ref(),
        fx.user_id,
        Some("gho_explicit".to_string()),
        SyncKind::All,
    )
    .await
    .unwrap();
    let report = tokio::time::timeout(SYNC_TIMEOUT, handle.wait())
        .await
        .expect("job finished")
        .expect("job report");

    assert_eq!(report.repositories.unwrap().status, SyncStatus::Success);
    assert_eq!(report.commits.unwrap().synced, 1);
    pool.shutdown().await;
}

#[tokio::test]
async fn missing_credential_is_rejected_before_queueing() {
    let fx = fixture().await;
    let mut model: gitfolio::GithubProfileActiveModel = fx.profile.clone().into();
    model.access_token = Set(None);
    model.update(fx.db.as_ref()).await.unwrap();
    let executor = InlineExecutor::new(Arc::new(engine(&fx, Arc::new(ScriptedTransport::new()))));

    let err = enqueue_sync(&executor, fx.db.as_ref(), fx.user_id, None, SyncKind::All)
        .await
        .expect_err("no token");
    assert!(matches!(err, DispatchError::MissingCredential { .. }));

    let err = enqueue_sync(&executor, fx.db.as_ref(), Uuid::new_v4(), None, SyncKind::All)
        .await
        .expect_err("no profile");
    assert!(matches!(err, DispatchError::MissingCredential { .. }));
    assert_eq!(SyncLog::find().count(fx.db.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn explicit_token_for_unknown_user_surfaces_from_the_job() {
    let fx = fixture().await;
    let executor = InlineExecutor::new(Arc::new(engine(&fx, Arc::new(ScriptedTransport::new()))));

    let handle = enqueue_sync(
        &executor,
        fx.db.as_ref(),
        Uuid::new_v4(),
        Some("gho".to_string()),
        SyncKind::Repositories,
    )
    .await
    .expect("queued");

    assert!(matches!(
        handle.wait().await,
        Err(DispatchError::Sync(gitfolio::SyncError::ProfileNotFound { .. }))
    ));
}

#[tokio::test]
async fn scheduler_picks_due_profiles_only() {
    let fx = fixture().await;
    let transport = ScriptedTransport::new();
    transport.respond_json(REPOS_URL, json!([]));
    let executor = InlineExecutor::new(Arc::new(engine(&fx, Arc::new(transport))));
    let now = chrono::Utc::now().fixed_offset();

    let due = profile::find_due_for_auto_sync(fx.db.as_ref(), now).await.unwrap();
    assert_eq!(due.len(), 1);
    for p in due {
        enqueue_sync(&executor, fx.db.as_ref(), p.user_id, None, SyncKind::All)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
    }

    assert!(
        profile::find_due_for_auto_sync(fx.db.as_ref(), now)
            .await
            .unwrap()
            .is_empty(),
        "a successful sync stamps last_sync"
    );
}

#[tokio::test]
async fn failing_profile_is_not_rescheduled_on_the_next_pass() {
    let fx = fixture().await;
    let transport = ScriptedTransport::new();
    transport.respond(
        REPOS_URL,
        json_response(401, &json!({"message": "Bad credentials"})),
    );
    let executor = InlineExecutor::new(Arc::new(engine(&fx, Arc::new(transport))));
    let now = chrono::Utc::now().fixed_offset();

    let due = profile::find_due_for_auto_sync(fx.db.as_ref(), now).await.unwrap();
    assert_eq!(due.len(), 1);
    let report = enqueue_sync(&executor, fx.db.as_ref(), fx.user_id, None, SyncKind::All)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(report.any_failed());

    let next_pass = now + chrono::Duration::minutes(5);
    assert!(
        profile::find_due_for_auto_sync(fx.db.as_ref(), next_pass)
            .await
            .unwrap()
            .is_empty(),
        "the failed attempt opens a new frequency window"
    );
}
