//! GitHub profile store: account linkage, credentials and preferences.
//!
//! A profile links one local user to one GitHub account and owns everything
//! a sync writes.

mod errors;
mod query;
mod single;

pub use errors::{ProfileError, Result};
pub use query::{
    PreferencesUpdate, excluded_repo_names, find_due_for_auto_sync, portfolio_repositories,
    repositories_for_profile, update_preferences,
};
pub use single::{
    apply_github_user, credential_for, disconnect, find_by_github_id, find_by_id, find_by_user_id,
    find_by_username, get_by_user_id, mark_synced, upsert_from_login,
};

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
    use serde_json::json;
    use uuid::Uuid;

    use crate::entity::prelude::*;
    use crate::github::GitHubUser;
    use crate::reconcile::{RepositoryReconciler, reconcile};

    async fn db() -> DatabaseConnection {
        crate::db::connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database")
    }

    fn octocat() -> GitHubUser {
        serde_json::from_value(json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "html_url": "https://github.com/octocat",
            "company": "@github",
            "public_repos": 8,
            "followers": 9000,
            "following": 9,
            "created_at": "2011-01-25T18:44:36Z"
        }))
        .expect("user payload")
    }

    #[tokio::test]
    async fn first_login_creates_profile_with_defaults() {
        let db = db().await;
        let user_id = Uuid::new_v4();

        let profile = upsert_from_login(&db, user_id, &octocat(), "gho_one")
            .await
            .expect("link");

        assert_eq!(profile.github_username, "octocat");
        assert_eq!(profile.followers, 9000);
        assert!(profile.joined_at.is_some());
        assert!(profile.auto_sync);
        assert_eq!(profile.sync_frequency, SyncFrequency::Daily);
        assert_eq!(profile.last_sync, None);
        assert_eq!(credential_for(&db, user_id).await.unwrap(), "gho_one");
    }

    #[tokio::test]
    async fn later_login_updates_in_place_and_keeps_preferences() {
        let db = db().await;
        let user_id = Uuid::new_v4();
        let first = upsert_from_login(&db, user_id, &octocat(), "gho_one")
            .await
            .unwrap();
        let first = update_preferences(
            &db,
            first,
            PreferencesUpdate {
                sync_frequency: Some(SyncFrequency::Weekly),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut renamed = octocat();
        renamed.login = "octo-renamed".to_string();
        let second = upsert_from_login(&db, user_id, &renamed, "gho_two")
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.github_username, "octo-renamed");
        assert_eq!(second.sync_frequency, SyncFrequency::Weekly);
        assert_eq!(second.access_token.as_deref(), Some("gho_two"));
        assert_eq!(GithubProfile::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn account_cannot_be_linked_to_two_users() {
        let db = db().await;
        upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();

        let err = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .expect_err("already linked");
        assert!(matches!(err, ProfileError::AccountLinkedElsewhere { .. }));

        let user_id = Uuid::new_v4();
        let mut other = octocat();
        other.id = 1;
        other.login = "hubot".to_string();
        upsert_from_login(&db, user_id, &other, "t").await.unwrap();
        let mut third = octocat();
        third.id = 2;
        third.login = "monalisa".to_string();
        let err = upsert_from_login(&db, user_id, &third, "t")
            .await
            .expect_err("user already linked");
        assert!(matches!(err, ProfileError::UserLinkedToOtherAccount { .. }));
    }

    #[tokio::test]
    async fn credential_for_reports_missing_profile_and_token() {
        let db = db().await;
        let user_id = Uuid::new_v4();
        assert!(matches!(
            credential_for(&db, user_id).await,
            Err(ProfileError::NotFound { .. })
        ));

        let profile = upsert_from_login(&db, user_id, &octocat(), "t")
            .await
            .unwrap();
        let mut model: GithubProfileActiveModel = profile.into();
        model.access_token = Set(None);
        model.update(&db).await.unwrap();

        assert!(matches!(
            credential_for(&db, user_id).await,
            Err(ProfileError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn refresh_overwrites_account_data_only() {
        let db = db().await;
        let profile = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "gho")
            .await
            .unwrap();
        let mut fresh = octocat();
        fresh.bio = Some("There once was...".to_string());
        fresh.followers = 9001;

        let refreshed = apply_github_user(&db, profile, &fresh).await.unwrap();
        assert_eq!(refreshed.bio.as_deref(), Some("There once was..."));
        assert_eq!(refreshed.followers, 9001);
        assert_eq!(refreshed.access_token.as_deref(), Some("gho"));
    }

    #[tokio::test]
    async fn due_profiles_follow_frequency_and_last_sync() {
        let db = db().await;
        let now = Utc::now().fixed_offset();
        let due = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();

        let mut hubot = octocat();
        hubot.id = 7;
        hubot.login = "hubot".to_string();
        let recent = upsert_from_login(&db, Uuid::new_v4(), &hubot, "t")
            .await
            .unwrap();
        mark_synced(&db, recent.id, now - Duration::hours(1))
            .await
            .unwrap();

        let found = find_due_for_auto_sync(&db, now).await.unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![due.id]);

        mark_synced(&db, due.id, now).await.unwrap();
        assert!(find_due_for_auto_sync(&db, now).await.unwrap().is_empty());
        let later = now + Duration::days(2);
        assert_eq!(find_due_for_auto_sync(&db, later).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn never_synced_profiles_are_scheduled_first() {
        let db = db().await;
        let now = Utc::now().fixed_offset();
        let stale = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();
        mark_synced(&db, stale.id, now - Duration::days(3))
            .await
            .unwrap();

        let mut hubot = octocat();
        hubot.id = 7;
        hubot.login = "hubot".to_string();
        let fresh = upsert_from_login(&db, Uuid::new_v4(), &hubot, "t")
            .await
            .unwrap();

        let ids: Vec<_> = find_due_for_auto_sync(&db, now)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![fresh.id, stale.id]);
    }

    #[tokio::test]
    async fn failed_attempt_defers_profile_until_next_window() {
        let db = db().await;
        let now = Utc::now().fixed_offset();
        let profile = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();
        let log = crate::sync_log::start(&db, profile.id, SyncType::Repositories)
            .await
            .unwrap();
        let mut errors = crate::sync::ErrorLog::default();
        errors.push(crate::sync::ErrorEntry::critical("GitHub API error 500"));
        crate::sync_log::finalize(&db, &log, 0, &errors).await.unwrap();

        let found = find_by_user_id(&db, profile.user_id).await.unwrap().unwrap();
        assert_eq!(found.last_sync, None);
        assert!(
            find_due_for_auto_sync(&db, now + Duration::minutes(5))
                .await
                .unwrap()
                .is_empty()
        );
        let next_day = now + Duration::hours(25);
        assert_eq!(find_due_for_auto_sync(&db, next_day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_by_username_matches_login() {
        let db = db().await;
        let profile = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();

        let found = find_by_username(&db, "octocat").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(profile.id));
        assert!(find_by_username(&db, "hubot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disconnect_cascades_to_synced_data() {
        let db = db().await;
        let user_id = Uuid::new_v4();
        let profile = upsert_from_login(&db, user_id, &octocat(), "t")
            .await
            .unwrap();
        let items = vec![json!({"id": 1, "name": "a", "full_name": "octocat/a"})];
        reconcile(&db, &items, &RepositoryReconciler::new(profile.id))
            .await
            .unwrap();
        crate::sync_log::start(&db, profile.id, SyncType::Repositories)
            .await
            .unwrap();

        let removed = disconnect(&db, user_id).await.unwrap();
        assert_eq!(removed.id, profile.id);
        assert_eq!(Repository::find().count(&db).await.unwrap(), 0);
        assert_eq!(SyncLog::find().count(&db).await.unwrap(), 0);
        assert!(find_by_user_id(&db, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn portfolio_hides_forks_exclusions_and_hidden_rows() {
        let db = db().await;
        let profile = upsert_from_login(&db, Uuid::new_v4(), &octocat(), "t")
            .await
            .unwrap();
        let items = vec![
            json!({"id": 1, "name": "kept", "full_name": "octocat/kept"}),
            json!({"id": 2, "name": "forked", "full_name": "octocat/forked", "fork": true}),
            json!({"id": 3, "name": "secret", "full_name": "octocat/secret"}),
        ];
        reconcile(&db, &items, &RepositoryReconciler::new(profile.id))
            .await
            .unwrap();
        let profile = update_preferences(
            &db,
            profile,
            PreferencesUpdate {
                excluded_repos: Some(vec!["secret".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let shown = portfolio_repositories(&db, &profile).await.unwrap();
        let names: Vec<_> = shown.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["kept"]);
        assert_eq!(excluded_repo_names(&profile), vec!["secret".to_string()]);
    }
}
