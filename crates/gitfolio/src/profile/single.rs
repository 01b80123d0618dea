use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::entity::github_profile::{ActiveModel, Column, Entity as GithubProfile, Model};
use crate::entity::sync_frequency::SyncFrequency;
use crate::github::GitHubUser;

use super::errors::{ProfileError, Result};

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>> {
    GithubProfile::find_by_id(id)
        .one(db)
        .await
        .map_err(ProfileError::from)
}

/// Find the profile linked to a local user.
pub async fn find_by_user_id(db: &DatabaseConnection, user_id: Uuid) -> Result<Option<Model>> {
    GithubProfile::find()
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(ProfileError::from)
}

/// Find a profile by GitHub login.
pub async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<Option<Model>> {
    GithubProfile::find()
        .filter(Column::GithubUsername.eq(username))
        .one(db)
        .await
        .map_err(ProfileError::from)
}

pub async fn find_by_github_id(db: &DatabaseConnection, github_id: i64) -> Result<Option<Model>> {
    GithubProfile::find()
        .filter(Column::GithubId.eq(github_id))
        .one(db)
        .await
        .map_err(ProfileError::from)
}

/// Profile of `user_id`, or [`ProfileError::NotFound`].
pub async fn get_by_user_id(db: &DatabaseConnection, user_id: Uuid) -> Result<Model> {
    find_by_user_id(db, user_id)
        .await?
        .ok_or(ProfileError::NotFound { user_id })
}

/// The stored access token of `user_id`.
///
/// Checked before a sync is dispatched so that a missing token is reported to
/// the caller instead of becoming a failed sync log.
pub async fn credential_for(db: &DatabaseConnection, user_id: Uuid) -> Result<String> {
    let profile = get_by_user_id(db, user_id).await?;
    match profile.access_token {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ProfileError::MissingCredential { user_id }),
    }
}

// ─── Account Linkage ─────────────────────────────────────────────────────────

fn apply_user_fields(model: &mut ActiveModel, user: &GitHubUser) {
    model.github_username = Set(user.login.clone());
    model.name = Set(user.name.clone());
    model.avatar_url = Set(user.avatar_url.clone());
    model.profile_url = Set(user.html_url.clone());
    model.bio = Set(user.bio.clone());
    model.company = Set(user.company.clone());
    model.location = Set(user.location.clone());
    model.blog = Set(user.blog.clone());
    model.public_repos = Set(user.public_repos);
    model.followers = Set(user.followers);
    model.following = Set(user.following);
    model.joined_at = Set(user.joined_at());
}

/// Link (or re-link) the GitHub account behind `token` to `user_id`.
///
/// The first login creates the profile with default preferences. Later logins
/// find it by GitHub id and refresh the account data and the token. A GitHub
/// account can only be linked to one local user, and a user to one account.
pub async fn upsert_from_login(
    db: &DatabaseConnection,
    user_id: Uuid,
    user: &GitHubUser,
    token: &str,
) -> Result<Model> {
    let now = Utc::now().fixed_offset();

    if let Some(existing) = find_by_github_id(db, user.id).await? {
        if existing.user_id != user_id {
            return Err(ProfileError::AccountLinkedElsewhere {
                github_login: user.login.clone(),
            });
        }
        let mut model = existing.into_active_model();
        apply_user_fields(&mut model, user);
        model.access_token = Set(Some(token.to_string()));
        model.updated_at = Set(now);
        let profile = model.update(db).await?;
        tracing::info!(%user_id, login = %profile.github_username, "Updated GitHub profile on login");
        return Ok(profile);
    }

    if let Some(other) = find_by_user_id(db, user_id).await? {
        return Err(ProfileError::UserLinkedToOtherAccount {
            user_id,
            linked_login: other.github_username,
        });
    }

    let mut model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        github_id: Set(user.id),
        access_token: Set(Some(token.to_string())),
        auto_sync: Set(true),
        sync_frequency: Set(SyncFrequency::default()),
        last_sync: Set(None),
        show_forked_repos: Set(false),
        excluded_repos: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply_user_fields(&mut model, user);
    let profile = model.insert(db).await?;
    tracing::info!(%user_id, login = %profile.github_username, "Linked GitHub profile");
    Ok(profile)
}

/// Overwrite the account data of `profile` with a fresh `GET /user` result.
///
/// Preferences, the token and `last_sync` are untouched.
pub async fn apply_github_user(
    db: &DatabaseConnection,
    profile: Model,
    user: &GitHubUser,
) -> Result<Model> {
    let mut model = profile.into_active_model();
    apply_user_fields(&mut model, user);
    model.updated_at = Set(Utc::now().fixed_offset());
    model.update(db).await.map_err(ProfileError::from)
}

/// Stamp `last_sync` on the profile.
pub async fn mark_synced(
    db: &DatabaseConnection,
    profile_id: Uuid,
    at: DateTime<FixedOffset>,
) -> Result<()> {
    let model = ActiveModel {
        id: Set(profile_id),
        last_sync: Set(Some(at)),
        updated_at: Set(at),
        ..Default::default()
    };
    model.update(db).await?;
    Ok(())
}

/// Delete the profile of `user_id` with its repositories, commits and logs.
///
/// Returns the deleted profile so the caller can revoke its token.
pub async fn disconnect(db: &DatabaseConnection, user_id: Uuid) -> Result<Model> {
    let profile = get_by_user_id(db, user_id).await?;
    GithubProfile::delete_by_id(profile.id).exec(db).await?;
    tracing::info!(%user_id, login = %profile.github_username, "Disconnected GitHub profile");
    Ok(profile)
}
