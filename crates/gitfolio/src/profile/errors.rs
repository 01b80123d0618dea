use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// No profile is linked to the user.
    #[error("No GitHub profile for user {user_id}")]
    NotFound { user_id: Uuid },

    /// The GitHub account is already linked to another local user.
    #[error("GitHub account {github_login} is linked to another user")]
    AccountLinkedElsewhere { github_login: String },

    /// The user already has a different GitHub account linked.
    #[error("User {user_id} is linked to GitHub account {linked_login}; disconnect it first")]
    UserLinkedToOtherAccount { user_id: Uuid, linked_login: String },

    /// The profile has no stored access token.
    #[error("No GitHub access token stored for user {user_id}")]
    MissingCredential { user_id: Uuid },
}

/// Result type alias for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
