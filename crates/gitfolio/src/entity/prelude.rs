//! Common re-exports for convenient entity usage.

pub use super::commit::{
    ActiveModel as CommitActiveModel, Column as CommitColumn, Entity as Commit,
    Model as CommitModel,
};
pub use super::github_profile::{
    ActiveModel as GithubProfileActiveModel, Column as GithubProfileColumn,
    Entity as GithubProfile, Model as GithubProfileModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::sync_frequency::SyncFrequency;
pub use super::sync_log::{
    ActiveModel as SyncLogActiveModel, Column as SyncLogColumn, Entity as SyncLog,
    Model as SyncLogModel,
};
pub use super::sync_status::SyncStatus;
pub use super::sync_type::SyncType;
