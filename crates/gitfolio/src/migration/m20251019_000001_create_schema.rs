//! Initial migration to create the gitfolio database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_github_profiles(manager).await?;
        self.create_repositories(manager).await?;
        self.create_commits(manager).await?;
        self.create_sync_logs(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GithubProfiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_github_profiles(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GithubProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GithubProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Account linkage
                    .col(
                        ColumnDef::new(GithubProfiles::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::GithubId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::GithubUsername)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GithubProfiles::AccessToken).text().null())
                    .col(ColumnDef::new(GithubProfiles::AvatarUrl).string().null())
                    .col(ColumnDef::new(GithubProfiles::ProfileUrl).string().null())
                    // Stats
                    .col(
                        ColumnDef::new(GithubProfiles::PublicRepos)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::Followers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::Following)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::JoinedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Profile data
                    .col(ColumnDef::new(GithubProfiles::Name).string().null())
                    .col(ColumnDef::new(GithubProfiles::Bio).text().null())
                    .col(ColumnDef::new(GithubProfiles::Company).string().null())
                    .col(ColumnDef::new(GithubProfiles::Location).string().null())
                    .col(ColumnDef::new(GithubProfiles::Blog).string().null())
                    // Sync settings
                    .col(
                        ColumnDef::new(GithubProfiles::AutoSync)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::SyncFrequency)
                            .string()
                            .not_null()
                            .default("daily"),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::LastSync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Portfolio preferences
                    .col(
                        ColumnDef::new(GithubProfiles::ShowForkedRepos)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::ExcludedRepos)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GithubProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::ProfileId).uuid().not_null())
                    // Identity
                    .col(
                        ColumnDef::new(Repositories::GithubId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::FullName).string().not_null())
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    // URLs
                    .col(ColumnDef::new(Repositories::HtmlUrl).string().null())
                    .col(ColumnDef::new(Repositories::CloneUrl).string().null())
                    .col(ColumnDef::new(Repositories::GitUrl).string().null())
                    // Counters
                    .col(
                        ColumnDef::new(Repositories::StarsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::ForksCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::WatchersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::OpenIssuesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Repositories::Language).string().null())
                    // Flags
                    .col(
                        ColumnDef::new(Repositories::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Repositories::IsFork)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Repositories::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // GitHub timestamps
                    .col(
                        ColumnDef::new(Repositories::CreatedAtGithub)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAtGithub)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::PushedAtGithub)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Display overrides
                    .col(
                        ColumnDef::new(Repositories::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Repositories::IsHidden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Repositories::CustomDescription)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Repositories::DemoUrl).string().null())
                    .col(
                        ColumnDef::new(Repositories::LastSynced)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_profile")
                            .from(Repositories::Table, Repositories::ProfileId)
                            .to(GithubProfiles::Table, GithubProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key used by the reconciler's upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_profile_github_id")
                    .table(Repositories::Table)
                    .col(Repositories::ProfileId)
                    .col(Repositories::GithubId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Lookup by name only; renames must not collide on it
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_profile_name")
                    .table(Repositories::Table)
                    .col(Repositories::ProfileId)
                    .col(Repositories::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_profile_hidden")
                    .table(Repositories::Table)
                    .col(Repositories::ProfileId)
                    .col(Repositories::IsHidden)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_commits(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Commits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Commits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Commits::RepositoryId).uuid().not_null())
                    .col(ColumnDef::new(Commits::ProfileId).uuid().not_null())
                    .col(
                        ColumnDef::new(Commits::Sha)
                            .string_len(40)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Commits::Message).text().not_null())
                    .col(
                        ColumnDef::new(Commits::CommittedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Commits::HtmlUrl).string().null())
                    .col(
                        ColumnDef::new(Commits::Additions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::Deletions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::TotalChanges)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commits_repository")
                            .from(Commits::Table, Commits::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commits_profile")
                            .from(Commits::Table, Commits::ProfileId)
                            .to(GithubProfiles::Table, GithubProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commits_repository_date")
                    .table(Commits::Table)
                    .col(Commits::RepositoryId)
                    .col(Commits::CommittedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_logs(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncLogs::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(SyncLogs::SyncType).string().not_null())
                    .col(
                        ColumnDef::new(SyncLogs::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::ReposSynced)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::CommitsSynced)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::Errors)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncLogs::DurationMs).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_logs_profile")
                            .from(SyncLogs::Table, SyncLogs::ProfileId)
                            .to(GithubProfiles::Table, GithubProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_profile_type_status")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::ProfileId)
                    .col(SyncLogs::SyncType)
                    .col(SyncLogs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_started")
                    .table(SyncLogs::Table)
                    .col((SyncLogs::StartedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "github_profiles")]
enum GithubProfiles {
    Table,
    Id,
    UserId,
    GithubId,
    GithubUsername,
    AccessToken,
    AvatarUrl,
    ProfileUrl,
    PublicRepos,
    Followers,
    Following,
    JoinedAt,
    Name,
    Bio,
    Company,
    Location,
    Blog,
    AutoSync,
    SyncFrequency,
    LastSync,
    ShowForkedRepos,
    ExcludedRepos,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "repositories")]
enum Repositories {
    Table,
    Id,
    ProfileId,
    GithubId,
    Name,
    FullName,
    Description,
    HtmlUrl,
    CloneUrl,
    GitUrl,
    StarsCount,
    ForksCount,
    WatchersCount,
    OpenIssuesCount,
    Language,
    IsPrivate,
    IsFork,
    IsArchived,
    CreatedAtGithub,
    UpdatedAtGithub,
    PushedAtGithub,
    IsFeatured,
    IsHidden,
    CustomDescription,
    DemoUrl,
    LastSynced,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "commits")]
enum Commits {
    Table,
    Id,
    RepositoryId,
    ProfileId,
    Sha,
    Message,
    CommittedAt,
    HtmlUrl,
    Additions,
    Deletions,
    TotalChanges,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "sync_logs")]
enum SyncLogs {
    Table,
    Id,
    ProfileId,
    SyncType,
    Status,
    ReposSynced,
    CommitsSynced,
    ErrorCount,
    Errors,
    StartedAt,
    CompletedAt,
    DurationMs,
}
