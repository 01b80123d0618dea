//! Database connection utilities.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pool size used when the caller does not pick one.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// SQLite pragmas applied to every new pool: WAL journal, 5 second busy
/// timeout, NORMAL synchronous mode.
const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(backend, pragma.to_string()))
            .await?;
    }
    Ok(())
}

/// Whether a connection string targets SQLite, including `sqlite::memory:`.
fn is_sqlite_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

fn connect_options(database_url: &str, max_connections: u32) -> ConnectOptions {
    // Shared-cache in-memory SQLite does not honor busy_timeout across
    // connections, so it gets a single connection.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        max_connections
    };
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    options
}

/// Establish a connection to the database.
///
/// # Arguments
/// * `database_url` - Database connection string (e.g., `sqlite:///path/to/db` or `postgres:///gitfolio_dev`)
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    connect_with_pool_size(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Establish a connection with an explicit pool size.
///
/// In-memory SQLite URLs are always pinned to one connection.
pub async fn connect_with_pool_size(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(database_url, max_connections)).await?;

    if is_sqlite_url(database_url) {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(max_connections, "Database connection established");
    Ok(db)
}

/// Establish a connection to the database and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = gitfolio::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn configure_sqlite_runs_all_pragmas() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results(SQLITE_PRAGMAS.map(|_| MockExecResult {
                rows_affected: 0,
                last_insert_id: 0,
            }))
            .into_connection();

        configure_sqlite(&db)
            .await
            .expect("mock sqlite pragma execs should succeed");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), SQLITE_PRAGMAS.len());
    }

    #[test]
    fn in_memory_sqlite_uses_a_single_connection() {
        let options = connect_options("sqlite::memory:", 8);
        assert_eq!(options.get_max_connections(), Some(1));

        let options = connect_options("postgres:///gitfolio_dev", 8);
        assert_eq!(options.get_max_connections(), Some(8));
    }

    #[test]
    fn sqlite_detection_includes_memory_urls() {
        assert!(is_sqlite_url("sqlite::memory:"));
        assert!(is_sqlite_url("sqlite:///var/lib/gitfolio.db?mode=rwc"));
        assert!(!is_sqlite_url("postgres:///gitfolio_dev"));
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let err = connect("this-is-not-a-db-url")
            .await
            .expect_err("invalid URL should error");
        let msg = err.to_string().to_ascii_lowercase();
        assert!(
            msg.contains("error") || msg.contains("invalid"),
            "unexpected error message: {err}"
        );
    }
}
