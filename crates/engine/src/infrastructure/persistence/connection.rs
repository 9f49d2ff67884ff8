//! SQLite pool construction and bounded query execution

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::infrastructure::config::DatabaseConfig;
use crate::infrastructure::ports::RepoError;

/// Open a connection pool for the configured database file.
///
/// Both waiting for a pooled connection and waiting on SQLite's write lock
/// are bounded, so a stalled database surfaces as an error instead of a
/// growing pile of blocked tasks.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<SqlitePool, RepoError> {
    let options = SqliteConnectOptions::new()
        .filename(Path::new(&config.path))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.query_timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout())
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    tracing::info!(
        path = %config.path,
        max_connections = config.max_connections,
        "Connected to progression database"
    );
    Ok(pool)
}

/// Run a query future with an upper time bound.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, query: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => result.map_err(|e| map_sqlx_error(operation, e)),
        Err(_) => Err(RepoError::timeout(operation)),
    }
}

fn map_sqlx_error(operation: &'static str, error: sqlx::Error) -> RepoError {
    match error {
        sqlx::Error::PoolTimedOut => RepoError::timeout(operation),
        other => RepoError::database(operation, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_reports_timeout_for_stalled_query() {
        let result: Result<(), RepoError> = bounded("stall", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(RepoError::Timeout { operation: "stall" })));
    }

    #[tokio::test]
    async fn bounded_maps_pool_timeout_to_timeout() {
        let result: Result<(), RepoError> =
            bounded("acquire", Duration::from_secs(1), async {
                Err(sqlx::Error::PoolTimedOut)
            })
            .await;

        assert!(matches!(result, Err(RepoError::Timeout { .. })));
    }

    #[tokio::test]
    async fn connect_pool_creates_missing_database_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh.db");
        let config = DatabaseConfig {
            path: path.to_string_lossy().to_string(),
            ..Default::default()
        };

        let pool = connect_pool(&config).await.expect("connect");

        assert!(path.exists());
        pool.close().await;
    }
}
