//! Database connection management.
//!
//! Thin wrapper around a `SQLx` SQLite pool that handles file creation
//! and sane pool defaults.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Open a SQLite connection pool at `path`, creating the file if needed.
///
/// Pass `:memory:` for an in-memory database (used by tests).
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is invalid or the pool cannot
/// be initialized.
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    if !path_str.contains(":memory:") {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true)
        .pragma("journal_mode", "WAL")
        .pragma("busy_timeout", "5000");

    // An in-memory database exists per connection, so the pool must not
    // fan out in that case.
    let max_connections = if path_str.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let pool = open_pool(":memory:").await.expect("open pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("probe query");
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let path = tmp.path().join("nested/dir/accounts.db");
        let pool = open_pool(&path).await.expect("open pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("probe query");
        assert!(path.exists());
    }
}
