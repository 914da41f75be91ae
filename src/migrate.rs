//! Index database bootstrap: open the SQLite file and bring its schema up
//! to date.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;

/// `jobmatch init`.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = open_database(&config.index.path).await?;
    pool.close().await;
    Ok(())
}

/// Open (creating if needed) the index database at `path` and migrate it.
///
/// WAL mode lets `serve` keep answering queries while `index build` writes;
/// a writer waits up to five seconds for the lock instead of failing.
pub async fn open_database(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database: {}", path.display()))?;

    migrate_pool(&pool).await?;
    Ok(pool)
}

/// Create every table and index on an open pool. Idempotent.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // One row per named collection, carrying its embedding model identity
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            model TEXT,
            dims INTEGER,
            dataset_sha256 TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            document TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            embedding BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resumes (
            user_id TEXT PRIMARY KEY,
            extracted_text TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_job_documents_collection ON job_documents(collection)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_database_creates_parent_and_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("jobmatch.sqlite");

        let pool = open_database(&path).await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["collections", "job_documents", "resumes"]);
        pool.close().await;
        assert!(path.exists());

        // Reopening an existing database re-runs migrations harmlessly.
        let pool = open_database(&path).await.unwrap();
        pool.close().await;
    }
}
