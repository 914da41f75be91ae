//! Résumé source: `user_id → extracted text`.
//!
//! Upload and OCR happen elsewhere; this module only stores and serves the
//! extracted text, one résumé per user.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

use crate::config::Config;
use crate::migrate;

/// Lookup of a user's current résumé text.
#[async_trait]
pub trait ResumeSource: Send + Sync {
    /// `None` when the user has no résumé on file.
    async fn resume_text(&self, user_id: &str) -> Result<Option<String>>;
}

/// Résumés stored in the `resumes` table.
pub struct SqliteResumeStore {
    pool: SqlitePool,
}

impl SqliteResumeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a user's résumé.
    pub async fn set(&self, user_id: &str, text: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resumes (user_id, extracted_text, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                extracted_text = excluded.extracted_text,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ResumeSource for SqliteResumeStore {
    async fn resume_text(&self, user_id: &str) -> Result<Option<String>> {
        let text: Option<String> =
            sqlx::query_scalar("SELECT extracted_text FROM resumes WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(text)
    }
}

/// `jobmatch resume set <user_id> <file>`.
pub async fn run_resume_set(config: &Config, user_id: &str, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read resume file: {}", file.display()))?;
    if user_id.trim().is_empty() {
        bail!("user_id must not be empty");
    }
    if text.trim().is_empty() {
        bail!("resume file is empty: {}", file.display());
    }

    let pool = migrate::open_database(&config.index.path).await?;
    SqliteResumeStore::new(pool.clone()).set(user_id, text.trim()).await?;
    pool.close().await;

    println!("Stored resume for user {} ({} chars).", user_id, text.trim().chars().count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::migrate_pool;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_set_replaces_and_missing_is_none() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();

        let store = SqliteResumeStore::new(pool);
        assert_eq!(store.resume_text("u1").await.unwrap(), None);

        store.set("u1", "first").await.unwrap();
        store.set("u1", "second").await.unwrap();
        assert_eq!(store.resume_text("u1").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.resume_text("u2").await.unwrap(), None);
    }
}
