//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Every collection shares the `job_documents` table and is isolated by its
//! `collection` column; the `collections` table records each collection's
//! embedding model identity. Vectors are stored as little-endian `f32`
//! BLOBs and searched brute-force by cosine distance.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use job_match_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use job_match_core::models::Metadata;
use job_match_core::store::{
    rank_hits, IndexInfo, IndexRecord, MetadataFilter, QueryHit, VectorIndex,
};

/// Stored row for a collection in the `collections` table.
#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub name: String,
    pub model: Option<String>,
    pub dims: Option<i64>,
    pub dataset_sha256: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One named collection in a SQLite database.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection row if it does not exist yet.
    async fn ensure_collection(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT OR IGNORE INTO collections (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&self.collection)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the SHA-256 of the dataset the collection was built from.
    pub async fn set_dataset_digest(&self, digest: &str) -> Result<()> {
        self.ensure_collection().await?;
        sqlx::query("UPDATE collections SET dataset_sha256 = ?, updated_at = ? WHERE name = ?")
            .bind(digest)
            .bind(chrono::Utc::now().timestamp())
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn collection_row(&self) -> Result<Option<CollectionRow>> {
        let row = sqlx::query(
            "SELECT name, model, dims, dataset_sha256, created_at, updated_at FROM collections WHERE name = ?",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CollectionRow {
            name: r.get("name"),
            model: r.get("model"),
            dims: r.get("dims"),
            dataset_sha256: r.get("dataset_sha256"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        self.ensure_collection().await?;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            let blob = vec_to_blob(&record.embedding);
            sqlx::query(
                r#"
                INSERT INTO job_documents (collection, id, document, metadata_json, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.document)
            .bind(&metadata_json)
            .bind(&blob)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE collections SET updated_at = ? WHERE name = ?")
            .bind(now)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, document, metadata_json, embedding FROM job_documents WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata for document {}", id))?;

            if let Some(f) = filter {
                if !f.matches(&metadata) {
                    continue;
                }
            }

            let blob: Vec<u8> = row.get("embedding");
            hits.push(QueryHit {
                distance: cosine_distance(embedding, &blob_to_vec(&blob)),
                id,
                document: row.get("document"),
                metadata,
            });
        }

        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_documents WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM job_documents WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE collections SET model = NULL, dims = NULL, dataset_sha256 = NULL, updated_at = ? WHERE name = ?",
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(&self.collection)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn index_info(&self) -> Result<Option<IndexInfo>> {
        let row = self.collection_row().await?;
        Ok(row.and_then(|r| match (r.model, r.dims) {
            (Some(model), Some(dims)) => Some(IndexInfo {
                model,
                dims: dims as usize,
            }),
            _ => None,
        }))
    }

    async fn set_index_info(&self, info: &IndexInfo) -> Result<()> {
        self.ensure_collection().await?;
        sqlx::query("UPDATE collections SET model = ?, dims = ?, updated_at = ? WHERE name = ?")
            .bind(&info.model)
            .bind(info.dims as i64)
            .bind(chrono::Utc::now().timestamp())
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::migrate_pool;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();
        pool
    }

    fn record(id: &str, embedding: Vec<f32>, role: &str, full_time: i64) -> IndexRecord {
        let mut metadata = Metadata::new();
        metadata.insert("role".into(), role.into());
        metadata.insert("full_time_count".into(), full_time.into());
        IndexRecord {
            id: id.into(),
            document: format!("Role: {}", role),
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_counts() {
        let index = SqliteIndex::new(memory_pool().await, "jobs");
        index
            .upsert(&[record("job_1", vec![1.0, 0.0], "Old", 1)])
            .await
            .unwrap();
        index
            .upsert(&[record("job_1", vec![1.0, 0.0], "New", 1)])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let hits = index.query(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits[0].document, "Role: New");
        assert_eq!(
            hits[0].metadata.get("full_time_count").and_then(|v| v.as_int()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_with_filter() {
        let index = SqliteIndex::new(memory_pool().await, "jobs");
        index
            .upsert(&[
                record("job_a", vec![1.0, 0.0], "Analyst", 5),
                record("job_b", vec![0.0, 1.0], "Nurse", 0),
                record("job_c", vec![0.7, 0.7], "Analyst", 2),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["job_a", "job_c", "job_b"]);

        let filter = MetadataFilter::new().eq("role", "Analyst").eq("full_time_count", 2);
        let hits = index.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "job_c");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let pool = memory_pool().await;
        let a = SqliteIndex::new(pool.clone(), "a");
        let b = SqliteIndex::new(pool, "b");
        a.upsert(&[record("job_1", vec![1.0], "A", 0)]).await.unwrap();
        assert_eq!(a.count().await.unwrap(), 1);
        assert_eq!(b.count().await.unwrap(), 0);
        assert!(b.query(&[1.0], 5, None).await.unwrap().is_empty());

        b.upsert(&[record("job_1", vec![1.0], "B", 0)]).await.unwrap();
        a.clear().await.unwrap();
        assert_eq!(a.count().await.unwrap(), 0);
        assert_eq!(b.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_info_roundtrip_and_clear() {
        let index = SqliteIndex::new(memory_pool().await, "jobs");
        assert_eq!(index.index_info().await.unwrap(), None);

        let info = IndexInfo {
            model: "all-minilm-l6-v2".into(),
            dims: 384,
        };
        index.set_index_info(&info).await.unwrap();
        index.set_dataset_digest("abc123").await.unwrap();
        assert_eq!(index.index_info().await.unwrap(), Some(info));
        let row = index.collection_row().await.unwrap().unwrap();
        assert_eq!(row.dataset_sha256.as_deref(), Some("abc123"));

        index.clear().await.unwrap();
        assert_eq!(index.index_info().await.unwrap(), None);
    }
}
