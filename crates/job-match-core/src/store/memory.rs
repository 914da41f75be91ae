//! In-memory [`VectorIndex`] implementation for tests and embedded use.
//!
//! Records live in a `BTreeMap` behind `std::sync::RwLock`. Queries are
//! brute-force cosine distance over every stored vector.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;

use super::{rank_hits, IndexInfo, IndexRecord, MetadataFilter, QueryHit, VectorIndex};

/// In-memory vector index holding a single collection.
#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<BTreeMap<String, IndexRecord>>,
    info: RwLock<Option<IndexInfo>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut stored = self.records.write().map_err(poisoned)?;
        for r in records {
            stored.insert(r.id.clone(), r.clone());
        }
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
        let stored = self.records.read().map_err(poisoned)?;
        let hits: Vec<QueryHit> = stored
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| QueryHit {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(embedding, &r.embedding),
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.records.read().map_err(poisoned)?.len() as i64)
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().map_err(poisoned)?.clear();
        *self.info.write().map_err(poisoned)? = None;
        Ok(())
    }

    async fn index_info(&self) -> Result<Option<IndexInfo>> {
        Ok(self.info.read().map_err(poisoned)?.clone())
    }

    async fn set_index_info(&self, info: &IndexInfo) -> Result<()> {
        *self.info.write().map_err(poisoned)? = Some(info.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, HashEmbedder};
    use crate::models::{JobPosting, Metadata};
    use crate::store::{build_state, populate, rebuild, BuildState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hash embedder that fails on its `fail_on`-th call (1-based).
    struct FlakyEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                anyhow::bail!("embedding service unavailable");
            }
            self.inner.embed(texts).await
        }
    }

    fn record(id: &str, embedding: Vec<f32>, role: &str) -> IndexRecord {
        let mut metadata = Metadata::new();
        metadata.insert("role".into(), role.into());
        IndexRecord {
            id: id.into(),
            document: format!("Role: {}", role),
            metadata,
            embedding,
        }
    }

    fn posting(id: &str, role: &str, skills: &[&str]) -> JobPosting {
        JobPosting {
            role_id: id.into(),
            role: Some(role.into()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[record("job_1", vec![1.0, 0.0], "Old")])
            .await
            .unwrap();
        index
            .upsert(&[record("job_1", vec![1.0, 0.0], "New")])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(hits[0].document, "Role: New");
    }

    #[tokio::test]
    async fn test_query_empty_index_returns_empty() {
        let index = InMemoryIndex::new();
        let hits = index.query(&[1.0, 0.0], 20, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_returns_k_nearest_without_cutoff() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("job_near", vec![1.0, 0.0], "Near"),
                record("job_far", vec![-1.0, 0.0], "Far"),
                record("job_mid", vec![0.0, 1.0], "Mid"),
            ])
            .await
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["job_near", "job_mid", "job_far"]);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);

        let top = index.query(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_query_filter() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("job_1", vec![1.0, 0.0], "Data Analyst"),
                record("job_2", vec![1.0, 0.1], "Nurse"),
            ])
            .await
            .unwrap();
        let filter = MetadataFilter::new().eq("role", "Nurse");
        let hits = index.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "job_2");

        let none = MetadataFilter::new().eq("role", "Pilot");
        assert!(index.query(&[1.0, 0.0], 10, Some(&none)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_populate_is_idempotent_per_role_id() {
        let index = InMemoryIndex::new();
        let embedder = HashEmbedder::new(32);
        let postings = vec![
            posting("1", "Data Analyst", &["SQL"]),
            posting("2", "Nurse", &["Triage"]),
            posting("3", "Welder", &["TIG"]),
        ];

        let mut calls = Vec::new();
        let stats = populate(&index, &embedder, &postings, 2, |done, total| {
            calls.push((done, total))
        })
        .await
        .unwrap();
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.batches, 2);
        assert_eq!(calls, vec![(2, 3), (3, 3)]);

        populate(&index, &embedder, &postings, 2, |_, _| {})
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 3);
        assert_eq!(
            index.index_info().await.unwrap(),
            Some(IndexInfo {
                model: "fnv1a-hash-32".into(),
                dims: 32
            })
        );
    }

    #[tokio::test]
    async fn test_rebuild_clears_first() {
        let index = InMemoryIndex::new();
        let embedder = HashEmbedder::new(32);
        populate(
            &index,
            &embedder,
            &[posting("1", "A", &[]), posting("2", "B", &[])],
            8,
            |_, _| {},
        )
        .await
        .unwrap();
        rebuild(&index, &embedder, &[posting("3", "C", &[])], 8, |_, _| {})
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_populate_rejects_zero_batch() {
        let index = InMemoryIndex::new();
        let embedder = HashEmbedder::new(8);
        assert!(populate(&index, &embedder, &[], 0, |_, _| {}).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_rebuild_leaves_incomplete_collection() {
        let index = InMemoryIndex::new();
        let embedder = HashEmbedder::new(32);
        let postings = vec![
            posting("1", "Data Analyst", &["SQL"]),
            posting("2", "Nurse", &["Triage"]),
            posting("3", "Welder", &["TIG"]),
        ];
        populate(&index, &embedder, &postings, 2, |_, _| {})
            .await
            .unwrap();
        assert_eq!(build_state(&index).await.unwrap(), BuildState::Complete(3));

        let flaky = FlakyEmbedder {
            inner: HashEmbedder::new(32),
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        assert!(rebuild(&index, &flaky, &postings, 2, |_, _| {}).await.is_err());

        assert_eq!(index.count().await.unwrap(), 2);
        assert!(index.index_info().await.unwrap().is_none());
        let state = build_state(&index).await.unwrap();
        assert_eq!(state, BuildState::Incomplete(2));
        assert!(!state.is_complete());

        rebuild(&index, &embedder, &postings, 2, |_, _| {})
            .await
            .unwrap();
        assert_eq!(build_state(&index).await.unwrap(), BuildState::Complete(3));
    }

    #[tokio::test]
    async fn test_build_state_empty() {
        let index = InMemoryIndex::new();
        let state = build_state(&index).await.unwrap();
        assert_eq!(state, BuildState::Empty);
        assert_eq!(state.documents(), 0);
    }
}
