//! Vector index abstraction for Job Match.
//!
//! The [`VectorIndex`] trait defines every storage operation the matching
//! pipeline needs, so the SQLite collection and the in-memory index are
//! interchangeable behind an `Arc<dyn VectorIndex>`.
//!
//! Implementations must be `Send + Sync`: one index is shared read-only by
//! all concurrent queries. Rebuilds are exclusive and never interleaved with
//! serving.

pub mod memory;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::document;
use crate::embedding::EmbeddingProvider;
use crate::models::{JobPosting, Metadata, MetadataValue};

/// One row to upsert: an indexed document plus its embedding.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbor hit, as returned by [`VectorIndex::query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    /// Cosine distance to the query vector; smaller is closer.
    pub distance: f64,
}

/// Conjunction of metadata equality clauses.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    clauses: Vec<(String, MetadataValue)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause (`key == value`).
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.clauses.push((key.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, MetadataValue)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True when every clause matches. A missing key never matches, and a
    /// text value never equals an integer value.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}

/// Embedding model identity persisted with a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub model: String,
    pub dims: usize,
}

/// Abstract vector index over one named collection.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite records by id |
/// | [`query`](VectorIndex::query) | k nearest records, ascending distance |
/// | [`count`](VectorIndex::count) | Number of stored records |
/// | [`clear`](VectorIndex::clear) | Drop every record (destructive rebuild) |
/// | [`index_info`](VectorIndex::index_info) | Stored embedding model identity |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records. Re-upserting an id replaces it.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Return up to `k` records nearest to `embedding`, ascending by
    /// distance (ties broken by id). No distance cutoff is applied. An empty
    /// collection, or a filter that excludes everything, yields an empty
    /// list.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>>;

    /// Number of records in the collection. See [`build_state`] for
    /// readiness.
    async fn count(&self) -> Result<i64>;

    /// Remove every record and the stored model identity.
    async fn clear(&self) -> Result<()>;

    /// The embedding model the collection was built with, if any.
    async fn index_info(&self) -> Result<Option<IndexInfo>>;

    /// Record the embedding model the collection is built with.
    async fn set_index_info(&self, info: &IndexInfo) -> Result<()>;
}

/// Sort hits ascending by distance, then id, and keep the first `k`.
pub fn rank_hits(mut hits: Vec<QueryHit>, k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}

/// Outcome of a [`populate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateStats {
    pub documents: usize,
    pub batches: usize,
}

/// Build documents for `postings`, embed them in batches of `batch_size`,
/// and upsert each batch. `on_batch(done, total)` is called after every
/// batch is written.
///
/// The embedder's model identity is recorded only after the last batch is
/// written. It marks the build as complete: a run that fails partway leaves
/// records without it, and [`build_state`] reports them as unfinished.
pub async fn populate(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    postings: &[JobPosting],
    batch_size: usize,
    mut on_batch: impl FnMut(usize, usize) + Send,
) -> Result<PopulateStats> {
    if batch_size == 0 {
        bail!("batch_size must be > 0");
    }

    let total = postings.len();
    let mut stats = PopulateStats::default();

    for batch in postings.chunks(batch_size) {
        let docs: Vec<_> = batch.iter().map(document::build).collect();
        let texts: Vec<String> = docs.iter().map(|d| d.document.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != docs.len() {
            bail!(
                "embedding provider returned {} vectors for {} documents",
                vectors.len(),
                docs.len()
            );
        }

        let records: Vec<IndexRecord> = docs
            .into_iter()
            .zip(vectors)
            .map(|(d, embedding)| IndexRecord {
                id: d.id,
                document: d.document,
                metadata: d.metadata,
                embedding,
            })
            .collect();
        index.upsert(&records).await?;

        stats.documents += records.len();
        stats.batches += 1;
        debug!(batch = stats.batches, done = stats.documents, total, "upserted batch");
        on_batch(stats.documents, total);
    }

    index
        .set_index_info(&IndexInfo {
            model: embedder.model_name().to_string(),
            dims: embedder.dims(),
        })
        .await?;

    Ok(stats)
}

/// Whether a collection holds a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "documents")]
pub enum BuildState {
    Empty,
    /// Records exist but no build finished writing them.
    Incomplete(i64),
    Complete(i64),
}

impl BuildState {
    pub fn is_complete(&self) -> bool {
        matches!(self, BuildState::Complete(_))
    }

    pub fn documents(&self) -> i64 {
        match *self {
            BuildState::Empty => 0,
            BuildState::Incomplete(n) | BuildState::Complete(n) => n,
        }
    }
}

/// Classify `index` by record count and the presence of its model identity.
pub async fn build_state(index: &dyn VectorIndex) -> Result<BuildState> {
    let count = index.count().await?;
    if count == 0 {
        return Ok(BuildState::Empty);
    }
    Ok(match index.index_info().await? {
        Some(_) => BuildState::Complete(count),
        None => BuildState::Incomplete(count),
    })
}

/// Destructive rebuild: clear the collection, then [`populate`] it.
pub async fn rebuild(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    postings: &[JobPosting],
    batch_size: usize,
    on_batch: impl FnMut(usize, usize) + Send,
) -> Result<PopulateStats> {
    index.clear().await?;
    populate(index, embedder, postings, batch_size, on_batch).await
}
