//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the deterministic offline [`HashEmbedder`], and pure helper
//! functions for vector serialization and similarity computation.
//!
//! Network- and model-backed providers (OpenAI, Ollama, fastembed) live in
//! the `job-match` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// The same provider (same model and dims) must be used to build the index
/// and to embed queries against it. The model identity is persisted with
/// the collection so a mismatch can be detected later.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts. Output order matches input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let mut vectors = provider.embed(&[text.to_string()]).await?;
    match vectors.pop() {
        Some(v) if vectors.is_empty() => Ok(v),
        _ => anyhow::bail!(
            "embedding provider '{}' returned an unexpected number of vectors",
            provider.model_name()
        ),
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Feature-hashing embedder using FNV-1a.
///
/// Lower-cased alphanumeric tokens are hashed into `dims` buckets; the top
/// bit of the hash picks the sign. The result is L2-normalized. No model
/// files, no network, fully deterministic across runs and platforms.
pub struct HashEmbedder {
    dims: usize,
    model: String,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            model: format!("fnv1a-hash-{}", dims.max(1)),
        }
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dims as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use job_match_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different
/// lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance, `1 - cosine_similarity`, in `[0.0, 2.0]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - f64::from(cosine_similarity(a, b))
}
