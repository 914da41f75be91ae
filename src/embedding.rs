//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are not configured.
//! - **`hash`**: the core [`HashEmbedder`]; deterministic, offline, no model files.
//! - **[`OpenAIProvider`]**: calls an OpenAI-compatible `/embeddings` endpoint with batching, retry, and backoff.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalProvider`**: runs models locally via fastembed; no network calls after model download.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the appropriate provider based
//! on the configuration:
//!
//! ```rust
//! # use job_match::config::EmbeddingConfig;
//! # use job_match::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use job_match_core::embedding::{EmbeddingProvider, HashEmbedder};

use crate::config::EmbeddingConfig;

/// Default model for the `local` provider; the same sentence-transformer
/// the job dataset has historically been embedded with.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.")
    }
}

// ============ Shared HTTP retry loop ============

async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!(%status, attempt, "{} embedding request failed, retrying", label);
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                // Client error (not 429): give up
                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                warn!(error = %e, attempt, "{} connection error, retrying", label);
                last_err = Some(anyhow!("{} connection error ({}): {}", label, url, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} embedding failed after retries", label)))
}

fn http_client(config: &EmbeddingConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Decode embedding arrays, rejecting non-numeric components and vectors
/// whose length differs from `dims`.
fn parse_vectors(items: &[serde_json::Value], dims: usize, label: &str) -> Result<Vec<Vec<f32>>> {
    items
        .iter()
        .enumerate()
        .map(|(i, embedding)| {
            let arr = embedding
                .as_array()
                .ok_or_else(|| anyhow!("Invalid {} response: embedding is not an array", label))?;
            if arr.len() != dims {
                bail!(
                    "Invalid {} response: embedding {} has {} dimensions, expected {}",
                    label,
                    i,
                    arr.len(),
                    dims
                );
            }
            arr.iter()
                .map(|v| {
                    v.as_f64().map(|x| x as f32).ok_or_else(|| {
                        anyhow!(
                            "Invalid {} response: non-numeric component in embedding {}",
                            label,
                            i
                        )
                    })
                })
                .collect::<Result<Vec<f32>>>()
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI embeddings API (or a compatible host).
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let base = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            model,
            dims,
            url: format!("{}/embeddings", base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_with_retry(
            &self.client,
            &self.url,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json, self.dims)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value, dims: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut items: Vec<(u64, serde_json::Value)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(pos as u64);
        let embedding = item
            .get("embedding")
            .cloned()
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        items.push((index, embedding));
    }
    items.sort_by_key(|(index, _)| *index);

    let embeddings: Vec<serde_json::Value> = items.into_iter().map(|(_, e)| e).collect();
    parse_vectors(&embeddings, dims, "OpenAI")
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for Ollama provider"))?;
        let base = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url: format!("{}/api/embed", base.trim_end_matches('/')),
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json =
            post_with_retry(&self.client, &self.url, None, &body, self.max_retries, "Ollama")
                .await?;
        parse_ollama_response(&json, self.dims)
    }
}

fn parse_ollama_response(json: &serde_json::Value, dims: usize) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;
    parse_vectors(embeddings, dims, "Ollama")
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for local inference via fastembed.
///
/// The model is downloaded on first use from Hugging Face, cached, and kept
/// loaded for the life of the provider. Inference runs on the blocking pool.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        config_to_fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let fastembed_model = config_to_fastembed_model(&self.model_name)?;
        let slot = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| anyhow!("local embedding model lock poisoned"))?;
            if guard.is_none() {
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
                )
                .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
                *guard = Some(model);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow!("local embedding model not initialized"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1.5" => 768,
        _ => 384,
    });

    (model_name, dims)
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5",
            other
        ),
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"hash"` | [`HashEmbedder`] (`dims` defaults to 384) |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (requires the `local-embeddings` feature) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dims.unwrap_or(384)))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_response_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vectors = parse_openai_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        let json = serde_json::json!({ "error": "nope" });
        assert!(parse_openai_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4]] });
        let vectors = parse_ollama_response(&json, 2).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!((vectors[1][0] - 0.3).abs() < 1e-6);

        let bad = serde_json::json!({ "embeddings": [1.0] });
        assert!(parse_ollama_response(&bad, 2).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_component() {
        let json = serde_json::json!({ "embeddings": [[0.1, "0.2"]] });
        let err = parse_ollama_response(&json, 2).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));

        let json = serde_json::json!({
            "data": [{ "index": 0, "embedding": [0.1, null] }]
        });
        assert!(parse_openai_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_dimensions() {
        let json = serde_json::json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4, 0.5]] });
        let err = parse_ollama_response(&json, 2).unwrap_err();
        assert!(err.to_string().contains("3 dimensions, expected 2"));

        let json = serde_json::json!({
            "data": [{ "index": 0, "embedding": [0.1, 0.2] }]
        });
        assert!(parse_openai_response(&json, 1536).is_err());
    }

    #[tokio::test]
    async fn test_post_without_retries_makes_one_attempt() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let body = serde_json::json!({ "input": ["x"] });
        let started = std::time::Instant::now();
        let result =
            post_with_retry(&client, "http://127.0.0.1:1/api/embed", None, &body, 0, "Ollama")
                .await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_create_hash_provider() {
        let config = EmbeddingConfig {
            provider: "hash".into(),
            dims: Some(64),
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dims(), 64);
        assert_eq!(provider.model_name(), "fnv1a-hash-64");
    }

    #[test]
    fn test_resolve_local_model_defaults() {
        let (name, dims) = resolve_local_model(&EmbeddingConfig::default());
        assert_eq!(name, DEFAULT_LOCAL_MODEL);
        assert_eq!(dims, 384);
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let provider = DisabledProvider;
        assert!(provider.embed(&["x".to_string()]).await.is_err());
    }
}
