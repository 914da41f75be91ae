//! TOML configuration.
//!
//! ```toml
//! [index]
//! path = "./data/jobmatch.sqlite"
//! collection = "job_dataset"
//!
//! [embedding]
//! provider = "local"          # disabled | hash | openai | ollama | local
//! model = "all-minilm-l6-v2"
//!
//! [retrieval]
//! top_k = 20
//!
//! [generator]
//! provider = "openai"         # none | openai (any OpenAI-compatible endpoint)
//! model = "llama3-70b-8192"
//! url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use job_match_core::context::ContextLimits;
use job_match_core::orchestrator::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextLimits,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// SQLite database file holding collections and résumés.
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Postings per embed-and-upsert batch during `index build`.
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
}

fn default_collection() -> String {
    "job_dataset".to_string()
}
fn default_index_batch_size() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, or an OpenAI-compatible embeddings host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Extra attempts after a 429, 5xx or network error. Every embedding
    /// call is retried, queries included, so the default is none.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    0
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    #[serde(default = "default_generator_url")]
    pub url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            model: None,
            url: default_generator_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeneratorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "none"
    }
}

fn default_generator_provider() -> String {
    "none".to_string()
}
fn default_generator_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.collection.trim().is_empty() {
        bail!("index.collection must not be empty");
    }
    if config.index.batch_size == 0 {
        bail!("index.batch_size must be > 0");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    let ctx = &config.context;
    if ctx.resume_chars == 0 || ctx.job_info_chars == 0 || ctx.summary_chars == 0 {
        bail!("context.resume_chars, context.job_info_chars and context.summary_chars must be > 0");
    }

    let emb = &config.embedding;
    match emb.provider.as_str() {
        "disabled" | "hash" | "local" => {}
        "openai" | "ollama" => {
            if emb.dims.is_none() || emb.dims == Some(0) {
                bail!("embedding.dims must be > 0 when provider is '{}'", emb.provider);
            }
            if emb.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    emb.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, openai, ollama, or local.",
            other
        ),
    }
    if emb.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if emb.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    let gen = &config.generator;
    match gen.provider.as_str() {
        "none" => {}
        "openai" => {
            if gen.model.is_none() {
                bail!("generator.model must be specified when provider is 'openai'");
            }
        }
        other => bail!(
            "Unknown generator provider: '{}'. Must be none or openai.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&gen.temperature) {
        bail!("generator.temperature must be in [0.0, 2.0]");
    }
    if gen.max_tokens == 0 {
        bail!("generator.max_tokens must be > 0");
    }

    Ok(())
}
