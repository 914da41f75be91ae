//! LLM-backed answer generator.
//!
//! [`ChatCompletionsGenerator`] calls any OpenAI-compatible
//! `POST {url}/chat/completions` endpoint (OpenAI, Groq, a local vLLM, ...)
//! with the job-assistant prompt. Failures are reported as
//! [`GeneratorError`] and never retried here: the orchestrator falls back to
//! the rule-based responder instead.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use job_match_core::generator::{
    AnswerGenerator, GenerationRequest, GenerationStrategy, GeneratorError,
};

use crate::config::GeneratorConfig;

const SYSTEM_PROMPT: &str = "You are a job search assistant. Based on the user's resume and the \
job information provided, answer the user's query in a helpful and informative way.";

/// Render the user turn of the prompt.
pub fn build_prompt(request: &GenerationRequest) -> String {
    format!(
        "User's Resume:\n{}\n\n\
         Relevant Job Information:\n{}\n\n\
         User's Query: {}\n\n\
         Please provide a comprehensive answer based on the job information and the user's \
         background. Be specific and helpful.\n\n\
         Answer:",
        request.resume_excerpt, request.job_info, request.query
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl ChatCompletionsGenerator {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .context("generator.model required for openai provider")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build generator HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.url.trim_end_matches('/')),
            api_key,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError> {
        let prompt = build_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling chat completions");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout_secs)
                } else {
                    GeneratorError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GeneratorError::Request(format!("{} returned {}: {}", self.endpoint, status, text)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GeneratorError::Malformed(e.to_string()))?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if answer.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(answer)
    }
}

/// Build the generation strategy from config.
///
/// A configured generator whose API key is missing degrades to rule-based
/// answers with a warning instead of failing startup.
pub fn create_strategy(config: &GeneratorConfig) -> Result<GenerationStrategy> {
    match config.provider.as_str() {
        "none" => Ok(GenerationStrategy::RuleBased),
        "openai" => match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => {
                let generator = ChatCompletionsGenerator::new(config, key)?;
                Ok(GenerationStrategy::Llm(Arc::new(generator)))
            }
            _ => {
                warn!(
                    env = %config.api_key_env,
                    "generator API key not set; answering with rule-based responses"
                );
                Ok(GenerationStrategy::RuleBased)
            }
        },
        other => anyhow::bail!("Unknown generator provider: {}", other),
    }
}
