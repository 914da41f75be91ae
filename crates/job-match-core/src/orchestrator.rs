//! Query orchestration: retrieve, aggregate, format, generate.
//!
//! ```text
//! RECEIVED ─▶ EMBEDDED ─▶ RETRIEVED ─┬─▶ NO_MATCH
//!                                    └─▶ AGGREGATED ─▶ FORMATTED ─┬─▶ GENERATED ─▶ DONE
//!                                                                 └─▶ FALLBACK  ─▶ DONE
//! ```
//!
//! The orchestrator holds explicit handles to the index, the embedder and
//! the generation strategy; there is no process-wide state. One instance is
//! shared behind an `Arc` by every concurrent request.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::context::{format_job_info, truncate_chars, ContextLimits};
use crate::embedding::EmbeddingProvider;
use crate::generator::{GenerationRequest, GenerationStrategy, RuleBasedResponder};
use crate::models::FacetSummary;
use crate::store::{build_state, VectorIndex};

/// Default number of postings retrieved per query.
pub const DEFAULT_TOP_K: usize = 20;

pub const NO_MATCH_MESSAGE: &str = "No matching jobs found for your profile.";
pub const NOT_READY_MESSAGE: &str = "The job index is not ready yet. Please try again later.";
pub const UNEXPECTED_MESSAGE: &str =
    "Something went wrong while processing your query. Please try again.";

/// Typed failure outcomes of [`QueryOrchestrator::try_process`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// The collection is empty or its last build did not finish.
    #[error("job index is not ready")]
    NotReady,
    /// Retrieval returned zero matches.
    #[error("no matching jobs found")]
    NoMatch,
    /// Embedding or index I/O failed.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl QueryError {
    /// Message safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::NotReady => NOT_READY_MESSAGE,
            QueryError::NoMatch => NO_MATCH_MESSAGE,
            QueryError::Unexpected(_) => UNEXPECTED_MESSAGE,
        }
    }
}

/// Whether the index can serve queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub document_count: i64,
}

/// Which path produced the answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Generated,
    Fallback,
}

/// A successful query outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub response: String,
    pub source: AnswerSource,
    pub job_data: FacetSummary,
}

/// The user-facing result of [`QueryOrchestrator::process`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_data: Option<FacetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResponse {
    fn success(answer: Answer) -> Self {
        Self {
            success: true,
            response: Some(answer.response),
            total_matches: Some(answer.job_data.total_matches),
            job_data: Some(answer.job_data),
            message: None,
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            response: None,
            total_matches: None,
            job_data: None,
            message: Some(message.to_string()),
        }
    }
}

/// Remove a leading `Answer:` label and surrounding whitespace.
pub fn strip_answer_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("Answer:") {
        Some(rest) => rest.trim(),
        None => trimmed,
    }
}

pub struct QueryOrchestrator {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    strategy: GenerationStrategy,
    responder: RuleBasedResponder,
    top_k: usize,
    limits: ContextLimits,
}

impl QueryOrchestrator {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        strategy: GenerationStrategy,
        top_k: usize,
        limits: ContextLimits,
    ) -> Self {
        Self {
            index,
            embedder,
            strategy,
            responder: RuleBasedResponder,
            top_k: top_k.max(1),
            limits,
        }
    }

    pub fn strategy(&self) -> &GenerationStrategy {
        &self.strategy
    }

    /// Ready once a build has finished writing a non-empty collection.
    pub async fn readiness(&self) -> anyhow::Result<Readiness> {
        let state = build_state(self.index.as_ref()).await?;
        Ok(Readiness {
            ready: state.is_complete(),
            document_count: state.documents(),
        })
    }

    /// Compare the embedder with the model identity stored in the index.
    ///
    /// Returns `false` and logs a warning on mismatch. Queries still run:
    /// distances are simply meaningless until the index is rebuilt.
    pub async fn verify_model(&self) -> anyhow::Result<bool> {
        let info = match self.index.index_info().await? {
            Some(info) => info,
            None => return Ok(true),
        };
        let matches =
            info.model == self.embedder.model_name() && info.dims == self.embedder.dims();
        if !matches {
            warn!(
                index_model = %info.model,
                index_dims = info.dims,
                embedder_model = %self.embedder.model_name(),
                embedder_dims = self.embedder.dims(),
                "embedding model differs from the one the index was built with; rebuild the index"
            );
        }
        Ok(matches)
    }

    /// Run a query, returning typed failures.
    pub async fn try_process(&self, query: &str, resume_text: &str) -> Result<Answer, QueryError> {
        debug!(query_chars = query.chars().count(), "query received");

        if !build_state(self.index.as_ref()).await?.is_complete() {
            return Err(QueryError::NotReady);
        }

        let job_data = aggregate(
            self.index.as_ref(),
            self.embedder.as_ref(),
            resume_text,
            self.top_k,
            self.limits.summary_chars,
        )
        .await?;

        if job_data.total_matches == 0 {
            debug!("no matches");
            return Err(QueryError::NoMatch);
        }
        debug!(total_matches = job_data.total_matches, "aggregated");

        let job_info = format_job_info(&job_data, &self.limits);
        let request = GenerationRequest {
            resume_excerpt: truncate_chars(resume_text, self.limits.resume_chars).to_string(),
            job_info: truncate_chars(&job_info, self.limits.job_info_chars).to_string(),
            query: query.to_string(),
        };
        debug!(job_info_chars = request.job_info.chars().count(), "context formatted");

        let (response, source) = match &self.strategy {
            GenerationStrategy::Llm(generator) => match generator.generate(&request).await {
                Ok(text) => {
                    let text = strip_answer_prefix(&text);
                    if text.is_empty() {
                        warn!(generator = generator.name(), "empty answer, using fallback");
                        (self.fallback(query, &job_data), AnswerSource::Fallback)
                    } else {
                        (text.to_string(), AnswerSource::Generated)
                    }
                }
                Err(e) => {
                    warn!(generator = generator.name(), error = %e, "generation failed, using fallback");
                    (self.fallback(query, &job_data), AnswerSource::Fallback)
                }
            },
            GenerationStrategy::RuleBased => {
                (self.fallback(query, &job_data), AnswerSource::Fallback)
            }
        };

        info!(
            total_matches = job_data.total_matches,
            source = ?source,
            "query answered"
        );

        Ok(Answer {
            response,
            source,
            job_data,
        })
    }

    /// Run a query and flatten the outcome into a user-safe response.
    pub async fn process(&self, query: &str, resume_text: &str) -> QueryResponse {
        match self.try_process(query, resume_text).await {
            Ok(answer) => QueryResponse::success(answer),
            Err(QueryError::Unexpected(e)) => {
                tracing::error!(error = %e, "query failed");
                QueryResponse::failure(UNEXPECTED_MESSAGE)
            }
            Err(e) => QueryResponse::failure(e.user_message()),
        }
    }

    fn fallback(&self, query: &str, job_data: &FacetSummary) -> String {
        self.responder.respond(query, job_data)
    }
}
