//! CLI entry points for `jobmatch query` and `jobmatch search`, plus the
//! shared orchestrator wiring used by the server.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use job_match_core::aggregate::{excerpt, round4};
use job_match_core::embedding::embed_one;
use job_match_core::models::{metadata_int, metadata_text, MetadataValue};
use job_match_core::orchestrator::{AnswerSource, QueryError, QueryOrchestrator};
use job_match_core::store::{MetadataFilter, VectorIndex};

use crate::config::Config;
use crate::embedding;
use crate::llm;
use crate::migrate;
use crate::resume::{ResumeSource, SqliteResumeStore};
use crate::sqlite_store::SqliteIndex;

/// Wire index, embedder and generation strategy into an orchestrator.
///
/// Logs a warning when the configured embedder differs from the model the
/// collection was built with.
pub async fn build_orchestrator(config: &Config, pool: SqlitePool) -> Result<QueryOrchestrator> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let embedder = embedding::create_provider(&config.embedding)?;
    let index: Arc<dyn VectorIndex> =
        Arc::new(SqliteIndex::new(pool, config.index.collection.clone()));
    let strategy = llm::create_strategy(&config.generator)?;

    let orchestrator = QueryOrchestrator::new(
        index,
        embedder,
        strategy,
        config.retrieval.top_k,
        config.context.clone(),
    );
    orchestrator.verify_model().await?;
    Ok(orchestrator)
}

/// Where the résumé for a CLI query comes from.
pub enum ResumeInput<'a> {
    File(&'a Path),
    User(&'a str),
}

/// `jobmatch query "<question>" --resume FILE | --user ID`.
pub async fn run_query(
    config: &Config,
    question: &str,
    resume: ResumeInput<'_>,
    json: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("query must not be empty");
    }

    let pool = migrate::open_database(&config.index.path).await?;

    let resume_text = match resume {
        ResumeInput::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resume file: {}", path.display()))?,
        ResumeInput::User(user_id) => SqliteResumeStore::new(pool.clone())
            .resume_text(user_id)
            .await?
            .with_context(|| format!("no resume on file for user: {}", user_id))?,
    };
    if resume_text.trim().is_empty() {
        bail!("resume text is empty");
    }

    let orchestrator = build_orchestrator(config, pool.clone()).await?;

    if json {
        let response = orchestrator.process(question, &resume_text).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        pool.close().await;
        return Ok(());
    }

    match orchestrator.try_process(question, &resume_text).await {
        Ok(answer) => {
            println!("{}", answer.response);
            println!();
            println!("  matches: {}", answer.job_data.total_matches);
            let source = match answer.source {
                AnswerSource::Generated => "generator",
                AnswerSource::Fallback => "rule-based",
            };
            println!("  answered by: {}", source);
            let roles: Vec<&str> = answer.job_data.roles.iter().take(5).collect();
            if !roles.is_empty() {
                println!("  top roles: {}", roles.join(", "));
            }
        }
        Err(QueryError::Unexpected(e)) => {
            pool.close().await;
            return Err(e.context("query failed"));
        }
        Err(e) => println!("{}", e.user_message()),
    }

    pool.close().await;
    Ok(())
}

/// Turn `key=value` pairs into a metadata filter. Count columns compare as
/// integers, everything else as text.
pub fn parse_filter(pairs: &[(String, String)]) -> Result<Option<MetadataFilter>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut filter = MetadataFilter::new();
    for (key, value) in pairs {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            bail!("invalid filter '={}': empty key", value);
        }
        let value = value.trim();
        let value = if is_integer_key(&key) {
            let n: i64 = value
                .parse()
                .with_context(|| format!("filter '{}' expects an integer", key))?;
            MetadataValue::Int(n)
        } else {
            MetadataValue::Text(value.to_string())
        };
        filter = filter.eq(key, value);
    }
    Ok(Some(filter))
}

fn is_integer_key(key: &str) -> bool {
    key.ends_with("_count")
        || matches!(key, "total_postings" | "unique_companies" | "unique_portals")
}

/// `jobmatch search "<text>"`: raw ranked matches, no aggregation.
pub async fn run_search(
    config: &Config,
    text: &str,
    limit: Option<usize>,
    filters: &[(String, String)],
) -> Result<()> {
    if text.trim().is_empty() {
        bail!("search text must not be empty");
    }
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let filter = parse_filter(filters)?;
    let limit = limit.unwrap_or(config.retrieval.top_k);

    let provider = embedding::create_provider(&config.embedding)?;
    let pool = migrate::open_database(&config.index.path).await?;
    let index = SqliteIndex::new(pool.clone(), config.index.collection.clone());

    let vector = embed_one(provider.as_ref(), text).await?;
    let hits = index.query(&vector, limit, filter.as_ref()).await?;

    if hits.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let role = metadata_text(&hit.metadata, "role")
            .filter(|r| !r.is_empty())
            .unwrap_or("(untitled)");
        println!(
            "{}. [{:.4}] {}",
            i + 1,
            round4(1.0 - hit.distance),
            role
        );
        println!("    postings: {}", metadata_int(&hit.metadata, "total_postings"));
        if let Some(skills) = metadata_text(&hit.metadata, "skills") {
            println!("    skills: {}", skills);
        }
        println!("    excerpt: \"{}\"", excerpt(&hit.document, 160));
        println!("    id: {}", hit.id);
        println!();
    }

    pool.close().await;
    Ok(())
}
