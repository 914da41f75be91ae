//! `jobmatch index build`: populate a collection from the job dataset.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::{info, warn};

use job_match_core::store::{build_state, populate, rebuild, BuildState};

use crate::config::Config;
use crate::dataset;
use crate::embedding;
use crate::migrate;
use crate::sqlite_store::SqliteIndex;

/// Build the configured collection from `dataset_path`.
///
/// A completely built collection is left untouched unless `force_recreate`
/// is set, in which case it is cleared first and fully repopulated. A
/// collection left behind by a build that failed partway is always rebuilt.
pub async fn run_index_build(
    config: &Config,
    dataset_path: &Path,
    force_recreate: bool,
    batch_size_override: Option<usize>,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let batch_size = batch_size_override.unwrap_or(config.index.batch_size);
    if batch_size == 0 {
        bail!("batch size must be > 0");
    }

    let pool = migrate::open_database(&config.index.path).await?;
    let index = SqliteIndex::new(pool.clone(), config.index.collection.clone());

    let state = build_state(&index).await?;
    let clear_first = match state {
        BuildState::Complete(existing) if !force_recreate => {
            println!("index build");
            println!("  collection: {}", index.collection());
            println!("  already populated: {} documents", existing);
            println!("  use --force-recreate to rebuild");
            pool.close().await;
            return Ok(());
        }
        BuildState::Incomplete(existing) if !force_recreate => {
            warn!(
                collection = index.collection(),
                documents = existing,
                "collection holds an unfinished build; rebuilding"
            );
            true
        }
        BuildState::Empty => false,
        _ => true,
    };

    let postings = dataset::load_postings(dataset_path)?;
    let digest = dataset::dataset_digest(dataset_path)?;
    info!(
        postings = postings.len(),
        dataset = %dataset_path.display(),
        model = provider.model_name(),
        "loaded dataset"
    );

    let on_batch = |done: usize, total: usize| {
        info!(done, total, "indexed batch");
    };
    let stats = if clear_first {
        rebuild(&index, provider.as_ref(), &postings, batch_size, on_batch).await?
    } else {
        populate(&index, provider.as_ref(), &postings, batch_size, on_batch).await?
    };
    index.set_dataset_digest(&digest).await?;

    println!("index build");
    println!("  collection: {}", index.collection());
    if clear_first {
        println!(
            "  cleared collection: {} previous documents replaced",
            state.documents()
        );
    }
    println!("  model: {} ({} dims)", provider.model_name(), provider.dims());
    println!("  postings: {}", postings.len());
    println!("  indexed: {}", stats.documents);
    println!("  batches: {}", stats.batches);

    pool.close().await;
    Ok(())
}
