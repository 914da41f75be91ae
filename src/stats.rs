//! Collection status overview.
//!
//! Summarizes what is indexed for the configured collection: document
//! count, stored embedding model identity, the dataset digest recorded at
//! build time and whether queries can be served. Used by `jobmatch status`.

use anyhow::Result;

use job_match_core::store::{build_state, BuildState};

use crate::config::Config;
use crate::migrate;
use crate::sqlite_store::{CollectionRow, SqliteIndex};

/// Run the status command: query the database and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let pool = migrate::open_database(&config.index.path).await?;

    let index = SqliteIndex::new(pool.clone(), config.index.collection.clone());
    let state = build_state(&index).await?;
    let row = index.collection_row().await?;
    let resumes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.index.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Job Match Index Status");
    println!("======================");
    println!();
    println!("  Database:    {} ({})", config.index.path.display(), size_kib(db_size));
    println!("  Collection:  {}", index.collection());
    println!();
    println!("  Documents:   {}", state.documents());
    println!("  Ready:       {}", readiness_label(state));

    match row.as_ref().and_then(|r| r.model.as_ref().map(|m| (m, r.dims))) {
        Some((model, Some(dims))) => println!("  Model:       {} ({} dims)", model, dims),
        Some((model, None)) => println!("  Model:       {}", model),
        None => println!("  Model:       (not built)"),
    }
    if let Some(r) = &row {
        println!("  Built:       {}", build_provenance(r, chrono::Utc::now().timestamp()));
    }
    println!("  Resumes:     {}", resumes);
    println!();

    pool.close().await;
    Ok(())
}

fn readiness_label(state: BuildState) -> &'static str {
    match state {
        BuildState::Complete(_) => "yes",
        BuildState::Empty => "no",
        BuildState::Incomplete(_) => "no (unfinished build, run `jobmatch index build`)",
    }
}

/// Database file size in whole KiB, rounded up.
fn size_kib(bytes: u64) -> String {
    format!("{} KiB", bytes.div_ceil(1024))
}

/// When the collection was last written and from which dataset, e.g.
/// `3h ago from sha256:1a2b3c4d5e6f`.
fn build_provenance(row: &CollectionRow, now: i64) -> String {
    let age = (now - row.updated_at).max(0);
    let when = match age {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", age / 60),
        3600..=86_399 => format!("{}h ago", age / 3600),
        _ => format!("{}d ago", age / 86_400),
    };
    match row.dataset_sha256.as_deref() {
        Some(digest) => format!("{} from sha256:{}", when, &digest[..digest.len().min(12)]),
        None => when,
    }
}
