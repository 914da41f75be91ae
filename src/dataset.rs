//! Job dataset loading.
//!
//! Reads postings from CSV (one row per role, the historical column layout)
//! or JSON Lines (one flat object per line, same column names). Column
//! names are matched case-insensitively:
//!
//! | Column | Field |
//! |--------|-------|
//! | `role_id` | [`JobPosting::role_id`] (required) |
//! | `role` | display name |
//! | `skills` | comma-separated |
//! | `job_description`, `responsibilities` | core text |
//! | `{type}_count`, `{type}_salary_range` | per employment type |
//! | `{type}_qualifications`, `_benefits`, `_companies`, `_portals` | comma-separated |
//! | `total_postings`, `unique_companies`, `unique_portals` | ints |
//!
//! `{type}` is one of `part_time`, `full_time`, `contract`, `intern`,
//! `temporary`. Blank cells are treated as absent. Any other column is kept
//! in [`JobPosting::extra`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::warn;

use job_match_core::document::split_multi_value;
use job_match_core::models::{EmploymentDetails, EmploymentType, JobPosting};

/// Load postings from a `.csv`, `.jsonl` or `.ndjson` file.
///
/// Rows without a `role_id` are skipped. When a `role_id` repeats, the
/// later row replaces the earlier one in place.
pub fn load_postings(path: &Path) -> Result<Vec<JobPosting>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "csv" => read_csv(path)?,
        "jsonl" | "ndjson" => read_jsonl(path)?,
        other => bail!(
            "Unsupported dataset format '{}': expected .csv, .jsonl or .ndjson",
            other
        ),
    };

    let mut postings: Vec<JobPosting> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line, row) in rows.into_iter().enumerate() {
        let posting = match posting_from_row(row) {
            Some(p) => p,
            None => {
                warn!(row = line + 1, "skipping row without role_id");
                continue;
            }
        };
        match positions.get(&posting.role_id) {
            Some(&i) => {
                warn!(role_id = %posting.role_id, "duplicate role_id; later row wins");
                postings[i] = posting;
            }
            None => {
                positions.insert(posting.role_id.clone(), postings.len());
                postings.push(posting);
            }
        }
    }

    Ok(postings)
}

/// Hex SHA-256 of the dataset file, recorded with the collection.
pub fn dataset_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

type Row = BTreeMap<String, String>;

fn read_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV record {}", i + 1))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn read_jsonl(path: &Path) -> Result<Vec<Row>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON object on line {}", i + 1))?;
        let row: Row = object
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), json_cell(&v)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_cell)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn posting_from_row(mut row: Row) -> Option<JobPosting> {
    let role_id = take_text(&mut row, "role_id")?;

    let mut posting = JobPosting {
        role_id,
        role: take_text(&mut row, "role"),
        skills: take_list(&mut row, "skills"),
        description: take_text(&mut row, "job_description")
            .or_else(|| take_text(&mut row, "description")),
        responsibilities: take_text(&mut row, "responsibilities"),
        total_postings: take_count(&mut row, "total_postings"),
        unique_companies: take_count(&mut row, "unique_companies"),
        unique_portals: take_count(&mut row, "unique_portals"),
        ..Default::default()
    };

    for ty in EmploymentType::ALL {
        let key = ty.key();
        let details = EmploymentDetails {
            count: take_count(&mut row, &format!("{}_count", key)),
            salary_range: take_text(&mut row, &format!("{}_salary_range", key)),
            qualifications: take_list(&mut row, &format!("{}_qualifications", key)),
            benefits: take_list(&mut row, &format!("{}_benefits", key)),
            companies: take_list(&mut row, &format!("{}_companies", key)),
            portals: take_list(&mut row, &format!("{}_portals", key)),
        };
        if details != EmploymentDetails::default() {
            posting.employment.insert(ty, details);
        }
    }

    posting.extra = row
        .into_iter()
        .filter(|(k, v)| !k.is_empty() && !v.trim().is_empty())
        .collect();

    Some(posting)
}

fn take_text(row: &mut Row, key: &str) -> Option<String> {
    row.remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_list(row: &mut Row, key: &str) -> Vec<String> {
    take_text(row, key)
        .map(|v| split_multi_value(&v))
        .unwrap_or_default()
}

/// Integer cell; accepts `5` and `5.0`. Unparseable values are dropped with
/// a warning.
fn take_count(row: &mut Row, key: &str) -> Option<i64> {
    let raw = take_text(row, key)?;
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f.round() as i64),
        _ => {
            warn!(column = key, value = %raw, "ignoring non-numeric count");
            None
        }
    }
}
