//! Document builder: turns a [`JobPosting`] into its indexed form.
//!
//! Each posting yields a stable id, a dense natural-language document used
//! for embedding, and a flat metadata record used for filtering, display,
//! and facet aggregation.
//!
//! # Document layout
//!
//! ```text
//! Role: Data Analyst | Skills: SQL, Python | Description: ... | Responsibilities: ...
//!   | Full_Time: Full_Time positions available; Salary: ...; Companies: Acme, Globex
//! ```
//!
//! Core fields come first in fixed order (Role, Skills, Description,
//! Responsibilities), followed by one block per employment type with a
//! positive count, in [`EmploymentType::ALL`] order. Fields are separated by
//! `" | "` so later comma splitting never crosses a field boundary. Absent
//! fields are skipped entirely.
//!
//! # Example
//!
//! ```rust
//! use job_match_core::document::{build, document_id};
//! use job_match_core::models::JobPosting;
//!
//! let posting = JobPosting {
//!     role_id: "7".into(),
//!     role: Some("Data Analyst".into()),
//!     skills: vec!["SQL".into(), "Python".into()],
//!     ..Default::default()
//! };
//! let doc = build(&posting);
//! assert_eq!(doc.id, document_id("7"));
//! assert_eq!(doc.document, "Role: Data Analyst | Skills: SQL, Python");
//! ```

use crate::models::{EmploymentType, IndexedDocument, JobPosting, Metadata, MetadataValue};

/// Separator between top-level fields of the document text.
pub const FIELD_SEPARATOR: &str = " | ";

/// Separator between sub-fields of an employment-type block.
const SUBFIELD_SEPARATOR: &str = "; ";

/// Delimiter used when a multi-value field is rendered as text.
const VALUE_DELIMITER: &str = ", ";

/// Metadata keys derived from named posting fields. Extra columns never
/// overwrite these.
const RESERVED_KEYS: &[&str] = &[
    "role_id",
    "role",
    "skills",
    "job_description",
    "responsibilities",
    "total_postings",
    "unique_companies",
    "unique_portals",
];

/// Deterministic index id for a posting.
pub fn document_id(role_id: &str) -> String {
    format!("job_{}", role_id)
}

/// Split a comma-separated multi-value cell into trimmed, non-empty tokens.
///
/// ```rust
/// use job_match_core::document::split_multi_value;
/// assert_eq!(split_multi_value(" SQL, ,Python ,"), vec!["SQL", "Python"]);
/// ```
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a multi-value field back into a single delimited string.
pub fn join_multi_value(values: &[String]) -> String {
    values.join(VALUE_DELIMITER)
}

/// Build the id, document text, and metadata for a posting.
pub fn build(posting: &JobPosting) -> IndexedDocument {
    IndexedDocument {
        id: document_id(&posting.role_id),
        document: build_document(posting),
        metadata: build_metadata(posting),
    }
}

/// Render the embeddable document text.
pub fn build_document(posting: &JobPosting) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(role) = present(&posting.role) {
        parts.push(format!("Role: {}", role));
    }
    if !posting.skills.is_empty() {
        parts.push(format!("Skills: {}", join_multi_value(&posting.skills)));
    }
    if let Some(desc) = present(&posting.description) {
        parts.push(format!("Description: {}", desc));
    }
    if let Some(resp) = present(&posting.responsibilities) {
        parts.push(format!("Responsibilities: {}", resp));
    }

    for ty in EmploymentType::ALL {
        let details = match posting.details(ty) {
            Some(d) => d,
            None => continue,
        };
        match details.count {
            Some(n) if n > 0 => {}
            _ => continue,
        }

        let label = ty.label();
        let mut block = vec![format!("{} positions available", label)];
        if let Some(salary) = present(&details.salary_range) {
            block.push(format!("Salary: {}", salary));
        }
        if !details.qualifications.is_empty() {
            block.push(format!(
                "Qualifications: {}",
                join_multi_value(&details.qualifications)
            ));
        }
        if !details.benefits.is_empty() {
            block.push(format!("Benefits: {}", join_multi_value(&details.benefits)));
        }
        if !details.companies.is_empty() {
            block.push(format!(
                "Companies: {}",
                join_multi_value(&details.companies)
            ));
        }
        if !details.portals.is_empty() {
            block.push(format!("Portals: {}", join_multi_value(&details.portals)));
        }

        parts.push(format!("{}: {}", label, block.join(SUBFIELD_SEPARATOR)));
    }

    parts.join(FIELD_SEPARATOR)
}

/// Build the flat metadata record.
///
/// Integer columns (`total_postings`, `unique_*`, `{type}_count`) always
/// appear and default to `0`. `role` is always present (empty when the
/// source has none). Every other field appears only when the source has a
/// value.
pub fn build_metadata(posting: &JobPosting) -> Metadata {
    let mut meta = Metadata::new();

    meta.insert("role_id".into(), posting.role_id.as_str().into());
    meta.insert(
        "role".into(),
        present(&posting.role).unwrap_or_default().into(),
    );
    meta.insert(
        "total_postings".into(),
        posting.total_postings.unwrap_or(0).into(),
    );
    meta.insert(
        "unique_companies".into(),
        posting.unique_companies.unwrap_or(0).into(),
    );
    meta.insert(
        "unique_portals".into(),
        posting.unique_portals.unwrap_or(0).into(),
    );

    if !posting.skills.is_empty() {
        meta.insert("skills".into(), join_multi_value(&posting.skills).into());
    }
    if let Some(desc) = present(&posting.description) {
        meta.insert("job_description".into(), desc.into());
    }
    if let Some(resp) = present(&posting.responsibilities) {
        meta.insert("responsibilities".into(), resp.into());
    }

    for ty in EmploymentType::ALL {
        let key = ty.key();
        let details = posting.details(ty);

        let count = details.and_then(|d| d.count).unwrap_or(0);
        meta.insert(format!("{}_count", key), MetadataValue::Int(count));

        let details = match details {
            Some(d) => d,
            None => continue,
        };
        if let Some(salary) = present(&details.salary_range) {
            meta.insert(format!("{}_salary_range", key), salary.into());
        }
        insert_multi(&mut meta, format!("{}_qualifications", key), &details.qualifications);
        insert_multi(&mut meta, format!("{}_benefits", key), &details.benefits);
        insert_multi(&mut meta, format!("{}_companies", key), &details.companies);
        insert_multi(&mut meta, format!("{}_portals", key), &details.portals);
    }

    for (column, value) in &posting.extra {
        let key = column.to_lowercase();
        if value.trim().is_empty() || meta.contains_key(&key) || RESERVED_KEYS.contains(&key.as_str())
        {
            continue;
        }
        meta.insert(key, value.as_str().into());
    }

    meta
}

fn insert_multi(meta: &mut Metadata, key: String, values: &[String]) {
    if !values.is_empty() {
        meta.insert(key, join_multi_value(values).into());
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{metadata_int, metadata_text, EmploymentDetails};

    fn analyst() -> JobPosting {
        let mut posting = JobPosting {
            role_id: "1".into(),
            role: Some("Data Analyst".into()),
            skills: vec!["SQL".into(), "Python".into()],
            ..Default::default()
        };
        posting.employment.insert(
            EmploymentType::FullTime,
            EmploymentDetails {
                count: Some(5),
                companies: vec!["Acme".into(), "Globex".into()],
                ..Default::default()
            },
        );
        posting
    }

    #[test]
    fn test_document_id_is_stable() {
        assert_eq!(document_id("42"), "job_42");
        assert_eq!(build(&analyst()).id, build(&analyst()).id);
    }

    #[test]
    fn test_document_core_order_and_blocks() {
        let mut posting = analyst();
        posting.description = Some("Analyze data".into());
        posting.responsibilities = Some("Build dashboards".into());
        let doc = build_document(&posting);
        assert_eq!(
            doc,
            "Role: Data Analyst | Skills: SQL, Python | Description: Analyze data \
             | Responsibilities: Build dashboards \
             | Full_Time: Full_Time positions available; Companies: Acme, Globex"
        );
    }

    #[test]
    fn test_document_skips_zero_and_absent_counts() {
        let mut posting = analyst();
        posting.employment.insert(
            EmploymentType::Intern,
            EmploymentDetails {
                count: Some(0),
                companies: vec!["Initech".into()],
                ..Default::default()
            },
        );
        posting.employment.insert(
            EmploymentType::Contract,
            EmploymentDetails {
                count: None,
                salary_range: Some("$50/hr".into()),
                ..Default::default()
            },
        );
        let doc = build_document(&posting);
        assert!(!doc.contains("Intern"));
        assert!(!doc.contains("Contract"));
        assert!(!doc.contains("Initech"));
    }

    #[test]
    fn test_document_block_order_follows_employment_order() {
        let mut posting = analyst();
        posting.employment.insert(
            EmploymentType::PartTime,
            EmploymentDetails {
                count: Some(2),
                salary_range: Some("$20k-$30k".into()),
                ..Default::default()
            },
        );
        let doc = build_document(&posting);
        let part = doc.find("Part_Time:").unwrap();
        let full = doc.find("Full_Time:").unwrap();
        assert!(part < full);
        assert!(doc.contains("Part_Time: Part_Time positions available; Salary: $20k-$30k"));
    }

    #[test]
    fn test_document_omits_absent_fields() {
        let posting = JobPosting {
            role_id: "9".into(),
            role: Some("   ".into()),
            description: Some("Only a description".into()),
            ..Default::default()
        };
        assert_eq!(build_document(&posting), "Description: Only a description");
    }

    #[test]
    fn test_metadata_defaults() {
        let posting = JobPosting {
            role_id: "3".into(),
            ..Default::default()
        };
        let meta = build_metadata(&posting);
        assert_eq!(metadata_text(&meta, "role_id"), Some("3"));
        assert_eq!(metadata_text(&meta, "role"), Some(""));
        assert_eq!(metadata_int(&meta, "total_postings"), 0);
        for ty in EmploymentType::ALL {
            let key = format!("{}_count", ty.key());
            assert_eq!(meta.get(&key), Some(&MetadataValue::Int(0)), "{}", key);
        }
        assert!(!meta.contains_key("skills"));
        assert!(!meta.contains_key("job_description"));
    }

    #[test]
    fn test_metadata_flattens_employment_fields() {
        let meta = build_metadata(&analyst());
        assert_eq!(metadata_int(&meta, "full_time_count"), 5);
        assert_eq!(metadata_text(&meta, "full_time_companies"), Some("Acme, Globex"));
        assert_eq!(metadata_text(&meta, "skills"), Some("SQL, Python"));
        assert!(!meta.contains_key("full_time_portals"));
        assert!(!meta.contains_key("full_time_salary_range"));
    }

    #[test]
    fn test_metadata_extra_columns_lowercased_without_clobbering() {
        let mut posting = analyst();
        posting.extra.insert("Experience".into(), "2-5 years".into());
        posting.extra.insert("Role".into(), "Impostor".into());
        posting.extra.insert("Empty".into(), " ".into());
        let meta = build_metadata(&posting);
        assert_eq!(metadata_text(&meta, "experience"), Some("2-5 years"));
        assert_eq!(metadata_text(&meta, "role"), Some("Data Analyst"));
        assert!(!meta.contains_key("empty"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build(&analyst());
        let b = build(&analyst());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a.metadata).unwrap(),
            serde_json::to_string(&b.metadata).unwrap()
        );
    }

    #[test]
    fn test_split_multi_value_drops_empty_tokens() {
        assert_eq!(split_multi_value(""), Vec::<String>::new());
        assert_eq!(split_multi_value(",,  ,"), Vec::<String>::new());
        assert_eq!(split_multi_value("Acme , Globex,"), vec!["Acme", "Globex"]);
    }
}
