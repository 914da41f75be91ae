//! Facet aggregation over the top-K matches for a profile.
//!
//! [`aggregate`] embeds the profile text, pulls the `k` nearest postings
//! from the index (no filter), and hands the ranked hits to [`summarize`],
//! a pure function that folds them into a [`FacetSummary`].
//!
//! Matches are processed in index order and never re-sorted, so every facet
//! set lists its values in the order the best-ranked match first mentioned
//! them.

use anyhow::Result;
use tracing::debug;

use crate::document::split_multi_value;
use crate::embedding::{embed_one, EmbeddingProvider};
use crate::models::{metadata_int, metadata_text, EmploymentType, FacetSummary, MatchResult};
use crate::store::{QueryHit, VectorIndex};

/// Default number of leading document characters kept in a match summary.
pub const DEFAULT_SUMMARY_CHARS: usize = 200;

/// Retrieve the `k` nearest postings to `text` and aggregate them.
///
/// An empty index yields an empty summary with `total_matches == 0`.
pub async fn aggregate(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    text: &str,
    k: usize,
    summary_chars: usize,
) -> Result<FacetSummary> {
    let vector = embed_one(embedder, text).await?;
    debug!(dims = vector.len(), "profile embedded");

    let hits = index.query(&vector, k, None).await?;
    debug!(hits = hits.len(), k, "index queried");

    Ok(summarize(&hits, summary_chars))
}

/// Fold ranked hits into a [`FacetSummary`].
pub fn summarize(hits: &[QueryHit], summary_chars: usize) -> FacetSummary {
    let mut summary = FacetSummary::empty();

    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.metadata;
        let role = metadata_text(meta, "role").unwrap_or_default().trim();
        let skills = metadata_text(meta, "skills")
            .map(split_multi_value)
            .unwrap_or_default();

        summary.roles.insert(role);
        summary.skills.extend(&skills);

        for ty in EmploymentType::ALL {
            let key = ty.key();

            let count = metadata_int(meta, &format!("{}_count", key));
            if count > 0 {
                *summary.employment_types.entry(ty).or_insert(0) += count;
            }

            if let Some(v) = metadata_text(meta, &format!("{}_companies", key)) {
                summary.companies.extend(split_multi_value(v));
            }
            if let Some(v) = metadata_text(meta, &format!("{}_portals", key)) {
                summary.portals.extend(split_multi_value(v));
            }
            if let Some(v) = metadata_text(meta, &format!("{}_benefits", key)) {
                summary.benefits.extend(split_multi_value(v));
            }
            if let Some(v) = metadata_text(meta, &format!("{}_qualifications", key)) {
                summary.qualifications.extend(split_multi_value(v));
            }
            if let Some(v) = metadata_text(meta, &format!("{}_salary_range", key)) {
                summary.salary_ranges.insert(v);
            }
        }

        summary.matching_jobs.push(MatchResult {
            rank: i + 1,
            role: role.to_string(),
            role_id: metadata_text(meta, "role_id").unwrap_or_default().to_string(),
            relevance_score: round4(1.0 - hit.distance),
            total_postings: metadata_int(meta, "total_postings"),
            skills,
            summary: excerpt(&hit.document, summary_chars),
        });
    }

    summary.total_matches = hits.len();
    summary
}

/// Round to 4 decimal places.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// First `max_chars` characters of `text`, with `...` appended only when
/// something was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;
    use crate::embedding::HashEmbedder;
    use crate::models::{EmploymentDetails, JobPosting, Metadata};
    use crate::store::memory::InMemoryIndex;
    use crate::store::populate;

    fn data_analyst() -> JobPosting {
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

    fn hit_for(posting: &JobPosting, distance: f64) -> QueryHit {
        let doc = document::build(posting);
        QueryHit {
            id: doc.id,
            document: doc.document,
            metadata: doc.metadata,
            distance,
        }
    }

    #[test]
    fn test_data_analyst_scenario() {
        let summary = summarize(&[hit_for(&data_analyst(), 0.25)], DEFAULT_SUMMARY_CHARS);
        assert_eq!(summary.total_matches, 1);
        assert_eq!(summary.roles.head(10), &["Data Analyst".to_string()]);
        assert_eq!(
            summary.skills.head(10),
            &["SQL".to_string(), "Python".to_string()]
        );
        assert_eq!(summary.employment_count(EmploymentType::FullTime), 5);
        assert_eq!(summary.employment_count(EmploymentType::Intern), 0);
        assert_eq!(
            summary.companies.head(10),
            &["Acme".to_string(), "Globex".to_string()]
        );
        assert!(summary.portals.is_empty());
        assert!(summary.salary_ranges.is_empty());

        let job = &summary.matching_jobs[0];
        assert_eq!(job.rank, 1);
        assert_eq!(job.role_id, "1");
        assert_eq!(job.relevance_score, 0.75);
        assert!(!job.summary.ends_with("..."));
    }

    #[test]
    fn test_empty_hits_yield_empty_summary() {
        let summary = summarize(&[], DEFAULT_SUMMARY_CHARS);
        assert_eq!(summary, FacetSummary::empty());
        assert_eq!(summary.employment_types.len(), 5);
    }

    #[test]
    fn test_no_empty_tokens_in_facets() {
        let mut meta = Metadata::new();
        meta.insert("role".into(), "  ".into());
        meta.insert("skills".into(), ", ,SQL,, ".into());
        meta.insert("contract_companies".into(), ",".into());
        meta.insert("contract_salary_range".into(), "   ".into());
        let hit = QueryHit {
            id: "job_x".into(),
            document: String::new(),
            metadata: meta,
            distance: 0.5,
        };
        let summary = summarize(&[hit], DEFAULT_SUMMARY_CHARS);
        assert!(summary.roles.is_empty());
        assert_eq!(summary.skills.head(10), &["SQL".to_string()]);
        assert!(summary.companies.is_empty());
        assert!(summary.salary_ranges.is_empty());
        for facet in [&summary.skills, &summary.companies, &summary.roles] {
            assert!(facet.iter().all(|v| !v.trim().is_empty()));
        }
    }

    #[test]
    fn test_salary_range_kept_verbatim() {
        let mut posting = data_analyst();
        if let Some(d) = posting.employment.get_mut(&EmploymentType::FullTime) {
            d.salary_range = Some("$60,000 - $80,000".into());
        }
        let summary = summarize(&[hit_for(&posting, 0.1)], DEFAULT_SUMMARY_CHARS);
        assert_eq!(
            summary.salary_ranges.head(5),
            &["$60,000 - $80,000".to_string()]
        );
    }

    #[test]
    fn test_salary_range_stored_value_not_trimmed() {
        let mut meta = Metadata::new();
        meta.insert("role".into(), "Data Analyst".into());
        meta.insert("full_time_salary_range".into(), " $60k - $80k ".into());
        meta.insert("intern_salary_range".into(), "$60k - $80k".into());
        let hit = QueryHit {
            id: "job_1".into(),
            document: String::new(),
            metadata: meta,
            distance: 0.2,
        };
        let summary = summarize(&[hit], DEFAULT_SUMMARY_CHARS);
        assert_eq!(
            summary.salary_ranges.head(5),
            &[" $60k - $80k ".to_string(), "$60k - $80k".to_string()]
        );
    }

    #[test]
    fn test_counts_summed_and_rank_order_kept() {
        let mut other = data_analyst();
        other.role_id = "2".into();
        other.role = Some("BI Developer".into());
        other.skills = vec!["Python".into(), "Tableau".into()];
        let summary = summarize(
            &[hit_for(&data_analyst(), 0.1), hit_for(&other, 0.2)],
            DEFAULT_SUMMARY_CHARS,
        );
        assert_eq!(summary.employment_count(EmploymentType::FullTime), 10);
        let skills: Vec<&str> = summary.skills.iter().collect();
        assert_eq!(skills, vec!["SQL", "Python", "Tableau"]);
        assert_eq!(summary.matching_jobs[1].rank, 2);
        assert_eq!(summary.matching_jobs[1].role, "BI Developer");
    }

    #[test]
    fn test_excerpt_truncation() {
        assert_eq!(excerpt("short", 200), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("abc", 3), "abc");
        assert_eq!(excerpt("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }

    async fn seeded_index(embedder: &HashEmbedder) -> InMemoryIndex {
        let index = InMemoryIndex::new();
        let mut nurse = JobPosting {
            role_id: "2".into(),
            role: Some("Registered Nurse".into()),
            skills: vec!["Patient Care".into(), "Triage".into()],
            ..Default::default()
        };
        nurse.employment.insert(
            EmploymentType::PartTime,
            EmploymentDetails {
                count: Some(3),
                portals: vec!["Indeed".into()],
                ..Default::default()
            },
        );
        let welder = JobPosting {
            role_id: "3".into(),
            role: Some("Welder".into()),
            skills: vec!["TIG".into(), "MIG".into()],
            ..Default::default()
        };
        populate(&index, embedder, &[data_analyst(), nurse, welder], 2, |_, _| {})
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_aggregate_empty_index() {
        let index = InMemoryIndex::new();
        let embedder = HashEmbedder::new(64);
        let summary = aggregate(&index, &embedder, "SQL Python", 20, 200)
            .await
            .unwrap();
        assert_eq!(summary.total_matches, 0);
        assert!(summary.matching_jobs.is_empty());
        assert!(summary.roles.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_relevance_non_increasing() {
        let embedder = HashEmbedder::new(128);
        let index = seeded_index(&embedder).await;
        let summary = aggregate(&index, &embedder, "Data Analyst SQL Python", 20, 200)
            .await
            .unwrap();
        assert_eq!(summary.total_matches, 3);
        assert_eq!(summary.matching_jobs[0].role, "Data Analyst");
        for pair in summary.matching_jobs.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
            assert_eq!(pair[0].rank + 1, pair[1].rank);
        }
    }

    #[tokio::test]
    async fn test_aggregate_no_cutoff_for_unrelated_text() {
        let embedder = HashEmbedder::new(128);
        let index = seeded_index(&embedder).await;
        let summary = aggregate(&index, &embedder, "zzz qqq xyzzy", 2, 200)
            .await
            .unwrap();
        assert_eq!(summary.total_matches, 2);
    }

    #[tokio::test]
    async fn test_aggregate_is_deterministic() {
        let embedder = HashEmbedder::new(128);
        let index = seeded_index(&embedder).await;
        let a = aggregate(&index, &embedder, "patient care triage", 20, 200)
            .await
            .unwrap();
        let b = aggregate(&index, &embedder, "patient care triage", 20, 200)
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
