//! Answer generation strategies.
//!
//! An [`AnswerGenerator`] turns (résumé excerpt, formatted job info, query)
//! into prose. It is a black box that may fail; the orchestrator falls back
//! to the deterministic [`RuleBasedResponder`] whenever it does.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FacetSet, FacetSummary};

/// Failure modes of an external answer generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Request(String),
    #[error("generator timed out after {0}s")]
    Timeout(u64),
    #[error("generator returned a malformed response: {0}")]
    Malformed(String),
    #[error("generator returned an empty answer")]
    Empty,
}

/// Inputs for one generation call. Both text fields are already bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub resume_excerpt: String,
    pub job_info: String,
    pub query: String,
}

/// An external (typically LLM-backed) answer generator.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Short identifier for logs (e.g. the model name).
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError>;
}

/// How the orchestrator produces answer text.
#[derive(Clone)]
pub enum GenerationStrategy {
    /// Try the generator; fall back to rule-based on any failure.
    Llm(Arc<dyn AnswerGenerator>),
    /// Rule-based responses only.
    RuleBased,
}

impl GenerationStrategy {
    pub fn describe(&self) -> String {
        match self {
            GenerationStrategy::Llm(g) => format!("llm ({})", g.name()),
            GenerationStrategy::RuleBased => "rule-based".to_string(),
        }
    }
}

impl std::fmt::Debug for GenerationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Which facet a keyword category answers from.
#[derive(Debug, Clone, Copy)]
enum Topic {
    Roles,
    Portals,
    Benefits,
    Salaries,
    Skills,
    Companies,
}

/// Keyword categories in priority order.
const CATEGORIES: &[(Topic, &[&str])] = &[
    (Topic::Roles, &["role", "position", "job", "eligible", "apply"]),
    (Topic::Portals, &["portal", "website", "apply", "where"]),
    (Topic::Benefits, &["benefit", "perk", "advantage"]),
    (Topic::Salaries, &["salary", "pay", "wage", "compensation"]),
    (Topic::Skills, &["skill", "requirement", "qualification"]),
    (Topic::Companies, &["company", "employer", "organization"]),
];

/// Deterministic keyword-driven responder.
///
/// The first category whose keywords appear in the (lower-cased) query and
/// whose facet is non-empty wins. Keywords match as substrings, so
/// "salaries" does not hit `salary` but "jobs" hits `job`. With no winning
/// category the answer is a generic summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedResponder;

impl RuleBasedResponder {
    pub fn respond(&self, query: &str, summary: &FacetSummary) -> String {
        let query = query.to_lowercase();

        for (topic, keywords) in CATEGORIES {
            if !keywords.iter().any(|k| query.contains(k)) {
                continue;
            }
            let facet = facet_for(summary, *topic);
            if facet.is_empty() {
                continue;
            }
            return match topic {
                Topic::Roles => format!(
                    "Based on your resume, you are eligible for these roles: {}. \
                     I found {} matching job opportunities.",
                    list(facet, 10),
                    summary.total_matches
                ),
                Topic::Portals => {
                    format!("You can apply for jobs on these portals: {}.", list(facet, 10))
                }
                Topic::Benefits => format!(
                    "Common benefits offered for your profile include: {}.",
                    list(facet, 10)
                ),
                Topic::Salaries => format!(
                    "Based on matching jobs, expected salary ranges are: {}.",
                    list(facet, 5)
                ),
                Topic::Skills => format!(
                    "Key skills in demand for your profile: {}.",
                    list(facet, 15)
                ),
                Topic::Companies => {
                    format!("Companies hiring for your profile: {}.", list(facet, 10))
                }
            };
        }

        format!(
            "I found {} matching opportunities for your profile. \
             You're eligible for roles like: {}. \
             Would you like specific information about roles, salaries, benefits, or job portals?",
            summary.total_matches,
            list(&summary.roles, 5)
        )
    }
}

fn facet_for(summary: &FacetSummary, topic: Topic) -> &FacetSet {
    match topic {
        Topic::Roles => &summary.roles,
        Topic::Portals => &summary.portals,
        Topic::Benefits => &summary.benefits,
        Topic::Salaries => &summary.salary_ranges,
        Topic::Skills => &summary.skills,
        Topic::Companies => &summary.companies,
    }
}

fn list(set: &FacetSet, n: usize) -> String {
    set.head(n).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> FacetSummary {
        let mut s = FacetSummary::empty();
        s.roles.extend(["Data Analyst", "BI Developer"]);
        s.skills.extend(["SQL", "Python"]);
        s.companies.extend(["Acme"]);
        s.total_matches = 2;
        s
    }

    #[test]
    fn test_roles_category() {
        let answer = RuleBasedResponder.respond("Which ROLES fit me?", &summary());
        assert_eq!(
            answer,
            "Based on your resume, you are eligible for these roles: Data Analyst, BI Developer. \
             I found 2 matching job opportunities."
        );
    }

    #[test]
    fn test_apply_prefers_roles_over_portals() {
        let mut s = summary();
        s.portals.insert("LinkedIn");
        let answer = RuleBasedResponder.respond("where can I apply?", &s);
        assert!(answer.starts_with("Based on your resume"));
    }

    #[test]
    fn test_falls_through_empty_category() {
        let mut s = summary();
        s.roles = FacetSet::new();
        s.portals.insert("LinkedIn");
        let answer = RuleBasedResponder.respond("where can I apply?", &s);
        assert_eq!(answer, "You can apply for jobs on these portals: LinkedIn.");
    }

    #[test]
    fn test_salary_with_no_ranges_gives_generic_summary() {
        let answer = RuleBasedResponder.respond("What is the salary range?", &summary());
        assert_eq!(
            answer,
            "I found 2 matching opportunities for your profile. \
             You're eligible for roles like: Data Analyst, BI Developer. \
             Would you like specific information about roles, salaries, benefits, or job portals?"
        );
    }

    #[test]
    fn test_skills_and_companies() {
        assert_eq!(
            RuleBasedResponder.respond("what skills do I need", &summary()),
            "Key skills in demand for your profile: SQL, Python."
        );
        assert_eq!(
            RuleBasedResponder.respond("which employer is hiring", &summary()),
            "Companies hiring for your profile: Acme."
        );
    }

    #[test]
    fn test_limits_applied() {
        let mut s = summary();
        for i in 0..20 {
            s.salary_ranges.insert(&format!("${}k", i));
        }
        let answer = RuleBasedResponder.respond("pay?", &s);
        assert_eq!(
            answer,
            "Based on matching jobs, expected salary ranges are: $0k, $1k, $2k, $3k, $4k."
        );
    }

    #[test]
    fn test_generator_error_display() {
        assert_eq!(
            GeneratorError::Timeout(30).to_string(),
            "generator timed out after 30s"
        );
    }
}
