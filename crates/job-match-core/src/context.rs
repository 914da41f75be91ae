//! Bounded text context handed to the answer generator.
//!
//! [`format_job_info`] renders a [`FacetSummary`] as a sectioned plain-text
//! block; [`truncate_chars`] bounds it and the résumé excerpt. All limits
//! come from [`ContextLimits`].

use serde::{Deserialize, Serialize};

use crate::models::{EmploymentType, FacetSet, FacetSummary};

/// Size limits applied when building generator context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextLimits {
    /// Max résumé characters passed to the generator.
    pub resume_chars: usize,
    /// Max characters of the formatted job info.
    pub job_info_chars: usize,
    /// Max document characters kept in each match summary.
    pub summary_chars: usize,
    /// Number of sample jobs listed in the job info.
    pub sample_jobs: usize,
    pub sample_skills_chars: usize,
    pub max_roles: usize,
    pub max_skills: usize,
    pub max_companies: usize,
    pub max_portals: usize,
    pub max_benefits: usize,
    pub max_salary_ranges: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            resume_chars: 1000,
            job_info_chars: 1500,
            summary_chars: 200,
            sample_jobs: 5,
            sample_skills_chars: 100,
            max_roles: 10,
            max_skills: 15,
            max_companies: 10,
            max_portals: 10,
            max_benefits: 10,
            max_salary_ranges: 5,
        }
    }
}

/// First `max_chars` characters of `text`. Never splits a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Render the facet summary as generator context, before length bounding.
///
/// ```text
/// MATCHING JOBS:
/// - Data Analyst (Relevance: 0.75, Postings: 5)
///   Skills: SQL, Python...
///
/// ELIGIBLE ROLES: Data Analyst
/// ...
/// EMPLOYMENT TYPES: Full Time: 5
/// ```
pub fn format_job_info(summary: &FacetSummary, limits: &ContextLimits) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !summary.matching_jobs.is_empty() {
        lines.push("MATCHING JOBS:".to_string());
        for job in summary.matching_jobs.iter().take(limits.sample_jobs) {
            lines.push(format!(
                "- {} (Relevance: {}, Postings: {})",
                job.role, job.relevance_score, job.total_postings
            ));
            if !job.skills.is_empty() {
                let skills = job.skills.join(", ");
                lines.push(format!(
                    "  Skills: {}...",
                    truncate_chars(&skills, limits.sample_skills_chars)
                ));
            }
        }
    }

    push_section(&mut lines, "ELIGIBLE ROLES", &summary.roles, limits.max_roles);
    push_section(&mut lines, "REQUIRED SKILLS", &summary.skills, limits.max_skills);
    push_section(
        &mut lines,
        "HIRING COMPANIES",
        &summary.companies,
        limits.max_companies,
    );
    push_section(&mut lines, "JOB PORTALS", &summary.portals, limits.max_portals);
    push_section(
        &mut lines,
        "COMMON BENEFITS",
        &summary.benefits,
        limits.max_benefits,
    );
    push_section(
        &mut lines,
        "SALARY RANGES",
        &summary.salary_ranges,
        limits.max_salary_ranges,
    );

    let employment: Vec<String> = EmploymentType::ALL
        .iter()
        .filter_map(|ty| {
            let count = summary.employment_count(*ty);
            (count > 0).then(|| format!("{}: {}", ty.display_name(), count))
        })
        .collect();
    if !employment.is_empty() {
        lines.push(format!("\nEMPLOYMENT TYPES: {}", employment.join(", ")));
    }

    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, title: &str, set: &FacetSet, max: usize) {
    if !set.is_empty() {
        lines.push(format!("\n{}: {}", title, set.head(max).join(", ")));
    }
}
