//! Core data models used throughout Job Match.
//!
//! [`JobPosting`] is the source-of-truth row loaded from the dataset.
//! [`IndexedDocument`] is what the vector index stores for it, and
//! [`MatchResult`] / [`FacetSummary`] are produced fresh for every query.
//!
//! Multi-value columns (skills, companies, portals, benefits,
//! qualifications) are carried as `Vec<String>`. They are only joined into
//! a delimited string when a document or metadata record is rendered, and
//! only split again when a query hit is decoded.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Employment categories tracked per posting.
///
/// Declaration order is the order blocks are rendered into the indexed
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    PartTime,
    FullTime,
    Contract,
    Intern,
    Temporary,
}

impl EmploymentType {
    /// All employment types in document order.
    pub const ALL: [EmploymentType; 5] = [
        EmploymentType::PartTime,
        EmploymentType::FullTime,
        EmploymentType::Contract,
        EmploymentType::Intern,
        EmploymentType::Temporary,
    ];

    /// Column prefix as it appears in the source dataset (e.g. `"Part_Time"`).
    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::PartTime => "Part_Time",
            EmploymentType::FullTime => "Full_Time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Intern => "Intern",
            EmploymentType::Temporary => "Temporary",
        }
    }

    /// Lower-case key used in metadata and facet maps (e.g. `"part_time"`).
    pub fn key(self) -> &'static str {
        match self {
            EmploymentType::PartTime => "part_time",
            EmploymentType::FullTime => "full_time",
            EmploymentType::Contract => "contract",
            EmploymentType::Intern => "intern",
            EmploymentType::Temporary => "temporary",
        }
    }

    /// Human-readable name (e.g. `"Part Time"`).
    pub fn display_name(self) -> &'static str {
        match self {
            EmploymentType::PartTime => "Part Time",
            EmploymentType::FullTime => "Full Time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Intern => "Intern",
            EmploymentType::Temporary => "Temporary",
        }
    }
}

/// Per-employment-type attributes of a posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmploymentDetails {
    /// Number of postings of this type. `None` when the source cell is blank.
    pub count: Option<i64>,
    pub salary_range: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub portals: Vec<String>,
}

/// A job-role row from the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub role_id: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub responsibilities: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub employment: BTreeMap<EmploymentType, EmploymentDetails>,
    pub total_postings: Option<i64>,
    pub unique_companies: Option<i64>,
    pub unique_portals: Option<i64>,
    /// Any other source columns, keyed by their lower-cased column name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl JobPosting {
    /// Details for one employment type, if the posting carries any.
    pub fn details(&self, ty: EmploymentType) -> Option<&EmploymentDetails> {
        self.employment.get(&ty)
    }
}

/// A scalar metadata value: the index stores strings and integers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Text(String),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(n) => Some(*n),
            MetadataValue::Text(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Int(n)
    }
}

/// Flat metadata record stored next to each indexed document.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Read a text metadata field, treating integers and missing keys as absent.
pub fn metadata_text<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(MetadataValue::as_text)
}

/// Read an integer metadata field, defaulting to `0`.
pub fn metadata_int(metadata: &Metadata, key: &str) -> i64 {
    metadata.get(key).and_then(MetadataValue::as_int).unwrap_or(0)
}

/// The derived, embeddable form of a [`JobPosting`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedDocument {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

/// One ranked match produced for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 1-based position in ascending-distance order.
    pub rank: usize,
    pub role: String,
    pub role_id: String,
    /// `1 - distance`, rounded to 4 decimal places.
    pub relevance_score: f64,
    pub total_postings: i64,
    pub skills: Vec<String>,
    /// Leading excerpt of the indexed document.
    pub summary: String,
}

/// Insertion-ordered set of non-empty strings.
///
/// Order is first-seen, which for facets means the best-ranked match that
/// mentioned a value puts it first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FacetSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl FacetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Empty or whitespace-only values are ignored.
    /// Returns `true` if the value was newly added.
    pub fn insert(&mut self, value: &str) -> bool {
        if value.trim().is_empty() || self.seen.contains(value) {
            return false;
        }
        self.seen.insert(value.to_string());
        self.items.push(value.to_string());
        true
    }

    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for v in values {
            self.insert(v.as_ref());
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// The first `n` values, in insertion order.
    pub fn head(&self, n: usize) -> &[String] {
        &self.items[..n.min(self.items.len())]
    }
}

impl From<Vec<String>> for FacetSet {
    fn from(values: Vec<String>) -> Self {
        let mut set = FacetSet::new();
        set.extend(values);
        set
    }
}

impl From<FacetSet> for Vec<String> {
    fn from(set: FacetSet) -> Self {
        set.items
    }
}

/// Aggregated view over all matches of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetSummary {
    pub matching_jobs: Vec<MatchResult>,
    pub roles: FacetSet,
    pub skills: FacetSet,
    pub companies: FacetSet,
    pub portals: FacetSet,
    pub benefits: FacetSet,
    pub salary_ranges: FacetSet,
    pub qualifications: FacetSet,
    /// Summed posting counts per employment type. Always holds all five keys.
    pub employment_types: BTreeMap<EmploymentType, i64>,
    pub total_matches: usize,
}

impl FacetSummary {
    /// A summary with no matches: every facet empty, every count zero.
    pub fn empty() -> Self {
        Self {
            employment_types: EmploymentType::ALL.iter().map(|t| (*t, 0)).collect(),
            ..Self::default()
        }
    }

    /// Summed count for one employment type.
    pub fn employment_count(&self, ty: EmploymentType) -> i64 {
        self.employment_types.get(&ty).copied().unwrap_or(0)
    }
}
