//! Canonical record shapes
//!
//! Strongly-typed rows produced by the schema normalizer. Raw JSON never
//! flows past the normalization boundary; downstream stages only ever see
//! these types.

use serde::{Deserialize, Serialize};

/// Sentinel for a categorical field that was absent from the raw record.
pub const UNSPECIFIED: &str = "unspecified";

/// One candidate, immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRow {
    pub id: String,
    /// Highest education level, categorical.
    pub education_level: String,
    /// Self-declared professional level, categorical keyword source.
    pub seniority_level: String,
    /// English proficiency, categorical ordinal source.
    pub english_level: String,
    pub location: String,
    /// Declared skills, lowercased tokens.
    pub skills: Vec<String>,
    pub experience_years: f64,
    pub expected_salary: f64,
    /// Free-text resume body, trimmed and whitespace-collapsed.
    pub resume_text: String,
}

/// One open vacancy, immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VacancyRow {
    pub id: String,
    pub title: String,
    pub seniority_level: String,
    pub education_level: String,
    pub english_level: String,
    pub contract_type: String,
    pub location: String,
    pub required_skills: Vec<String>,
    pub offered_salary: f64,
    /// Free-text role description, trimmed and whitespace-collapsed.
    pub description: String,
}

/// One historical hiring outcome linking a candidate to a vacancy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    pub candidate_id: String,
    pub vacancy_id: String,
    /// Terminal pipeline status, mapped to a label by [`label_for_status`].
    pub status: String,
}

/// Statuses that count as a successful match.
const MATCHED_STATUSES: [&str; 4] = ["hired", "hired-via-search", "offer-accepted", "approved"];

/// Statuses that count as a confirmed non-match.
const UNMATCHED_STATUSES: [&str; 5] = [
    "rejected-by-client",
    "rejected-by-hr",
    "rejected-by-requester",
    "withdrawn",
    "declined",
];

/// Map a terminal outcome status to a binary label.
///
/// Returns `None` for statuses outside the known terminal set (e.g. a
/// candidate still in flight); those outcomes are dropped from training.
pub fn label_for_status(status: &str) -> Option<u8> {
    let status = status.trim().to_lowercase();
    if MATCHED_STATUSES.contains(&status.as_str()) {
        Some(1)
    } else if UNMATCHED_STATUSES.contains(&status.as_str()) {
        Some(0)
    } else {
        None
    }
}

/// Ordinal seniority ladder, lowest to highest.
const SENIORITY_LADDER: [(&str, f64); 8] = [
    ("intern", 0.0),
    ("trainee", 0.0),
    ("assistant", 1.0),
    ("junior", 2.0),
    ("mid", 3.0),
    ("senior", 4.0),
    ("lead", 5.0),
    ("director", 7.0),
];

/// Highest rank on the seniority ladder, used to normalize gaps.
pub const MAX_SENIORITY_RANK: f64 = 7.0;

/// Map a seniority level (or a title containing one) to an ordinal rank.
/// Unknown levels land at 0.0, matching the original keyword mapping where
/// unrecognized titles fall into the lowest bucket.
pub fn seniority_rank(level: &str) -> f64 {
    let level = level.to_lowercase();
    if level.contains("manager") || level.contains("head") {
        return 6.0;
    }
    for (keyword, rank) in SENIORITY_LADDER {
        if level.contains(keyword) {
            return rank;
        }
    }
    0.0
}

/// Map a language proficiency level to an ordinal rank in [0, 4].
pub fn language_rank(level: &str) -> f64 {
    match level.trim().to_lowercase().as_str() {
        "basic" => 1.0,
        "intermediate" => 2.0,
        "advanced" | "technical" => 3.0,
        "fluent" | "native" => 4.0,
        _ => 0.0,
    }
}
