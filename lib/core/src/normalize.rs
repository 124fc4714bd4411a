//! Schema normalization boundary
//!
//! Validates untyped JSON records and flattens them into canonical rows.
//! Every expected field comes out present: absent structured fields are
//! filled with an explicit sentinel, absent free text becomes the empty
//! string. A required field that is missing or of the wrong primitive type
//! is a non-retryable [`Error::Schema`] naming the offending field.

use crate::error::{Error, Result};
use crate::record::{CandidateRow, OutcomeRecord, VacancyRow, UNSPECIFIED};
use serde_json::{Map, Value};

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::schema(what, "expected a JSON object"))
}

/// Extract the record identifier. Accepts a string or an integer; anything
/// else (including absence) is a schema defect.
fn required_id(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(Error::schema(field, "expected a string or integer id")),
        None => Err(Error::schema(field, "required field is missing")),
    }
}

/// Optional categorical field: lowercased, trimmed, sentinel when absent
/// or empty. A present non-string value is a schema defect.
fn opt_categorical(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => {
            let s = s.trim().to_lowercase();
            if s.is_empty() {
                Ok(UNSPECIFIED.to_string())
            } else {
                Ok(s)
            }
        }
        Some(Value::Null) | None => Ok(UNSPECIFIED.to_string()),
        Some(_) => Err(Error::schema(field, "expected a string")),
    }
}

/// Optional free-text field: trimmed and whitespace-collapsed, empty when
/// absent.
fn opt_text(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(normalize_text(s)),
        Some(Value::Null) | None => Ok(String::new()),
        Some(_) => Err(Error::schema(field, "expected a string")),
    }
}

/// Optional numeric field. Accepts numbers and numeric strings (salary
/// exports routinely quote their figures); absent means 0.0.
fn opt_number(obj: &Map<String, Value>, field: &str) -> Result<f64> {
    match obj.get(field) {
        Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => {
            let cleaned = s.trim().replace(',', ".");
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| Error::schema(field, "expected a numeric value"))
        }
        Some(Value::Null) | None => Ok(0.0),
        Some(_) => Err(Error::schema(field, "expected a number")),
    }
}

/// Optional skill list. Accepts an array of strings or one comma-separated
/// string; tokens are lowercased, trimmed, deduplicated, and sorted so the
/// set is order-independent.
fn opt_skills(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>> {
    let mut skills: Vec<String> = match obj.get(field) {
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => return Err(Error::schema(field, "expected an array of strings")),
                }
            }
            out
        }
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => Err(Error::schema(field, "expected an array of strings"))?,
    };

    for skill in &mut skills {
        *skill = skill.trim().to_lowercase();
    }
    skills.retain(|s| !s.is_empty());
    skills.sort();
    skills.dedup();
    Ok(skills)
}

/// Normalize one raw candidate record.
pub fn candidate_from_json(value: &Value) -> Result<CandidateRow> {
    let obj = as_object(value, "candidate")?;
    Ok(CandidateRow {
        id: required_id(obj, "id")?,
        education_level: opt_categorical(obj, "education_level")?,
        seniority_level: opt_categorical(obj, "seniority_level")?,
        english_level: opt_categorical(obj, "english_level")?,
        location: opt_categorical(obj, "location")?,
        skills: opt_skills(obj, "skills")?,
        experience_years: opt_number(obj, "experience_years")?,
        expected_salary: opt_number(obj, "expected_salary")?,
        resume_text: opt_text(obj, "resume_text")?,
    })
}

/// Normalize one raw vacancy record.
pub fn vacancy_from_json(value: &Value) -> Result<VacancyRow> {
    let obj = as_object(value, "vacancy")?;
    Ok(VacancyRow {
        id: required_id(obj, "id")?,
        title: opt_text(obj, "title")?,
        seniority_level: opt_categorical(obj, "seniority_level")?,
        education_level: opt_categorical(obj, "education_level")?,
        english_level: opt_categorical(obj, "english_level")?,
        contract_type: opt_categorical(obj, "contract_type")?,
        location: opt_categorical(obj, "location")?,
        required_skills: opt_skills(obj, "required_skills")?,
        offered_salary: opt_number(obj, "offered_salary")?,
        description: opt_text(obj, "description")?,
    })
}

/// Normalize one raw historical outcome record.
pub fn outcome_from_json(value: &Value) -> Result<OutcomeRecord> {
    let obj = as_object(value, "outcome")?;
    let status = match obj.get("status") {
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(_) => return Err(Error::schema("status", "expected a string")),
        None => return Err(Error::schema("status", "required field is missing")),
    };
    Ok(OutcomeRecord {
        candidate_id: required_id(obj, "candidate_id")?,
        vacancy_id: required_id(obj, "vacancy_id")?,
        status,
    })
}
