//! Feature assembly
//!
//! Turns one (candidate, vacancy) pair into a feature vector under a frozen
//! [`FeatureSchema`]. The same module owns schema fitting so that the field
//! accessors used at fit time and at assembly time are a single source of
//! truth; the two can never drift apart.
//!
//! Block order within the vector: categorical one-hots (field name order),
//! numeric features (field name order), cross features (declared order
//! below), then the embeddings of `resume_text` and `vacancy_description`.

use crate::embedder::TextEmbedder;
use crate::schema::{
    BlockKind, EmbedderConfig, FeatureBlock, FeatureSchema, NumericStats, Vocabulary,
    SCHEMA_VERSION,
};
use fitscore_core::{
    language_rank, seniority_rank, CandidateRow, Error, Result, VacancyRow, Vector,
    MAX_SENIORITY_RANK, UNSPECIFIED,
};
use std::collections::BTreeMap;

/// Candidate-vacancy interaction features, in vector order.
const CROSS_FIELDS: [&str; 3] = ["skill_overlap", "location_match", "seniority_gap"];

/// Free-text fields, in vector order.
const TEXT_FIELDS: [&str; 2] = ["resume_text", "vacancy_description"];

fn categorical_values<'a>(
    candidate: &'a CandidateRow,
    vacancy: &'a VacancyRow,
) -> [(&'static str, &'a str); 5] {
    [
        ("candidate_education", candidate.education_level.as_str()),
        ("candidate_location", candidate.location.as_str()),
        ("vacancy_contract_type", vacancy.contract_type.as_str()),
        ("vacancy_education", vacancy.education_level.as_str()),
        ("vacancy_location", vacancy.location.as_str()),
    ]
}

fn numeric_values(candidate: &CandidateRow, vacancy: &VacancyRow) -> [(&'static str, f64); 7] {
    [
        (
            "candidate_english_rank",
            language_rank(&candidate.english_level),
        ),
        ("candidate_expected_salary", candidate.expected_salary),
        ("candidate_experience_years", candidate.experience_years),
        (
            "candidate_seniority_rank",
            seniority_rank(&candidate.seniority_level),
        ),
        ("vacancy_english_rank", language_rank(&vacancy.english_level)),
        ("vacancy_offered_salary", vacancy.offered_salary),
        ("vacancy_seniority_rank", vacancy_seniority(vacancy)),
    ]
}

/// Vacancies often leave the seniority field blank and carry the level in
/// the title instead, so fall back to title keywords.
fn vacancy_seniority(vacancy: &VacancyRow) -> f64 {
    if vacancy.seniority_level == UNSPECIFIED {
        seniority_rank(&vacancy.title)
    } else {
        seniority_rank(&vacancy.seniority_level)
    }
}

/// Jaccard overlap of two sorted, deduplicated token lists.
fn jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let mut i = 0;
    let mut j = 0;
    let mut intersection = 0usize;
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

fn cross_value(name: &str, candidate: &CandidateRow, vacancy: &VacancyRow) -> Result<f32> {
    match name {
        "skill_overlap" => Ok(jaccard(&candidate.skills, &vacancy.required_skills)),
        "location_match" => Ok(
            if candidate.location != UNSPECIFIED && candidate.location == vacancy.location {
                1.0
            } else {
                0.0
            },
        ),
        "seniority_gap" => {
            let gap = (seniority_rank(&candidate.seniority_level) - vacancy_seniority(vacancy))
                .abs()
                / MAX_SENIORITY_RANK;
            Ok(1.0 - gap as f32)
        }
        other => Err(Error::FeatureAssembly(format!(
            "schema names unknown cross feature '{other}'"
        ))),
    }
}

/// Fit a feature schema from training-partition pairs only.
///
/// Vocabularies and numeric ranges are computed from exactly the pairs
/// given; callers are responsible for passing the training partition and
/// nothing else.
#[must_use]
pub fn fit_schema(
    pairs: &[(&CandidateRow, &VacancyRow)],
    embedder: &EmbedderConfig,
) -> FeatureSchema {
    let mut categorical: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut numeric: BTreeMap<String, NumericStats> = BTreeMap::new();

    for (candidate, vacancy) in pairs {
        for (name, value) in categorical_values(candidate, vacancy) {
            categorical
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        for (name, value) in numeric_values(candidate, vacancy) {
            numeric
                .entry(name.to_string())
                .or_insert_with(NumericStats::empty)
                .observe(value);
        }
    }

    // Fields must exist in the schema even when no pair was observed, so
    // that prediction against an empty-fit schema still has a defined shape.
    if pairs.is_empty() {
        let candidate = CandidateRow {
            id: String::new(),
            education_level: String::new(),
            seniority_level: String::new(),
            english_level: String::new(),
            location: String::new(),
            skills: Vec::new(),
            experience_years: 0.0,
            expected_salary: 0.0,
            resume_text: String::new(),
        };
        let vacancy = VacancyRow {
            id: String::new(),
            title: String::new(),
            seniority_level: String::new(),
            education_level: String::new(),
            english_level: String::new(),
            contract_type: String::new(),
            location: String::new(),
            required_skills: Vec::new(),
            offered_salary: 0.0,
            description: String::new(),
        };
        for (name, _) in categorical_values(&candidate, &vacancy) {
            categorical.entry(name.to_string()).or_default();
        }
        for (name, _) in numeric_values(&candidate, &vacancy) {
            numeric
                .entry(name.to_string())
                .or_insert_with(NumericStats::empty);
        }
    }

    let categorical: BTreeMap<String, Vocabulary> = categorical
        .into_iter()
        .map(|(name, observed)| (name, Vocabulary::from_observed(observed)))
        .collect();

    let mut layout = Vec::new();
    for (name, vocab) in &categorical {
        layout.push(FeatureBlock {
            name: name.clone(),
            kind: BlockKind::Categorical,
            width: vocab.width(),
        });
    }
    for name in numeric.keys() {
        layout.push(FeatureBlock {
            name: name.clone(),
            kind: BlockKind::Numeric,
            width: 1,
        });
    }
    for name in CROSS_FIELDS {
        layout.push(FeatureBlock {
            name: name.to_string(),
            kind: BlockKind::Cross,
            width: 1,
        });
    }
    for name in TEXT_FIELDS {
        layout.push(FeatureBlock {
            name: name.to_string(),
            kind: BlockKind::Text,
            width: embedder.dim,
        });
    }

    FeatureSchema {
        version: SCHEMA_VERSION,
        embedder: embedder.clone(),
        categorical,
        numeric,
        layout,
    }
}

/// Assembles feature vectors under a frozen schema.
pub struct FeatureAssembler<'a> {
    schema: &'a FeatureSchema,
    embedder: TextEmbedder,
}

impl<'a> FeatureAssembler<'a> {
    /// Fails with a schema mismatch when the schema's embedder version is
    /// not available in this build.
    pub fn new(schema: &'a FeatureSchema) -> Result<Self> {
        let embedder = TextEmbedder::from_config(&schema.embedder)?;
        Ok(Self { schema, embedder })
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        self.schema
    }

    /// Assemble one pair into a feature vector laid out by the schema.
    pub fn assemble(&self, candidate: &CandidateRow, vacancy: &VacancyRow) -> Result<Vector> {
        let categorical = categorical_values(candidate, vacancy);
        let numeric = numeric_values(candidate, vacancy);
        let mut components: Vec<f32> = Vec::with_capacity(self.schema.dim());

        for block in &self.schema.layout {
            match block.kind {
                BlockKind::Categorical => {
                    let value = categorical
                        .iter()
                        .find(|(name, _)| *name == block.name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            Error::FeatureAssembly(format!(
                                "schema names unknown categorical field '{}'",
                                block.name
                            ))
                        })?;
                    let vocab = self.schema.categorical.get(&block.name).ok_or_else(|| {
                        Error::FeatureAssembly(format!(
                            "no vocabulary for categorical field '{}'",
                            block.name
                        ))
                    })?;
                    let slot = vocab.slot_of(value);
                    let start = components.len();
                    components.resize(start + block.width, 0.0);
                    components[start + slot] = 1.0;
                }
                BlockKind::Numeric => {
                    let value = numeric
                        .iter()
                        .find(|(name, _)| *name == block.name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            Error::FeatureAssembly(format!(
                                "schema names unknown numeric field '{}'",
                                block.name
                            ))
                        })?;
                    let stats = self.schema.numeric.get(&block.name).ok_or_else(|| {
                        Error::FeatureAssembly(format!(
                            "no statistics for numeric field '{}'",
                            block.name
                        ))
                    })?;
                    components.push(stats.scale(value));
                }
                BlockKind::Cross => {
                    components.push(cross_value(&block.name, candidate, vacancy)?);
                }
                BlockKind::Text => {
                    let text = match block.name.as_str() {
                        "resume_text" => candidate.resume_text.as_str(),
                        "vacancy_description" => vacancy.description.as_str(),
                        other => {
                            return Err(Error::FeatureAssembly(format!(
                                "schema names unknown text field '{other}'"
                            )))
                        }
                    };
                    let embedding = self.embedder.embed(text);
                    if embedding.dim() != block.width {
                        return Err(Error::FeatureAssembly(format!(
                            "embedding width {} does not match schema block width {}",
                            embedding.dim(),
                            block.width
                        )));
                    }
                    components.extend_from_slice(embedding.as_slice());
                }
            }
        }

        debug_assert_eq!(components.len(), self.schema.dim());
        Ok(Vector::new(components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{DEFAULT_EMBEDDING_DIM, EMBEDDER_VERSION};

    fn candidate(id: &str, location: &str, skills: &[&str], years: f64) -> CandidateRow {
        CandidateRow {
            id: id.to_string(),
            education_level: "bachelor".to_string(),
            seniority_level: "senior".to_string(),
            english_level: "fluent".to_string(),
            location: location.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: years,
            expected_salary: 60_000.0,
            resume_text: "distributed systems engineer".to_string(),
        }
    }

    fn vacancy(id: &str, location: &str, skills: &[&str]) -> VacancyRow {
        VacancyRow {
            id: id.to_string(),
            title: "Senior Backend Engineer".to_string(),
            seniority_level: "senior".to_string(),
            education_level: "bachelor".to_string(),
            english_level: "advanced".to_string(),
            contract_type: "permanent".to_string(),
            location: location.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            offered_salary: 65_000.0,
            description: "build and run storage services".to_string(),
        }
    }

    fn default_embedder() -> EmbedderConfig {
        EmbedderConfig {
            version: EMBEDDER_VERSION,
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }

    #[test]
    fn test_fit_then_assemble_dimensions_agree() {
        let c = candidate("c-1", "berlin", &["rust", "sql"], 8.0);
        let v = vacancy("v-1", "berlin", &["rust", "kubernetes"]);
        let schema = fit_schema(&[(&c, &v)], &default_embedder());
        let assembler = FeatureAssembler::new(&schema).unwrap();

        let features = assembler.assemble(&c, &v).unwrap();
        assert_eq!(features.dim(), schema.dim());
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let c = candidate("c-1", "berlin", &["rust"], 5.0);
        let v = vacancy("v-1", "lisbon", &["rust", "go"]);
        let schema = fit_schema(&[(&c, &v)], &default_embedder());
        let assembler = FeatureAssembler::new(&schema).unwrap();

        let first = assembler.assemble(&c, &v).unwrap();
        let second = assembler.assemble(&c, &v).unwrap();
        assert_eq!(first.as_slice(), second.as_slice());
    }

    #[test]
    fn test_unseen_category_maps_to_unknown_slot() {
        let c_train = candidate("c-1", "berlin", &["rust"], 5.0);
        let v = vacancy("v-1", "berlin", &["rust"]);
        let schema = fit_schema(&[(&c_train, &v)], &default_embedder());
        let assembler = FeatureAssembler::new(&schema).unwrap();

        // A location never observed at fit time must still assemble.
        let c_new = candidate("c-2", "osaka", &["rust"], 5.0);
        let features = assembler.assemble(&c_new, &v).unwrap();
        assert_eq!(features.dim(), schema.dim());

        // Unknown slot is the first position of the candidate_location block.
        let mut offset = 0;
        for block in &schema.layout {
            if block.name == "candidate_location" {
                break;
            }
            offset += block.width;
        }
        assert_eq!(features.as_slice()[offset], 1.0);
    }

    #[test]
    fn test_skill_overlap_reflects_shared_skills() {
        let v = vacancy("v-1", "berlin", &["postgres", "rust"]);
        let c_match = candidate("c-1", "berlin", &["postgres", "rust"], 5.0);
        let c_miss = candidate("c-2", "berlin", &["cobol"], 5.0);

        assert_eq!(cross_value("skill_overlap", &c_match, &v).unwrap(), 1.0);
        assert_eq!(cross_value("skill_overlap", &c_miss, &v).unwrap(), 0.0);
    }

    #[test]
    fn test_unspecified_location_never_matches() {
        let c = CandidateRow {
            location: UNSPECIFIED.to_string(),
            ..candidate("c-1", "x", &[], 1.0)
        };
        let v = VacancyRow {
            location: UNSPECIFIED.to_string(),
            ..vacancy("v-1", "x", &[])
        };
        assert_eq!(cross_value("location_match", &c, &v).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_fit_still_produces_full_layout() {
        let schema = fit_schema(&[], &default_embedder());
        // 5 categorical + 7 numeric + 3 cross + 2 text blocks
        assert_eq!(schema.layout.len(), 17);
        let assembler = FeatureAssembler::new(&schema).unwrap();
        let c = candidate("c-1", "berlin", &["rust"], 2.0);
        let v = vacancy("v-1", "berlin", &["rust"]);
        assert_eq!(assembler.assemble(&c, &v).unwrap().dim(), schema.dim());
    }
}
