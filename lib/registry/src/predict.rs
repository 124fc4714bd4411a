//! Prediction engine
//!
//! Scores candidate/vacancy pairs against a published model. Raw payloads
//! go through the same normalization as training rows, and features are
//! assembled with the schema frozen into the artifact, so a score is
//! comparable across requests for as long as the model version is pinned.

use crate::artifact::ModelArtifact;
use crate::registry::ModelRegistry;
use fitscore_core::normalize::{candidate_from_json, vacancy_from_json};
use fitscore_core::{CandidateRow, Error, Result, VacancyRow};
use fitscore_features::FeatureAssembler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Match probability in `[0, 1]`.
    pub score: f32,
    /// Model that produced the score.
    pub model_version: u64,
}

pub struct PredictionEngine {
    registry: Arc<ModelRegistry>,
}

impl PredictionEngine {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Score one raw candidate/vacancy pair. `version` pins a model; `None`
    /// resolves the latest published one.
    pub fn score_pair(
        &self,
        candidate: &Value,
        vacancy: &Value,
        version: Option<u64>,
    ) -> Result<Prediction> {
        let artifact = self.registry.model(version)?;
        let candidate = candidate_from_json(candidate)?;
        let vacancy = vacancy_from_json(vacancy)?;
        score_rows(&artifact, &candidate, &vacancy)
    }

    /// Score many pairs against a single resolved model version. The whole
    /// batch fails when any pair fails to normalize, so callers never see a
    /// partially scored batch.
    pub fn score_batch(
        &self,
        pairs: &[(Value, Value)],
        version: Option<u64>,
    ) -> Result<Vec<Prediction>> {
        let artifact = self.registry.model(version)?;
        let mut rows = Vec::with_capacity(pairs.len());
        for (candidate, vacancy) in pairs {
            rows.push((candidate_from_json(candidate)?, vacancy_from_json(vacancy)?));
        }
        rows.iter()
            .map(|(candidate, vacancy)| score_rows(&artifact, candidate, vacancy))
            .collect()
    }
}

fn score_rows(
    artifact: &ModelArtifact,
    candidate: &CandidateRow,
    vacancy: &VacancyRow,
) -> Result<Prediction> {
    let assembler = FeatureAssembler::new(&artifact.trained.schema)?;
    let features = assembler.assemble(candidate, vacancy)?;
    if features.dim() != artifact.trained.schema.dim() {
        return Err(Error::SchemaMismatch(format!(
            "assembled width {} does not match schema width {}",
            features.dim(),
            artifact.trained.schema.dim()
        )));
    }
    let score = artifact
        .trained
        .model
        .predict_probability(features.as_slice())
        .clamp(0.0, 1.0);
    Ok(Prediction {
        score,
        model_version: artifact.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitscore_core::normalize::outcome_from_json;
    use fitscore_model::{DatasetBuilder, DatasetConfig, GbdtParams, ModelTrainer};
    use serde_json::json;
    use tempfile::TempDir;

    fn engine_with_model() -> (TempDir, PredictionEngine) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ModelRegistry::open(dir.path()).unwrap());

        let candidates: Vec<_> = (0..12)
            .map(|i| {
                candidate_from_json(&json!({
                    "id": format!("c-{i}"),
                    "seniority_level": if i % 2 == 0 { "senior" } else { "junior" },
                    "location": if i % 2 == 0 { "berlin" } else { "lisbon" },
                    "skills": if i % 2 == 0 { vec!["rust", "sql"] } else { vec!["cobol"] },
                    "experience_years": i,
                    "resume_text": "backend engineer"
                }))
                .unwrap()
            })
            .collect();
        let vacancies = vec![vacancy_from_json(&json!({
            "id": "v-1",
            "title": "Senior Engineer",
            "location": "berlin",
            "required_skills": ["rust", "sql"],
            "description": "distributed storage"
        }))
        .unwrap()];
        let outcomes: Vec<_> = (0..12)
            .map(|i| {
                outcome_from_json(&json!({
                    "candidate_id": format!("c-{i}"),
                    "vacancy_id": "v-1",
                    "status": if i % 2 == 0 { "hired" } else { "declined" }
                }))
                .unwrap()
            })
            .collect();
        let dataset = DatasetBuilder::new(DatasetConfig::default())
            .build(&candidates, &vacancies, &outcomes)
            .unwrap();
        let dataset_version = registry.publish_dataset(dataset.clone()).unwrap();
        let trained = ModelTrainer::new(GbdtParams::default())
            .train(&dataset)
            .unwrap();
        registry.publish_model(dataset_version, trained).unwrap();

        let engine = PredictionEngine::new(registry);
        (dir, engine)
    }

    #[test]
    fn test_score_is_probability_and_stamped() {
        let (_dir, engine) = engine_with_model();
        let prediction = engine
            .score_pair(
                &json!({"id": "c-new", "seniority_level": "senior", "location": "berlin",
                        "skills": ["rust", "sql"], "experience_years": 8,
                        "resume_text": "backend engineer"}),
                &json!({"id": "v-1", "title": "Senior Engineer", "location": "berlin",
                        "required_skills": ["rust", "sql"], "description": "distributed storage"}),
                None,
            )
            .unwrap();
        assert!((0.0..=1.0).contains(&prediction.score));
        assert_eq!(prediction.model_version, 1);
    }

    #[test]
    fn test_unseen_category_still_scores() {
        let (_dir, engine) = engine_with_model();
        // Location and skills never observed during training map to the
        // unknown slots rather than failing.
        let prediction = engine
            .score_pair(
                &json!({"id": "c-new", "location": "reykjavik", "skills": ["fortran"],
                        "resume_text": "mainframe operator"}),
                &json!({"id": "v-1", "title": "Senior Engineer", "location": "berlin",
                        "required_skills": ["rust"], "description": "distributed storage"}),
                None,
            )
            .unwrap();
        assert!((0.0..=1.0).contains(&prediction.score));
    }

    #[test]
    fn test_pinned_missing_version_fails() {
        let (_dir, engine) = engine_with_model();
        let result = engine.score_pair(
            &json!({"id": "c-1"}),
            &json!({"id": "v-1", "title": "dev"}),
            Some(99),
        );
        assert!(matches!(result, Err(Error::ModelNotFound(99))));
    }

    #[test]
    fn test_malformed_payload_fails_whole_batch() {
        let (_dir, engine) = engine_with_model();
        let pairs = vec![
            (
                json!({"id": "c-1", "resume_text": "a"}),
                json!({"id": "v-1", "title": "dev"}),
            ),
            (json!({"resume_text": "missing id"}), json!({"id": "v-1", "title": "dev"})),
        ];
        assert!(engine.score_batch(&pairs, None).is_err());
    }

    #[test]
    fn test_batch_scores_every_pair() {
        let (_dir, engine) = engine_with_model();
        let pairs: Vec<_> = (0..3)
            .map(|i| {
                (
                    json!({"id": format!("c-{i}"), "skills": ["rust"], "resume_text": "eng"}),
                    json!({"id": "v-1", "title": "Engineer", "description": "storage"}),
                )
            })
            .collect();
        let predictions = engine.score_batch(&pairs, None).unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions.iter().all(|p| p.model_version == 1));
    }
}
