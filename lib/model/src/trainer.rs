//! Model trainer
//!
//! Fits a gradient-boosted ensemble on a dataset's training partition,
//! reports validation metrics, and packages the result together with the
//! frozen schema. Degenerate input fails before any fitting happens, so a
//! failed train can never surface a partial model.

use crate::dataset::Dataset;
use crate::gbdt::{Gbdt, GbdtParams};
use crate::metrics::{evaluate, ValidationMetrics};
use chrono::{DateTime, Utc};
use fitscore_core::{Error, Result};
use fitscore_features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use tracing::info;

/// A fitted model plus everything needed to score consistently with it.
/// The registry wraps this with a version number at publish time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainedModel {
    pub model: Gbdt,
    pub schema: FeatureSchema,
    pub params: GbdtParams,
    pub metrics: ValidationMetrics,
    pub trained_at: DateTime<Utc>,
}

pub struct ModelTrainer {
    params: GbdtParams,
}

impl ModelTrainer {
    #[must_use]
    pub fn new(params: GbdtParams) -> Self {
        Self { params }
    }

    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModel> {
        self.train_with_cancel(dataset, &AtomicBool::new(false))
    }

    /// Train with a cooperative cancellation flag, checked between boosting
    /// rounds.
    pub fn train_with_cancel(
        &self,
        dataset: &Dataset,
        cancel: &AtomicBool,
    ) -> Result<TrainedModel> {
        if dataset.train.is_empty() {
            return Err(Error::Training("training partition is empty".to_string()));
        }

        let distinct_labels = {
            let first = dataset.train[0].label;
            dataset.train.iter().any(|e| e.label != first)
        };
        if !distinct_labels {
            return Err(Error::Training(
                "training partition contains a single label class".to_string(),
            ));
        }

        let expected_dim = dataset.schema.dim();
        for example in dataset.train.iter().chain(dataset.validation.iter()) {
            if example.features.len() != expected_dim {
                return Err(Error::Training(format!(
                    "feature vector width {} disagrees with schema width {}",
                    example.features.len(),
                    expected_dim
                )));
            }
        }

        let (train_x, train_y): (Vec<Vec<f32>>, Vec<u8>) = dataset
            .train
            .iter()
            .map(|e| (e.features.clone(), e.label))
            .unzip();
        let (valid_x, valid_y): (Vec<Vec<f32>>, Vec<u8>) = dataset
            .validation
            .iter()
            .map(|e| (e.features.clone(), e.label))
            .unzip();

        info!(
            train = train_x.len(),
            validation = valid_x.len(),
            features = expected_dim,
            rounds = self.params.rounds,
            "fitting gradient-boosted ensemble"
        );
        let model = Gbdt::fit(&self.params, &train_x, &train_y, &valid_x, &valid_y, cancel)?;

        let scores: Vec<f32> = valid_x
            .iter()
            .map(|features| model.predict_probability(features))
            .collect();
        let metrics = evaluate(&scores, &valid_y);
        info!(
            trees = model.num_trees(),
            precision = metrics.precision,
            recall = metrics.recall,
            auc = ?metrics.auc,
            "training complete"
        );

        Ok(TrainedModel {
            model,
            schema: dataset.schema.clone(),
            params: self.params,
            metrics,
            trained_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetBuilder, DatasetConfig};
    use fitscore_core::normalize::{candidate_from_json, outcome_from_json, vacancy_from_json};
    use fitscore_core::{CandidateRow, OutcomeRecord, VacancyRow};
    use serde_json::json;

    fn fixture(statuses: &[&str]) -> Dataset {
        let candidates: Vec<CandidateRow> = (0..statuses.len())
            .map(|i| {
                candidate_from_json(&json!({
                    "id": format!("c-{i}"),
                    "seniority_level": if i % 2 == 0 { "senior" } else { "junior" },
                    "location": "berlin",
                    "skills": if i % 2 == 0 { vec!["rust", "sql"] } else { vec!["cobol"] },
                    "experience_years": i as f64,
                    "resume_text": "engineer"
                }))
                .unwrap()
            })
            .collect();
        let vacancies: Vec<VacancyRow> = vec![vacancy_from_json(&json!({
            "id": "v-1",
            "title": "Senior Engineer",
            "location": "berlin",
            "required_skills": ["rust", "sql"],
            "description": "storage"
        }))
        .unwrap()];
        let outcomes: Vec<OutcomeRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                outcome_from_json(&json!({
                    "candidate_id": format!("c-{i}"),
                    "vacancy_id": "v-1",
                    "status": status
                }))
                .unwrap()
            })
            .collect();

        DatasetBuilder::new(DatasetConfig::default())
            .build(&candidates, &vacancies, &outcomes)
            .unwrap()
    }

    #[test]
    fn test_training_produces_metrics_and_schema() {
        let dataset = fixture(&[
            "hired", "declined", "hired", "declined", "hired", "declined", "hired", "declined",
            "hired", "declined",
        ]);
        let trained = ModelTrainer::new(GbdtParams::default())
            .train(&dataset)
            .unwrap();
        assert_eq!(trained.schema, dataset.schema);
        assert_eq!(trained.metrics.examples, dataset.validation.len());
        assert!(trained.model.num_trees() > 0);
    }

    #[test]
    fn test_single_class_training_fails() {
        let dataset = fixture(&["hired", "hired", "hired", "hired"]);
        let result = ModelTrainer::new(GbdtParams::default()).train(&dataset);
        assert!(matches!(result, Err(Error::Training(_))));
    }

    #[test]
    fn test_empty_training_partition_fails() {
        let dataset = fixture(&[]);
        let result = ModelTrainer::new(GbdtParams::default()).train(&dataset);
        assert!(matches!(result, Err(Error::Training(_))));
    }

    #[test]
    fn test_width_mismatch_fails() {
        let mut dataset = fixture(&["hired", "declined", "hired", "declined"]);
        dataset.train[0].features.pop();
        let result = ModelTrainer::new(GbdtParams::default()).train(&dataset);
        assert!(matches!(result, Err(Error::Training(_))));
    }
}
