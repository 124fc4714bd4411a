//! Dataset assembly
//!
//! Joins canonical candidate rows, vacancy rows, and historical outcomes
//! into labeled training examples, splits them with a recorded seed, and
//! fits the feature schema from the training partition only. The resulting
//! [`Dataset`] carries everything the trainer needs as one coherent unit.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use fitscore_core::{label_for_status, CandidateRow, OutcomeRecord, Result, VacancyRow};
use fitscore_features::{
    fit_schema, EmbedderConfig, FeatureAssembler, FeatureSchema, DEFAULT_EMBEDDING_DIM,
    EMBEDDER_VERSION,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_train_fraction() -> f64 {
    0.7
}

fn default_seed() -> u64 {
    23
}

fn default_min_class_fraction() -> f64 {
    0.1
}

fn default_embedding_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

/// Split and encoding configuration, recorded in the dataset for
/// reproducibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    /// Fraction of examples assigned to the training partition.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    /// Shuffle seed; same inputs and seed reproduce the same split.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Minority label fraction below which a balance warning is raised.
    #[serde(default = "default_min_class_fraction")]
    pub min_class_fraction: f64,
    /// Embedding dimension per free-text field.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            train_fraction: default_train_fraction(),
            seed: default_seed(),
            min_class_fraction: default_min_class_fraction(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// One labeled (candidate, vacancy) example. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingExample {
    pub candidate_id: String,
    pub vacancy_id: String,
    pub features: Vec<f32>,
    /// 1 = matched, 0 = not matched.
    pub label: u8,
}

/// Row counts and class balance, reported to the ingestion caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetStats {
    pub total_examples: usize,
    pub train_examples: usize,
    pub validation_examples: usize,
    pub matched: usize,
    pub not_matched: usize,
    /// Share of the rarer label among all examples.
    pub minority_fraction: f64,
    pub balance_warning: bool,
    /// Outcomes skipped because their status is non-terminal or their
    /// candidate/vacancy id did not join.
    pub dropped_outcomes: usize,
}

/// A partitioned, encoded dataset plus its frozen feature schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub train: Vec<TrainingExample>,
    pub validation: Vec<TrainingExample>,
    pub config: DatasetConfig,
    pub stats: DatasetStats,
    pub created_at: DateTime<Utc>,
}

pub struct DatasetBuilder {
    config: DatasetConfig,
}

impl DatasetBuilder {
    #[must_use]
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Join, label, split, fit the schema on the training partition, and
    /// encode both partitions under it.
    pub fn build(
        &self,
        candidates: &[CandidateRow],
        vacancies: &[VacancyRow],
        outcomes: &[OutcomeRecord],
    ) -> Result<Dataset> {
        let candidate_index: AHashMap<&str, &CandidateRow> =
            candidates.iter().map(|c| (c.id.as_str(), c)).collect();
        let vacancy_index: AHashMap<&str, &VacancyRow> =
            vacancies.iter().map(|v| (v.id.as_str(), v)).collect();

        // Inner join: outcomes referencing missing rows or carrying a
        // non-terminal status are dropped, not fabricated.
        let mut joined: Vec<(&CandidateRow, &VacancyRow, u8)> = Vec::new();
        let mut dropped = 0usize;
        for outcome in outcomes {
            let label = label_for_status(&outcome.status);
            let candidate = candidate_index.get(outcome.candidate_id.as_str());
            let vacancy = vacancy_index.get(outcome.vacancy_id.as_str());
            match (label, candidate, vacancy) {
                (Some(label), Some(c), Some(v)) => joined.push((c, v, label)),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "outcomes dropped during join");
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        joined.shuffle(&mut rng);

        let train_count = ((joined.len() as f64) * self.config.train_fraction).round() as usize;
        let train_count = train_count.min(joined.len());
        let (train_rows, validation_rows) = joined.split_at(train_count);

        // Vocabularies and scaling statistics see training rows only;
        // validation rows must not leak into the frozen schema.
        let train_pairs: Vec<(&CandidateRow, &VacancyRow)> =
            train_rows.iter().map(|(c, v, _)| (*c, *v)).collect();
        let embedder = EmbedderConfig {
            version: EMBEDDER_VERSION,
            dim: self.config.embedding_dim,
        };
        let schema = fit_schema(&train_pairs, &embedder);

        let train = encode_partition(&schema, train_rows)?;
        let validation = encode_partition(&schema, validation_rows)?;

        let matched = joined.iter().filter(|(_, _, label)| *label == 1).count();
        let not_matched = joined.len() - matched;
        let minority_fraction = if joined.is_empty() {
            0.0
        } else {
            matched.min(not_matched) as f64 / joined.len() as f64
        };
        let balance_warning =
            !joined.is_empty() && minority_fraction < self.config.min_class_fraction;
        if balance_warning {
            warn!(
                minority_fraction,
                threshold = self.config.min_class_fraction,
                "label classes are severely imbalanced"
            );
        }

        Ok(Dataset {
            schema,
            stats: DatasetStats {
                total_examples: joined.len(),
                train_examples: train.len(),
                validation_examples: validation.len(),
                matched,
                not_matched,
                minority_fraction,
                balance_warning,
                dropped_outcomes: dropped,
            },
            train,
            validation,
            config: self.config,
            created_at: Utc::now(),
        })
    }
}

fn encode_partition(
    schema: &FeatureSchema,
    rows: &[(&CandidateRow, &VacancyRow, u8)],
) -> Result<Vec<TrainingExample>> {
    let assembler = FeatureAssembler::new(schema)?;
    rows.par_iter()
        .map(|(candidate, vacancy, label)| {
            let features = assembler.assemble(candidate, vacancy)?;
            Ok(TrainingExample {
                candidate_id: candidate.id.clone(),
                vacancy_id: vacancy.id.clone(),
                features: features.into_inner(),
                label: *label,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitscore_core::normalize::{candidate_from_json, outcome_from_json, vacancy_from_json};
    use serde_json::json;

    fn candidate(id: &str, years: f64) -> CandidateRow {
        candidate_from_json(&json!({
            "id": id,
            "education_level": "bachelor",
            "seniority_level": "senior",
            "location": "berlin",
            "skills": ["rust"],
            "experience_years": years,
            "resume_text": "systems engineer"
        }))
        .unwrap()
    }

    fn vacancy(id: &str) -> VacancyRow {
        vacancy_from_json(&json!({
            "id": id,
            "title": "Senior Engineer",
            "location": "berlin",
            "required_skills": ["rust"],
            "description": "storage services"
        }))
        .unwrap()
    }

    fn outcome(candidate_id: &str, vacancy_id: &str, status: &str) -> OutcomeRecord {
        outcome_from_json(&json!({
            "candidate_id": candidate_id,
            "vacancy_id": vacancy_id,
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn test_three_outcomes_split_two_one() {
        let candidates = vec![candidate("c-1", 3.0), candidate("c-2", 8.0)];
        let vacancies = vec![vacancy("v-1"), vacancy("v-2")];
        let outcomes = vec![
            outcome("c-1", "v-1", "hired"),
            outcome("c-2", "v-1", "rejected-by-client"),
            outcome("c-2", "v-2", "hired"),
        ];

        let builder = DatasetBuilder::new(DatasetConfig {
            train_fraction: 0.66,
            ..DatasetConfig::default()
        });
        let dataset = builder.build(&candidates, &vacancies, &outcomes).unwrap();

        assert_eq!(dataset.stats.total_examples, 3);
        assert_eq!(dataset.train.len(), 2);
        assert_eq!(dataset.validation.len(), 1);
        assert_eq!(dataset.stats.dropped_outcomes, 0);
    }

    #[test]
    fn test_split_is_reproducible() {
        let candidates = vec![candidate("c-1", 3.0), candidate("c-2", 8.0)];
        let vacancies = vec![vacancy("v-1")];
        let outcomes: Vec<OutcomeRecord> = (0..2)
            .flat_map(|_| {
                vec![
                    outcome("c-1", "v-1", "hired"),
                    outcome("c-2", "v-1", "declined"),
                ]
            })
            .collect();

        let builder = DatasetBuilder::new(DatasetConfig::default());
        let first = builder.build(&candidates, &vacancies, &outcomes).unwrap();
        let second = builder.build(&candidates, &vacancies, &outcomes).unwrap();
        assert_eq!(first.train, second.train);
        assert_eq!(first.validation, second.validation);
    }

    #[test]
    fn test_unjoinable_and_nonterminal_outcomes_are_dropped() {
        let candidates = vec![candidate("c-1", 3.0)];
        let vacancies = vec![vacancy("v-1")];
        let outcomes = vec![
            outcome("c-1", "v-1", "hired"),
            outcome("c-ghost", "v-1", "hired"),
            outcome("c-1", "v-ghost", "declined"),
            outcome("c-1", "v-1", "interviewing"),
        ];

        let dataset = DatasetBuilder::new(DatasetConfig::default())
            .build(&candidates, &vacancies, &outcomes)
            .unwrap();
        assert_eq!(dataset.stats.total_examples, 1);
        assert_eq!(dataset.stats.dropped_outcomes, 3);
    }

    #[test]
    fn test_balance_warning_on_single_class() {
        let candidates = vec![candidate("c-1", 3.0), candidate("c-2", 8.0)];
        let vacancies = vec![vacancy("v-1")];
        let outcomes = vec![
            outcome("c-1", "v-1", "hired"),
            outcome("c-2", "v-1", "hired"),
        ];

        let dataset = DatasetBuilder::new(DatasetConfig::default())
            .build(&candidates, &vacancies, &outcomes)
            .unwrap();
        assert!(dataset.stats.balance_warning);
        assert_eq!(dataset.stats.minority_fraction, 0.0);
    }

    #[test]
    fn test_schema_statistics_come_from_training_partition_only() {
        // Build once to learn which example the seed sends to validation,
        // then give that example an extreme numeric value. The frozen
        // statistics must not move.
        let mut candidates = vec![
            candidate("c-1", 1.0),
            candidate("c-2", 2.0),
            candidate("c-3", 3.0),
            candidate("c-4", 4.0),
        ];
        let vacancies = vec![vacancy("v-1")];
        let outcomes: Vec<OutcomeRecord> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                outcome(&c.id, "v-1", if i % 2 == 0 { "hired" } else { "declined" })
            })
            .collect();

        let builder = DatasetBuilder::new(DatasetConfig::default());
        let baseline = builder.build(&candidates, &vacancies, &outcomes).unwrap();
        let held_out_id = baseline.validation[0].candidate_id.clone();

        let held_out = candidates
            .iter_mut()
            .find(|c| c.id == held_out_id)
            .unwrap();
        held_out.experience_years = 10_000.0;

        let perturbed = builder.build(&candidates, &vacancies, &outcomes).unwrap();
        assert_eq!(
            baseline.schema.numeric["candidate_experience_years"],
            perturbed.schema.numeric["candidate_experience_years"]
        );
    }
}
