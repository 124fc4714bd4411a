//! # fitscore
//!
//! A candidate-vacancy compatibility scoring engine: a schema-normalized
//! feature pipeline, a deterministic text embedder, gradient-boosted
//! training with a leakage-safe split, and a versioned model registry with
//! asynchronous training jobs behind a REST API.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! cargo install fitscore
//! fitscore --data-dir ./data --http-port 8080
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! # fn main() -> fitscore::Result<()> {
//! use fitscore::prelude::*;
//! use serde_json::json;
//!
//! // Normalize raw rows
//! let candidate = candidate_from_json(&json!({
//!     "id": "c-1",
//!     "seniority_level": "senior",
//!     "skills": ["rust", "sql"],
//!     "resume_text": "backend engineer"
//! }))?;
//! let vacancy = vacancy_from_json(&json!({
//!     "id": "v-1",
//!     "title": "Senior Engineer",
//!     "required_skills": ["rust"],
//!     "description": "distributed storage"
//! }))?;
//! let outcome = outcome_from_json(&json!({
//!     "candidate_id": "c-1",
//!     "vacancy_id": "v-1",
//!     "status": "hired"
//! }))?;
//!
//! // Build a dataset and train
//! let dataset = DatasetBuilder::new(DatasetConfig::default())
//!     .build(&[candidate], &[vacancy], &[outcome])?;
//! let trained = ModelTrainer::new(GbdtParams::default()).train(&dataset)?;
//!
//! // Publish and score
//! let registry = std::sync::Arc::new(ModelRegistry::open("./data")?);
//! let dataset_version = registry.publish_dataset(dataset)?;
//! registry.publish_model(dataset_version, trained)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `fitscore-core` - Error type, normalized row types, status labeling
//! - `fitscore-features` - Feature schema, text embedder, assembler
//! - `fitscore-model` - Dataset builder, gradient-boosted trainer, metrics
//! - `fitscore-registry` - Versioned artifacts, training jobs, prediction
//! - `fitscore-api` - REST API

// Re-export core types
pub use fitscore_core::{
    label_for_status, language_rank, seniority_rank, CandidateRow, Error, OutcomeRecord, Result,
    VacancyRow, Vector,
};

pub use fitscore_core::normalize::{candidate_from_json, outcome_from_json, vacancy_from_json};

// Re-export the feature pipeline
pub use fitscore_features::{
    fit_schema, EmbedderConfig, FeatureAssembler, FeatureSchema, TextEmbedder,
};

// Re-export training
pub use fitscore_model::{
    Dataset, DatasetBuilder, DatasetConfig, DatasetStats, Gbdt, GbdtParams, ModelTrainer,
    TrainedModel, ValidationMetrics,
};

// Re-export the registry and serving layer
pub use fitscore_registry::{
    JobStatus, ModelArtifact, ModelRegistry, Prediction, PredictionEngine, TrainingJobManager,
};

// Re-export API
pub use fitscore_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        candidate_from_json, fit_schema, outcome_from_json, vacancy_from_json, AppState,
        CandidateRow, Dataset, DatasetBuilder, DatasetConfig, DatasetStats, EmbedderConfig, Error,
        FeatureAssembler, FeatureSchema, Gbdt, GbdtParams, JobStatus, ModelArtifact, ModelRegistry,
        ModelTrainer, OutcomeRecord, Prediction, PredictionEngine, RestApi, Result, TextEmbedder,
        TrainedModel, TrainingJobManager, VacancyRow, ValidationMetrics, Vector,
    };
}
