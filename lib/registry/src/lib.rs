//! # fitscore-registry
//!
//! Versioned persistence and serving for the fitscore pipeline: a
//! file-backed artifact store with atomic publishes, a model registry with
//! per-dataset training locks, background training jobs, and the
//! prediction engine that scores raw payloads against published models.

pub mod artifact;
pub mod jobs;
pub mod predict;
pub mod registry;
pub mod store;

pub use artifact::{ArtifactDescription, DatasetArtifact, ModelArtifact};
pub use jobs::{JobStatus, TrainingJobManager};
pub use predict::{Prediction, PredictionEngine};
pub use registry::{ModelRegistry, TrainingGuard};
pub use store::ArtifactStore;
