//! # fitscore-model
//!
//! Training layer for the fitscore compatibility engine: dataset assembly
//! with a leakage-safe split, a gradient-boosted tree ensemble over the
//! logistic loss, validation metrics, and the trainer tying them together.

pub mod dataset;
pub mod gbdt;
pub mod metrics;
pub mod trainer;

pub use dataset::{Dataset, DatasetBuilder, DatasetConfig, DatasetStats, TrainingExample};
pub use gbdt::{Gbdt, GbdtParams};
pub use metrics::{evaluate, ValidationMetrics};
pub use trainer::{ModelTrainer, TrainedModel};
