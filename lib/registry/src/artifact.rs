//! Artifact types
//!
//! What actually lands on disk. A model artifact is a trained model frozen
//! together with the schema that produced its features, stamped with its own
//! version and the version of the dataset it was fitted on.

use chrono::{DateTime, Utc};
use fitscore_model::{Dataset, GbdtParams, TrainedModel, ValidationMetrics};
use serde::{Deserialize, Serialize};

/// A published model. Versions are assigned monotonically at publish time
/// and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub version: u64,
    /// Dataset the model was trained on.
    pub dataset_version: u64,
    #[serde(flatten)]
    pub trained: TrainedModel,
}

impl ModelArtifact {
    #[must_use]
    pub fn new(version: u64, dataset_version: u64, trained: TrainedModel) -> Self {
        Self {
            version,
            dataset_version,
            trained,
        }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.trained.params
    }

    pub fn metrics(&self) -> &ValidationMetrics {
        &self.trained.metrics
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained.trained_at
    }
}

/// A published dataset, wrapped with its assigned version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetArtifact {
    pub version: u64,
    #[serde(flatten)]
    pub dataset: Dataset,
}

/// Listing entry for an artifact on disk. Size and checksum are computed
/// from the stored file, not from the in-memory value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescription {
    pub version: u64,
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub created: Option<DateTime<Utc>>,
}
