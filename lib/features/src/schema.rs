//! Feature schema definitions
//!
//! The [`FeatureSchema`] is the frozen contract shared between training and
//! prediction for one model version: categorical vocabularies, numeric
//! scaling statistics, the embedder configuration, and the ordered block
//! layout of the feature vector. It is fitted once from the training
//! partition, serialized with the model artifact, and never recomputed at
//! prediction time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bump when the layout construction rules change.
pub const SCHEMA_VERSION: u32 = 1;

/// Embedder identity recorded in the schema so historical artifacts stay
/// interpretable even after the embedder is upgraded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedderConfig {
    pub version: u32,
    pub dim: usize,
}

/// Fixed categorical vocabulary established at fit time.
///
/// Slot 0 of the one-hot encoding is reserved for values never seen during
/// training; known values occupy slots 1..=len in sorted order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Vocabulary {
    values: Vec<String>,
}

impl Vocabulary {
    /// Build from observed values; input is deduplicated and sorted so the
    /// slot assignment is independent of observation order.
    #[must_use]
    pub fn from_observed(mut values: Vec<String>) -> Self {
        values.sort();
        values.dedup();
        Self { values }
    }

    /// One-hot width, including the reserved unknown slot.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len() + 1
    }

    /// Slot for a value; unseen values map to the reserved slot 0.
    #[must_use]
    pub fn slot_of(&self, value: &str) -> usize {
        match self.values.binary_search_by(|v| v.as_str().cmp(value)) {
            Ok(idx) => idx + 1,
            Err(_) => 0,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Min/max scaling statistics frozen at fit time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
}

impl NumericStats {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Scale into [0, 1] with the frozen range; out-of-range prediction-time
    /// values are clamped instead of shifting the range.
    #[must_use]
    pub fn scale(&self, value: f64) -> f32 {
        if !self.min.is_finite() || self.max <= self.min {
            return 0.0;
        }
        (((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)) as f32
    }
}

/// Kind of one layout block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// One-hot encoded categorical field.
    Categorical,
    /// Single min/max-scaled numeric field.
    Numeric,
    /// Single candidate-vacancy interaction feature in [0, 1].
    Cross,
    /// Embedding of one free-text field.
    Text,
}

/// One contiguous region of the feature vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureBlock {
    pub name: String,
    pub kind: BlockKind,
    pub width: usize,
}

/// The frozen feature contract for one model version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSchema {
    pub version: u32,
    pub embedder: EmbedderConfig,
    /// Vocabularies keyed by categorical field name.
    pub categorical: BTreeMap<String, Vocabulary>,
    /// Scaling statistics keyed by numeric field name.
    pub numeric: BTreeMap<String, NumericStats>,
    /// Ordered blocks; concatenation order defines the vector layout.
    pub layout: Vec<FeatureBlock>,
}

impl FeatureSchema {
    /// Total feature vector dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.layout.iter().map(|b| b.width).sum()
    }
}
