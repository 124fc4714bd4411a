//! Deterministic text embedder
//!
//! Converts free text into a fixed-length vector with the signed
//! feature-hashing trick: each token hashes to one bucket with a +/-1 sign
//! and the result is L2-normalized. The hash state uses fixed seeds, so the
//! same text and the same embedder version always produce bit-identical
//! vectors. That determinism is what keeps training and prediction in parity.

use crate::schema::EmbedderConfig;
use ahash::RandomState;
use fitscore_core::{Error, Result, Vector};
use std::hash::BuildHasher;

/// Bump when the hashing scheme changes in any output-visible way.
pub const EMBEDDER_VERSION: u32 = 1;

/// Default embedding dimension per free-text field.
pub const DEFAULT_EMBEDDING_DIM: usize = 64;

// Fixed hash seeds. Changing these is an embedder version change.
const SEEDS: (u64, u64, u64, u64) = (
    0x74a7_1c5c_9d2f_01e3,
    0x517c_c1b7_2722_0a95,
    0x9e37_79b9_7f4a_7c15,
    0x2545_f491_4f6c_dd1d,
);

#[derive(Debug, Clone)]
pub struct TextEmbedder {
    dim: usize,
    state: RandomState,
}

impl TextEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            state: RandomState::with_seeds(SEEDS.0, SEEDS.1, SEEDS.2, SEEDS.3),
        }
    }

    /// Build the embedder a frozen schema asks for.
    ///
    /// Fails with a schema mismatch when the recorded embedder version is
    /// not one this build can reproduce; scoring with a different scheme
    /// would silently produce misleading vectors.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        if config.version != EMBEDDER_VERSION {
            return Err(Error::SchemaMismatch(format!(
                "embedder version {} is not available (this build provides {})",
                config.version, EMBEDDER_VERSION
            )));
        }
        if config.dim == 0 {
            return Err(Error::SchemaMismatch(
                "embedder dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self::new(config.dim))
    }

    #[must_use]
    pub fn config(&self) -> EmbedderConfig {
        EmbedderConfig {
            version: EMBEDDER_VERSION,
            dim: self.dim,
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one free-text field.
    ///
    /// Empty or whitespace-only text maps to the zero vector rather than
    /// failing; a missing resume is a legitimate input.
    #[must_use]
    pub fn embed(&self, text: &str) -> Vector {
        let mut components = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();

        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let h = self.state.hash_one(token);
            let bucket = (h % self.dim as u64) as usize;
            let sign = if h & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
            components[bucket] += sign;
        }

        let mut vector = Vector::new(components);
        vector.normalize();
        vector
    }
}
