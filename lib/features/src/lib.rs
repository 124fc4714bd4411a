//! # fitscore-features
//!
//! Feature layer for the fitscore compatibility engine.
//!
//! Three pieces with one shared contract:
//!
//! - [`schema::FeatureSchema`] — the frozen specification of vocabularies,
//!   scaling statistics, embedder identity, and vector layout for one model
//!   version. Fitted from the training partition only.
//! - [`embedder::TextEmbedder`] — deterministic signed feature hashing for
//!   free-text fields.
//! - [`assembler::FeatureAssembler`] — turns a (candidate, vacancy) pair
//!   into a feature vector under a frozen schema; unseen categorical values
//!   map to a reserved unknown slot instead of failing.

pub mod assembler;
pub mod embedder;
pub mod schema;

pub use assembler::{fit_schema, FeatureAssembler};
pub use embedder::{TextEmbedder, DEFAULT_EMBEDDING_DIM, EMBEDDER_VERSION};
pub use schema::{
    BlockKind, EmbedderConfig, FeatureBlock, FeatureSchema, NumericStats, Vocabulary,
    SCHEMA_VERSION,
};
