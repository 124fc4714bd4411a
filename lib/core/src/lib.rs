//! # fitscore-core
//!
//! Core types for the fitscore compatibility engine: canonical candidate,
//! vacancy, and outcome records, the schema normalization boundary that
//! produces them from untyped JSON, the feature vector type, and the error
//! enum shared by every crate in the workspace.

pub mod error;
pub mod normalize;
pub mod record;
pub mod vector;

pub use error::{Error, Result};
pub use record::{
    label_for_status, language_rank, seniority_rank, CandidateRow, OutcomeRecord, VacancyRow,
    MAX_SENIORITY_RANK, UNSPECIFIED,
};
pub use vector::Vector;
