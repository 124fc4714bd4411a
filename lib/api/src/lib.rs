//! # fitscore-api
//!
//! HTTP surface for the fitscore service. One REST API over actix-web,
//! sharing a registry, job manager, and prediction engine through
//! [`AppState`].

pub mod rest;

pub use rest::{AppState, RestApi};
