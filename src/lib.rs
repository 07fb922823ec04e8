//! # tm-stats
//!
//! Faction outcome statistics from Terra Mystica game logs.
//!
//! ## Architecture
//!
//! - **models**: Game records, factions, rule options and normalized outcomes
//! - **ingest**: Game admission and per-faction outcome extraction
//! - **calculate**: Streaming moments, bucket keys and aggregation
//! - **ratings**: Player skill tiers
//! - **storage**: Game files, outcome cache and bucket tables
//! - **pipeline**: Full runs over a games directory
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod ratings;
pub mod storage;

pub use models::*;
