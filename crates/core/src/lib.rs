//! Core types and configuration for the coin-horizon pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Raw market-data observation types (candles, depth, mark, aggtrade, force orders)
//! - Canonical feature column names and the declared `FeatureSet`
//! - Configuration structures
//! - Common error types

pub mod columns;
pub mod config;
pub mod error;
pub mod feature_set;
pub mod types;

pub use config::Config;
pub use error::{Error, Failure, Result};
pub use feature_set::FeatureSet;
pub use types::*;
