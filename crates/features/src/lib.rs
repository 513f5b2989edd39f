//! Feature computation for the coin-horizon pipeline.
//!
//! This crate handles:
//! - Rolling-window statistics and candle-only indicators
//! - Fusion of the lagged auxiliary sources onto the candle timeline
//! - Forward-looking labels
//! - Training and prediction assembly against a declared `FeatureSet`

pub mod assembly;
pub mod candle;
pub mod frame;
pub mod fusion;
pub mod label;
pub mod rolling;

pub use assembly::{
    AssemblyReport, FeatureMatrix, PredictionInput, PredictionRowAssembler, RowMeta, TrainingSet,
    TrainingSetAssembler,
};
pub use frame::FeatureFrame;
pub use fusion::{FeatureFusionEngine, WARMUP_ROWS};
pub use label::{Label, LabelBuilder};
pub use rolling::RollingWindow;
