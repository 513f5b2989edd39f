//! Direction classifier training and inference for the coin-horizon pipeline.
//!
//! This crate handles:
//! - The `Classifier` seam and its logistic-regression default
//! - Hold-out evaluation metrics
//! - Training and prediction orchestration over a raw-series fetcher
//! - The persisted model artifact

pub mod artifact;
pub mod classifier;
pub mod metrics;
pub mod predictor;
pub mod trainer;

pub use artifact::{ClassWeights, DataInfo, TrainedModel};
pub use classifier::{Classifier, LogisticParams, LogisticRegression};
pub use metrics::{ClassificationMetrics, MetricsCalculator};
pub use predictor::{Prediction, Predictor};
pub use trainer::{Trainer, TrainingOutcome};
