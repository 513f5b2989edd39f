//! Configuration structures for the coin-horizon pipeline.

use crate::error::{Error, Result};
use crate::feature_set::FeatureSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Window, horizon and row-threshold configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Classifier training configuration.
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Config {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        let t = &self.training;

        if p.symbol.trim().is_empty() {
            return Err(Error::config("symbol must not be empty"));
        }
        if p.horizon_minutes == 0 {
            return Err(Error::config("horizon_minutes must be positive"));
        }
        if p.training_days == 0 {
            return Err(Error::config("training_days must be positive"));
        }
        if p.prediction_minutes == 0 {
            return Err(Error::config("prediction_minutes must be positive"));
        }
        if !(t.train_fraction > 0.0 && t.train_fraction < 1.0) {
            return Err(Error::config(format!(
                "train_fraction must be in (0, 1), got {}",
                t.train_fraction
            )));
        }
        if !(0.0..=1.0).contains(&t.decision_threshold) {
            return Err(Error::config(format!(
                "decision_threshold must be in [0, 1], got {}",
                t.decision_threshold
            )));
        }
        if t.learning_rate <= 0.0 || t.max_iter == 0 {
            return Err(Error::config("learning_rate and max_iter must be positive"));
        }
        if t.l2 < 0.0 {
            return Err(Error::config("l2 must be non-negative"));
        }
        Ok(())
    }

    /// The declared feature set for this configuration.
    pub fn feature_set(&self) -> FeatureSet {
        FeatureSet::canonical(self.pipeline.use_optional_features)
    }
}

/// Window, horizon and minimum-row configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trading symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Minutes ahead used to define the target.
    pub horizon_minutes: u32,
    /// Days of history used for training.
    pub training_days: u32,
    /// Minutes of recent history used for prediction (warmup is added on top).
    pub prediction_minutes: u32,
    /// Training requires at least `horizon_minutes + min_raw_rows_margin` fused rows.
    pub min_raw_rows_margin: usize,
    /// Minimum rows left after label/feature cleaning.
    pub min_training_rows: usize,
    /// Minimum fused rows for a prediction.
    pub min_prediction_rows: usize,
    /// Append ret60m_log and hour/weekday encodings to the base features.
    pub use_optional_features: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            horizon_minutes: 60,
            training_days: 7,
            prediction_minutes: 180,
            min_raw_rows_margin: 50,
            min_training_rows: 100,
            min_prediction_rows: 10,
            use_optional_features: false,
        }
    }
}

/// Classifier training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Leading fraction of rows used for training (chronological split).
    pub train_fraction: f64,
    /// Weight classes inversely to their frequency.
    pub use_class_weight: bool,
    /// Probability at or above which the prediction is "up".
    pub decision_threshold: f64,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Maximum gradient descent iterations.
    pub max_iter: usize,
    /// Stop once the loss improves by less than this.
    pub tolerance: f64,
    /// L2 penalty on coefficients.
    pub l2: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            use_class_weight: true,
            decision_threshold: 0.5,
            learning_rate: 0.05,
            max_iter: 500,
            tolerance: 1e-7,
            l2: 1e-3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.horizon_minutes, 60);
        assert_eq!(config.pipeline.min_training_rows, 100);
        assert_eq!(config.training.train_fraction, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            Config::from_json_str(r#"{"pipeline": {"symbol": "ETHUSDT", "horizon_minutes": 15}}"#)
                .unwrap();
        assert_eq!(config.pipeline.symbol, "ETHUSDT");
        assert_eq!(config.pipeline.horizon_minutes, 15);
        assert_eq!(config.pipeline.training_days, 7);
        assert!(config.training.use_class_weight);
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let err = Config::from_json_str(r#"{"pipeline": {"horizon_minutes": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_split() {
        let mut config = Config::default();
        config.training.train_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feature_set_follows_flag() {
        let mut config = Config::default();
        assert_eq!(config.feature_set().len(), 24);
        config.pipeline.use_optional_features = true;
        assert_eq!(config.feature_set().len(), 29);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"training": {"decision_threshold": 0.6}}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.training.decision_threshold, 0.6);
        assert_eq!(config.pipeline.symbol, "BTCUSDT");

        std::fs::write(&path, r#"{"training": {"decision_threshold": 1.5}}"#).unwrap();
        assert_eq!(Config::from_json_file(&path).unwrap_err().code(), "CONFIG_INVALID");

        let missing = Config::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(missing.code(), "IO");
    }
}
