//! Persisted model artifact.

use crate::classifier::LogisticRegression;
use horizon_core::{FeatureSet, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Class weights applied during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    pub down: f64,
    pub up: f64,
}

impl ClassWeights {
    /// `n / (2 * n_class)`. `None` unless both classes are present.
    pub fn balanced(labels: &[u8]) -> Option<Self> {
        let n = labels.len() as f64;
        let up = labels.iter().filter(|&&y| y == 1).count();
        let down = labels.len() - up;
        if up == 0 || down == 0 {
            return None;
        }
        Some(Self {
            down: n / (2.0 * down as f64),
            up: n / (2.0 * up as f64),
        })
    }

    pub fn for_label(&self, label: u8) -> f64 {
        if label == 1 {
            self.up
        } else {
            self.down
        }
    }
}

/// Row counts behind a trained model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub up: usize,
    pub down: usize,
}

/// Everything a predictor needs to rebuild the training-time feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub model_version: String,
    pub symbol: String,
    pub horizon_minutes: u32,
    pub training_days: u32,
    /// Declared feature columns, in matrix order.
    pub features: FeatureSet,
    pub use_optional_features: bool,
    pub decision_threshold: f64,
    pub class_weights: Option<ClassWeights>,
    pub trained_at: Timestamp,
    pub data_info: DataInfo,
    pub classifier: LogisticRegression,
}

impl TrainedModel {
    /// `lgr_<symbol>_<YYYYMMDD_HHMM>`.
    pub fn version_for(symbol: &str, trained_at: Timestamp) -> String {
        format!(
            "lgr_{}_{}",
            symbol.to_lowercase(),
            trained_at.format("%Y%m%d_%H%M")
        )
    }

    /// Write the artifact as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
