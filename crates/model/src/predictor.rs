//! Inference on the latest fused row.

use crate::artifact::TrainedModel;
use crate::classifier::Classifier;
use horizon_core::{Config, Direction, Error, FetchWindow, Result, Timestamp};
use horizon_features::{FeatureFusionEngine, PredictionRowAssembler, WARMUP_ROWS};
use horizon_ingestion::{RawSeries, RawSeriesFetcher};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One direction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub symbol: String,
    /// Minute of the row the prediction was made from.
    pub timestamp: Timestamp,
    pub close_now: f64,
    /// Probability of the "up" class.
    pub probability: f64,
    pub direction: Direction,
    pub model_version: String,
    pub features_used: Vec<String>,
}

/// Serves a trained model against fresh raw data.
pub struct Predictor {
    model: TrainedModel,
    assembler: PredictionRowAssembler,
    fusion: FeatureFusionEngine,
    prediction_minutes: u32,
    min_rows: usize,
}

impl Predictor {
    pub fn new(model: TrainedModel, prediction_minutes: u32, min_rows: usize) -> Self {
        Self {
            assembler: PredictionRowAssembler::new(model.features.clone()),
            model,
            fusion: FeatureFusionEngine::new(),
            prediction_minutes,
            min_rows,
        }
    }

    /// Window and row threshold taken from the pipeline config.
    pub fn from_config(model: TrainedModel, config: &Config) -> Self {
        Self::new(
            model,
            config.pipeline.prediction_minutes,
            config.pipeline.min_prediction_rows,
        )
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Predict from the `prediction_minutes` (plus warmup) ending at `now`.
    pub fn predict<F>(&self, fetcher: &F, now: Timestamp) -> Result<Prediction>
    where
        F: RawSeriesFetcher + ?Sized,
    {
        let minutes = u32::try_from(WARMUP_ROWS)
            .ok()
            .and_then(|warmup| self.prediction_minutes.checked_add(warmup))
            .ok_or_else(|| {
                Error::config(format!(
                    "prediction_minutes {} plus warmup overflows",
                    self.prediction_minutes
                ))
            })?;
        let window = FetchWindow::trailing_minutes(self.model.symbol.as_str(), now, minutes);
        let raw = RawSeries::fetch(fetcher, &window)?;
        if raw.candles.is_empty() {
            return Err(Error::missing_data(format!(
                "no candles for {} in the last {minutes} minutes",
                self.model.symbol
            )));
        }

        let frame = self.fusion.fuse(&raw)?;
        if frame.len() < self.min_rows {
            return Err(Error::insufficient_data(format!(
                "not enough rows for prediction (need >= {}), rows={}",
                self.min_rows,
                frame.len()
            )));
        }

        let input = self.assembler.assemble(&frame)?;
        let probability = self
            .model
            .classifier
            .predict_proba(&input.matrix)?
            .first()
            .copied()
            .ok_or_else(|| Error::model("classifier returned no probability"))?;
        let direction = if probability >= self.model.decision_threshold {
            Direction::Up
        } else {
            Direction::Down
        };

        info!(
            symbol = %self.model.symbol,
            timestamp = %input.meta.timestamp,
            probability,
            direction = direction.as_str(),
            "prediction"
        );

        Ok(Prediction {
            symbol: self.model.symbol.clone(),
            timestamp: input.meta.timestamp,
            close_now: input.meta.close_now,
            probability,
            direction,
            model_version: self.model.model_version.clone(),
            features_used: input.matrix.columns().to_vec(),
        })
    }
}
