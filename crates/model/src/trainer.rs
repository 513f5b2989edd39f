//! Training orchestration.
//!
//! fetch -> fuse -> label -> assemble -> chronological split -> fit ->
//! evaluate on the held-out tail.

use crate::artifact::{ClassWeights, DataInfo, TrainedModel};
use crate::classifier::{Classifier, LogisticParams, LogisticRegression};
use crate::metrics::{ClassificationMetrics, MetricsCalculator};
use chrono::{SubsecRound, Utc};
use horizon_core::{Config, Error, FetchWindow, Result, Timestamp};
use horizon_features::{FeatureFusionEngine, LabelBuilder, TrainingSet, TrainingSetAssembler};
use horizon_ingestion::{RawSeries, RawSeriesFetcher};
use tracing::{info, warn};

/// A trained model and its hold-out metrics.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub metrics: ClassificationMetrics,
}

/// Trains a direction classifier for one symbol.
pub struct Trainer {
    config: Config,
    fusion: FeatureFusionEngine,
}

impl Trainer {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fusion: FeatureFusionEngine::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Train on the `training_days` ending at `end`.
    pub fn train<F>(&self, fetcher: &F, end: Timestamp) -> Result<TrainingOutcome>
    where
        F: RawSeriesFetcher + ?Sized,
    {
        let p = &self.config.pipeline;
        let window = FetchWindow::trailing_days(p.symbol.as_str(), end, p.training_days);
        info!(
            symbol = %p.symbol,
            days = p.training_days,
            horizon = p.horizon_minutes,
            "loading training window"
        );

        let raw = RawSeries::fetch(fetcher, &window)?;
        if raw.candles.is_empty() {
            return Err(Error::missing_data(format!(
                "no candles for {} in the last {} days",
                p.symbol, p.training_days
            )));
        }

        let frame = self.fusion.fuse(&raw)?;
        let horizon = p.horizon_minutes as usize;
        let min_raw_rows = horizon + p.min_raw_rows_margin;
        if frame.len() < min_raw_rows {
            return Err(Error::insufficient_data(format!(
                "not enough rows for training (need >= {min_raw_rows}), rows={}",
                frame.len()
            )));
        }

        let labels = LabelBuilder::new(horizon).build(&frame);
        let set = TrainingSetAssembler::new(self.config.feature_set()).assemble(&frame, &labels)?;
        if set.len() < p.min_training_rows {
            return Err(Error::insufficient_data(format!(
                "after cleaning, not enough rows (need >= {}), rows={}",
                p.min_training_rows,
                set.len()
            )));
        }

        self.fit(set)
    }

    /// Split, fit and evaluate an assembled training set.
    pub fn fit(&self, set: TrainingSet) -> Result<TrainingOutcome> {
        let p = &self.config.pipeline;
        let t = &self.config.training;

        let n = set.len();
        let split = (n as f64 * t.train_fraction).floor() as usize;
        if split == 0 || split >= n {
            return Err(Error::insufficient_data(format!(
                "train/test split of {n} rows at {} leaves an empty side",
                t.train_fraction
            )));
        }
        let (x_train, x_test) = set.matrix.split_at(split);
        let (y_train, y_test) = set.labels.split_at(split);
        info!(train_rows = split, test_rows = n - split, "chronological split");

        let class_weights = if t.use_class_weight {
            let weights = ClassWeights::balanced(y_train);
            match &weights {
                Some(w) => info!(down = w.down, up = w.up, "balanced class weights"),
                None => warn!("single class in train split, class weights skipped"),
            }
            weights
        } else {
            None
        };
        let sample_weights: Option<Vec<f64>> =
            class_weights.map(|w| y_train.iter().map(|&y| w.for_label(y)).collect());

        let mut classifier = LogisticRegression::new(LogisticParams {
            learning_rate: t.learning_rate,
            max_iter: t.max_iter,
            tolerance: t.tolerance,
            l2: t.l2,
        });
        classifier.fit(&x_train, y_train, sample_weights.as_deref())?;

        let proba = classifier.predict_proba(&x_test)?;
        let metrics = MetricsCalculator::new(t.decision_threshold).calculate(y_test, &proba);
        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            roc_auc = metrics.roc_auc,
            "evaluated on test split"
        );

        let (up, down) = set.class_counts();
        let trained_at = Utc::now().trunc_subsecs(0);
        let model = TrainedModel {
            model_version: TrainedModel::version_for(&p.symbol, trained_at),
            symbol: p.symbol.clone(),
            horizon_minutes: p.horizon_minutes,
            training_days: p.training_days,
            features: self.config.feature_set(),
            use_optional_features: p.use_optional_features,
            decision_threshold: t.decision_threshold,
            class_weights,
            trained_at,
            data_info: DataInfo {
                total_rows: n,
                train_rows: split,
                test_rows: n - split,
                up,
                down,
            },
            classifier,
        };
        info!(model_version = %model.model_version, "model trained");

        Ok(TrainingOutcome { model, metrics })
    }
}
