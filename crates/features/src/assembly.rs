//! Training and prediction assembly.
//!
//! Both assemblers resolve the declared feature list against the fused frame
//! through [`resolve_columns`], so the two sides always produce the same
//! columns in the same order for the same `FeatureSet`.

use crate::frame::FeatureFrame;
use crate::label::Label;
use horizon_core::{Error, FeatureSet, Result, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Dense row-major feature matrix with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(Error::ColumnLength {
                name: "feature row".to_string(),
                expected: columns.len(),
                got: bad.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split into the first `at` rows and the rest.
    pub fn split_at(&self, at: usize) -> (FeatureMatrix, FeatureMatrix) {
        let at = at.min(self.rows.len());
        let (head, tail) = self.rows.split_at(at);
        (
            FeatureMatrix {
                columns: self.columns.clone(),
                rows: head.to_vec(),
            },
            FeatureMatrix {
                columns: self.columns.clone(),
                rows: tail.to_vec(),
            },
        )
    }
}

/// Per-row metadata carried next to the features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    pub timestamp: Timestamp,
    pub close_now: f64,
}

/// What assembly did to the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Declared features absent from the frame, back-filled with 0.0.
    pub missing_features: Vec<String>,
}

/// Clean training triple.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub matrix: FeatureMatrix,
    /// 1 for up, 0 for down.
    pub labels: Vec<u8>,
    pub meta: Vec<RowMeta>,
    pub report: AssemblyReport,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of up and down labels.
    pub fn class_counts(&self) -> (usize, usize) {
        let up = self.labels.iter().filter(|&&y| y == 1).count();
        (up, self.labels.len() - up)
    }
}

/// Single-row inference input.
#[derive(Debug, Clone)]
pub struct PredictionInput {
    pub matrix: FeatureMatrix,
    pub meta: RowMeta,
    pub report: AssemblyReport,
}

/// Declared columns looked up in the frame. `None` marks a missing column
/// that reads as 0.0.
pub struct ResolvedColumns<'a> {
    pub names: Vec<String>,
    pub columns: Vec<Option<&'a [Option<f64>]>>,
    pub missing: Vec<String>,
}

impl ResolvedColumns<'_> {
    /// Value of column `j` at `row`; `None` when null or non-finite.
    pub fn value(&self, j: usize, row: usize) -> Option<f64> {
        match self.columns[j] {
            Some(col) => col.get(row).copied().flatten().filter(|v| v.is_finite()),
            None => Some(0.0),
        }
    }
}

/// Resolve `features` against `frame`, logging any declared feature the
/// frame does not have.
pub fn resolve_columns<'a>(frame: &'a FeatureFrame, features: &FeatureSet) -> ResolvedColumns<'a> {
    let columns: Vec<Option<&[Option<f64>]>> =
        features.names().iter().map(|n| frame.column(n)).collect();
    let missing: Vec<String> = features
        .names()
        .iter()
        .zip(&columns)
        .filter(|(_, c)| c.is_none())
        .map(|(n, _)| n.clone())
        .collect();

    if !missing.is_empty() {
        warn!(
            code = "FEATURE_MISSING",
            missing = ?missing,
            "declared features absent from frame, filling with 0.0"
        );
    }

    ResolvedColumns {
        names: features.names().to_vec(),
        columns,
        missing,
    }
}

/// Turns a fused, labeled frame into a training set.
#[derive(Debug, Clone)]
pub struct TrainingSetAssembler {
    features: FeatureSet,
}

impl TrainingSetAssembler {
    pub fn new(features: FeatureSet) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Drop rows with an undefined label or any null feature, then split into
    /// matrix, labels and metadata.
    pub fn assemble(&self, frame: &FeatureFrame, labels: &[Label]) -> Result<TrainingSet> {
        if labels.len() != frame.len() {
            return Err(Error::ColumnLength {
                name: "label".to_string(),
                expected: frame.len(),
                got: labels.len(),
            });
        }

        let resolved = resolve_columns(frame, &self.features);
        let close = frame.close();

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut meta = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let Some(class) = label.as_class() else {
                continue;
            };
            let Some(close_now) = close
                .and_then(|c| c[i])
                .filter(|v| v.is_finite())
            else {
                continue;
            };
            let row: Option<Vec<f64>> = (0..resolved.names.len())
                .map(|j| resolved.value(j, i))
                .collect();
            let Some(row) = row else {
                continue;
            };
            rows.push(row);
            targets.push(class);
            meta.push(RowMeta {
                timestamp: frame.timestamps()[i],
                close_now,
            });
        }

        let report = AssemblyReport {
            rows_before: frame.len(),
            rows_after: rows.len(),
            missing_features: resolved.missing,
        };
        let up = targets.iter().filter(|&&y| y == 1).count();
        info!(
            symbol = %frame.symbol(),
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            dropped = report.rows_before - report.rows_after,
            up,
            down = targets.len() - up,
            "assembled training set"
        );

        Ok(TrainingSet {
            matrix: FeatureMatrix::new(resolved.names, rows)?,
            labels: targets,
            meta,
            report,
        })
    }
}

/// Turns the latest row of a fused frame into an inference input.
#[derive(Debug, Clone)]
pub struct PredictionRowAssembler {
    features: FeatureSet,
}

impl PredictionRowAssembler {
    pub fn new(features: FeatureSet) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Take the most recent row; nulls and infinities become 0.0.
    pub fn assemble(&self, frame: &FeatureFrame) -> Result<PredictionInput> {
        let Some(last) = frame.len().checked_sub(1) else {
            return Err(Error::insufficient_data("no rows to predict from"));
        };

        let resolved = resolve_columns(frame, &self.features);
        let row: Vec<f64> = (0..resolved.names.len())
            .map(|j| resolved.value(j, last).unwrap_or(0.0))
            .collect();
        let close_now = frame
            .close()
            .and_then(|c| c[last])
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        let meta = RowMeta {
            timestamp: frame.timestamps()[last],
            close_now,
        };
        let report = AssemblyReport {
            rows_before: frame.len(),
            rows_after: 1,
            missing_features: resolved.missing,
        };

        Ok(PredictionInput {
            matrix: FeatureMatrix::new(resolved.names, vec![row])?,
            meta,
            report,
        })
    }
}
