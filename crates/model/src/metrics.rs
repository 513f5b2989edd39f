//! Hold-out evaluation metrics.

use serde::{Deserialize, Serialize};

/// Classification metrics on the test split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Number of evaluated rows.
    pub rows: usize,
    pub accuracy: f64,
    /// Precision of the "up" class.
    pub precision: f64,
    /// Recall of the "up" class.
    pub recall: f64,
    pub f1: f64,
    /// Mean directional accuracy.
    pub mda: f64,
    /// 0.0 when the test labels contain a single class.
    pub roc_auc: f64,
    /// `[[tn, fp], [fn, tp]]`.
    pub confusion_matrix: [[usize; 2]; 2],
    pub predicted_up: usize,
    pub predicted_down: usize,
}

/// Metrics calculator.
pub struct MetricsCalculator {
    threshold: f64,
}

impl MetricsCalculator {
    /// Probabilities at or above `threshold` count as "up".
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Calculate metrics from true labels and predicted up-probabilities.
    pub fn calculate(&self, y_true: &[u8], proba: &[f64]) -> ClassificationMetrics {
        if y_true.is_empty() || y_true.len() != proba.len() {
            return ClassificationMetrics::default();
        }

        let mut cm = [[0usize; 2]; 2];
        for (&y, &p) in y_true.iter().zip(proba) {
            let actual = usize::from(y == 1);
            let predicted = usize::from(p >= self.threshold);
            cm[actual][predicted] += 1;
        }
        let [[tn, fp], [fn_, tp]] = cm;
        let n = y_true.len();

        let ratio = |num: usize, den: usize| {
            if den > 0 {
                num as f64 / den as f64
            } else {
                0.0
            }
        };

        let accuracy = ratio(tp + tn, n);
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        ClassificationMetrics {
            rows: n,
            accuracy,
            precision,
            recall,
            f1,
            // Binary directions: matching directions is plain accuracy.
            mda: accuracy,
            roc_auc: roc_auc(y_true, proba),
            confusion_matrix: cm,
            predicted_up: tp + fp,
            predicted_down: tn + fn_,
        }
    }
}

/// Area under the ROC curve via the rank-sum statistic, with tied scores
/// sharing their average rank. 0.0 when only one class is present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || y_true.len() != scores.len() {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|&(&y, _)| y == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}
