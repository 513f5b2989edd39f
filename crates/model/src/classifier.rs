//! Binary direction classifier.
//!
//! The pipeline only needs `fit` and `predict_proba`; [`LogisticRegression`]
//! is the default implementation.

use horizon_core::{Error, Result};
use horizon_features::FeatureMatrix;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

/// A probabilistic binary classifier over a feature matrix.
pub trait Classifier {
    /// Fit on labels `y` (1 = up, 0 = down) with optional per-row weights.
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8], sample_weights: Option<&[f64]>) -> Result<()>;

    /// Probability of the "up" class for each row.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// Per-column standardization captured at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Standardizer {
    /// Column means and population standard deviations. A constant column
    /// gets a scale of 1.
    pub fn fit(rows: &[Vec<f64>], n_cols: usize) -> Self {
        let mut means = Vec::with_capacity(n_cols);
        let mut stds = Vec::with_capacity(n_cols);
        for j in 0..n_cols {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let mean = column.iter().mean();
            let sd = column.iter().population_std_dev();
            means.push(if mean.is_finite() { mean } else { 0.0 });
            stds.push(if sd.is_finite() && sd > 0.0 { sd } else { 1.0 });
        }
        Self { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Hyperparameters for [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    /// L2 penalty on coefficients (the intercept is not penalized).
    pub l2: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            max_iter: 500,
            tolerance: 1e-7,
            l2: 1e-3,
        }
    }
}

/// Fitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticFit {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub scaler: Standardizer,
    /// Iterations run before convergence or `max_iter`.
    pub iterations: usize,
    pub final_loss: f64,
}

/// L2-regularized logistic regression trained by batch gradient descent on
/// standardized features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticParams,
    pub state: Option<LogisticFit>,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self { params, state: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.state.as_ref().map(|f| f.coefficients.len())
    }

    /// Weighted mean log loss plus the L2 term.
    fn loss(&self, z: &[f64], y: &[f64], w: &[f64], w_sum: f64, beta: &[f64]) -> f64 {
        let eps = 1e-15;
        let data: f64 = z
            .iter()
            .zip(y)
            .zip(w)
            .map(|((&z, &y), &w)| {
                let p = sigmoid(z).clamp(eps, 1.0 - eps);
                -w * (y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum();
        data / w_sum + 0.5 * self.params.l2 * dot(beta, beta)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8], sample_weights: Option<&[f64]>) -> Result<()> {
        let n = x.n_rows();
        let k = x.n_cols();
        if n == 0 {
            return Err(Error::model("cannot fit on an empty matrix"));
        }
        if y.len() != n {
            return Err(Error::model(format!("{} labels for {} rows", y.len(), n)));
        }
        let weights: Vec<f64> = match sample_weights {
            Some(w) if w.len() != n => {
                return Err(Error::model(format!("{} weights for {} rows", w.len(), n)));
            }
            Some(w) => w.to_vec(),
            None => vec![1.0; n],
        };
        let w_sum: f64 = weights.iter().sum();
        if !(w_sum > 0.0) {
            return Err(Error::model("sample weights must sum to a positive value"));
        }

        let scaler = Standardizer::fit(x.rows(), k);
        let xs: Vec<Vec<f64>> = x.rows().iter().map(|r| scaler.transform_row(r)).collect();
        let targets: Vec<f64> = y.iter().map(|&v| if v == 1 { 1.0 } else { 0.0 }).collect();

        let lr = self.params.learning_rate;
        let mut beta = vec![0.0; k];
        let mut bias = 0.0;
        let mut prev_loss = f64::INFINITY;
        let mut loss = f64::INFINITY;
        let mut iterations = 0;

        for iter in 0..self.params.max_iter {
            iterations = iter + 1;
            let z: Vec<f64> = xs.iter().map(|r| dot(r, &beta) + bias).collect();

            let mut grad = vec![0.0; k];
            let mut grad_bias = 0.0;
            for (i, row) in xs.iter().enumerate() {
                let err = weights[i] * (sigmoid(z[i]) - targets[i]);
                grad_bias += err;
                for (g, v) in grad.iter_mut().zip(row) {
                    *g += err * v;
                }
            }
            for (g, b) in grad.iter_mut().zip(&beta) {
                *g = *g / w_sum + self.params.l2 * b;
            }
            grad_bias /= w_sum;

            loss = self.loss(&z, &targets, &weights, w_sum, &beta);

            for (b, g) in beta.iter_mut().zip(&grad) {
                *b -= lr * g;
            }
            bias -= lr * grad_bias;

            if (prev_loss - loss).abs() < self.params.tolerance {
                debug!(iteration = iter, loss, "logistic regression converged");
                break;
            }
            prev_loss = loss;
        }

        self.state = Some(LogisticFit {
            coefficients: beta,
            intercept: bias,
            scaler,
            iterations,
            final_loss: loss,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let fit = self
            .state
            .as_ref()
            .ok_or_else(|| Error::model("model has not been fitted"))?;
        if x.n_cols() != fit.coefficients.len() {
            return Err(Error::model(format!(
                "expected {} features, got {}",
                fit.coefficients.len(),
                x.n_cols()
            )));
        }
        Ok(x
            .rows()
            .iter()
            .map(|r| sigmoid(dot(&fit.scaler.transform_row(r), &fit.coefficients) + fit.intercept))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let cols = (0..rows[0].len()).map(|j| format!("f{j}")).collect();
        FeatureMatrix::new(cols, rows).unwrap()
    }

    /// Up when the first feature is positive; second feature is noise-free constant.
    fn make_separable(n: usize) -> (FeatureMatrix, Vec<u8>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 - (n / 2) as f64 + 0.5, 7.0])
            .collect();
        let y = rows.iter().map(|r| u8::from(r[0] > 0.0)).collect();
        (make_matrix(rows), y)
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(50.0) > 0.99);
        assert!(sigmoid(-50.0) < 0.01);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_fit_separable() {
        let (x, y) = make_separable(40);
        let mut model = LogisticRegression::new(LogisticParams {
            learning_rate: 0.5,
            max_iter: 2000,
            ..Default::default()
        });
        model.fit(&x, &y, None).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for (p, label) in proba.iter().zip(&y) {
            assert_eq!(u8::from(*p >= 0.5), *label);
        }
        let fit = model.state.as_ref().unwrap();
        assert!(fit.coefficients[0] > 0.0);
        // Constant column is not scaled to infinity.
        assert_relative_eq!(fit.scaler.stds[1], 1.0);
    }

    #[test]
    fn test_weights_shift_probability() {
        let x = make_matrix(vec![vec![0.0], vec![0.0], vec![0.0], vec![0.0]]);
        let y = vec![1, 0, 0, 0];
        let mut unweighted = LogisticRegression::default();
        unweighted.fit(&x, &y, None).unwrap();
        let mut weighted = LogisticRegression::default();
        weighted.fit(&x, &y, Some(&[3.0, 1.0, 1.0, 1.0][..])).unwrap();

        let p_unweighted = unweighted.predict_proba(&x).unwrap()[0];
        let p_weighted = weighted.predict_proba(&x).unwrap()[0];
        assert!(p_unweighted < 0.5);
        assert!(p_weighted > p_unweighted);
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let x = make_matrix(vec![vec![1.0, 2.0]]);
        assert!(LogisticRegression::default().predict_proba(&x).is_err());

        let mut model = LogisticRegression::default();
        assert!(model.fit(&x, &[1, 0], None).is_err());
        assert!(model.fit(&x, &[1], Some(&[1.0, 1.0][..])).is_err());

        model.fit(&x, &[1], None).unwrap();
        let wrong = make_matrix(vec![vec![1.0]]);
        assert!(model.predict_proba(&wrong).is_err());
    }

    #[test]
    fn test_serde_round_trip_keeps_probabilities() {
        let (x, y) = make_separable(20);
        let mut model = LogisticRegression::default();
        model.fit(&x, &y, None).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: LogisticRegression = serde_json::from_str(&json).unwrap();
        assert_eq!(
            model.predict_proba(&x).unwrap(),
            restored.predict_proba(&x).unwrap()
        );
    }
}
