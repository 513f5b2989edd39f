//! Fixed-size rolling windows over a per-minute series.
//!
//! A statistic is only defined once the window holds `window` values and
//! none of them is missing, so the first `window - 1` rows of any rolling
//! column are `None`.

use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Rolling window of the last `window` observations.
pub struct RollingWindow {
    window: usize,
    values: VecDeque<Option<f64>>,
    /// Missing observations currently inside the window.
    missing: usize,
}

impl RollingWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window),
            missing: 0,
        }
    }

    /// Push an observation, evicting the oldest once the window is full.
    pub fn push(&mut self, value: Option<f64>) {
        if self.values.len() >= self.window {
            if let Some(None) = self.values.pop_front() {
                self.missing -= 1;
            }
        }
        let value = value.filter(|v| v.is_finite());
        if value.is_none() {
            self.missing += 1;
        }
        self.values.push_back(value);
    }

    /// Window is full and holds no missing values.
    pub fn is_ready(&self) -> bool {
        self.window > 0 && self.values.len() == self.window && self.missing == 0
    }

    fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }

    pub fn sum(&self) -> Option<f64> {
        self.is_ready().then(|| self.present().sum())
    }

    pub fn mean(&self) -> Option<f64> {
        self.is_ready().then(|| self.present().mean())
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        if self.window < 2 || !self.is_ready() {
            return None;
        }
        let sd = self.present().std_dev();
        sd.is_finite().then_some(sd)
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }
}

fn rolling_map<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&RollingWindow) -> Option<f64>,
{
    let mut roll = RollingWindow::new(window);
    values
        .iter()
        .map(|v| {
            roll.push(*v);
            stat(&roll)
        })
        .collect()
}

/// Rolling sum, aligned to the last row of each window.
pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_map(values, window, RollingWindow::sum)
}

/// Rolling mean, aligned to the last row of each window.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_map(values, window, RollingWindow::mean)
}

/// Rolling sample standard deviation, aligned to the last row of each window.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_map(values, window, RollingWindow::std_dev)
}

/// `ln(x[i] / x[i - lag])`; `None` for the first `lag` rows and for
/// non-positive prices.
pub fn log_return(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let prev = values.get(i.checked_sub(lag)?).copied().flatten()?;
            let cur = values[i]?;
            if prev > 0.0 && cur > 0.0 {
                let r = (cur / prev).ln();
                r.is_finite().then_some(r)
            } else {
                None
            }
        })
        .collect()
}
