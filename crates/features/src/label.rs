//! Forward-looking direction labels.

use crate::frame::FeatureFrame;
use horizon_core::Direction;
use serde::{Deserialize, Serialize};

/// Label for one row. `Undefined` rows have no future close at the horizon
/// and are excluded from training; they are never treated as "down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Up,
    Down,
    Undefined,
}

impl Label {
    /// Compare a future close against the current close.
    pub fn from_closes(now: Option<f64>, future: Option<f64>) -> Self {
        match (now, future) {
            (Some(now), Some(future)) if now.is_finite() && future.is_finite() => {
                if future > now {
                    Label::Up
                } else {
                    Label::Down
                }
            }
            _ => Label::Undefined,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Label::Up => Some(Direction::Up),
            Label::Down => Some(Direction::Down),
            Label::Undefined => None,
        }
    }

    /// 1 for up, 0 for down, `None` when undefined.
    pub fn as_class(self) -> Option<u8> {
        self.direction().map(Direction::as_class)
    }

    pub fn is_defined(self) -> bool {
        self != Label::Undefined
    }
}

/// Builds labels from the close `horizon` rows ahead.
#[derive(Debug, Clone, Copy)]
pub struct LabelBuilder {
    horizon: usize,
}

impl LabelBuilder {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// One label per row of `frame`. The offset is in rows, so a gap in the
    /// candle series shifts the effective horizon, as in the fused table.
    pub fn build(&self, frame: &FeatureFrame) -> Vec<Label> {
        let Some(close) = frame.close() else {
            return vec![Label::Undefined; frame.len()];
        };
        (0..close.len())
            .map(|i| {
                let future = close.get(i + self.horizon).copied().flatten();
                Label::from_closes(close[i], future)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use horizon_core::columns::CLOSE_1M;

    fn make_frame(closes: &[f64]) -> FeatureFrame {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..closes.len() as i64)
            .map(|i| t0 + Duration::minutes(i))
            .collect();
        let mut frame = FeatureFrame::new("BTCUSDT", ts);
        frame
            .insert(CLOSE_1M, closes.iter().copied().map(Some).collect())
            .unwrap();
        frame
    }

    #[test]
    fn test_horizon_one() {
        let labels = LabelBuilder::new(1).build(&make_frame(&[100.0, 105.0, 95.0, 102.0]));
        assert_eq!(
            labels,
            vec![Label::Up, Label::Down, Label::Up, Label::Undefined]
        );
    }

    #[test]
    fn test_equal_close_is_down() {
        let labels = LabelBuilder::new(1).build(&make_frame(&[100.0, 100.0]));
        assert_eq!(labels[0], Label::Down);
    }

    #[test]
    fn test_tail_is_undefined_not_down() {
        let labels = LabelBuilder::new(3).build(&make_frame(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(labels[1], Label::Up);
        assert!(labels[2..].iter().all(|l| *l == Label::Undefined));
        assert_eq!(labels[4].as_class(), None);
    }

    #[test]
    fn test_classes() {
        assert_eq!(Label::Up.as_class(), Some(1));
        assert_eq!(Label::Down.as_class(), Some(0));
        assert!(!Label::Undefined.is_defined());
        assert_eq!(Label::from_closes(Some(1.0), Some(f64::NAN)), Label::Undefined);
    }
}
