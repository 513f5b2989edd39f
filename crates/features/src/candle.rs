//! Candle-only indicators.
//!
//! Everything here is computed from candle history up to and including the
//! row's own minute, so no lag is applied.

use crate::frame::{Column, FeatureFrame};
use crate::rolling::{log_return, rolling_mean, rolling_std, rolling_sum};
use chrono::{Datelike, Timelike};
use horizon_core::columns::*;
use horizon_core::{Candle, Result};
use std::f64::consts::PI;

/// Rolling window for the short realized volatility and CVD sums.
pub const SHORT_WINDOW: usize = 15;
/// Rolling window for the long realized volatility and volume z-score.
pub const LONG_WINDOW: usize = 60;

/// Candle-native column names, in insertion order.
pub const CANDLE_COLUMNS: &[&str] = &[
    OPEN_1M,
    HIGH_1M,
    LOW_1M,
    CLOSE_1M,
    VOLUME_1M,
    TRADE_COUNT_1M,
    TAKER_BUY_VOL,
    TAKER_SELL_VOL,
    RET1M_LOG,
    RET5M_LOG,
    RET15M_LOG,
    RET60M_LOG,
    RANGE_BPS_1M,
    RV15M,
    RV60M,
    VOL_Z_60M,
    CVD_1M,
    CVD_15M,
    BUY_RATIO_1M,
    HOUR_SIN,
    HOUR_COS,
    DOW_SIN,
    DOW_COS,
];

/// `numerator / denominator`, `None` on a zero or non-finite result.
#[inline]
pub fn guarded_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let d = denominator?;
    if d == 0.0 {
        return None;
    }
    let r = numerator? / d;
    r.is_finite().then_some(r)
}

/// Realized volatility: rolling std of 1-minute log returns scaled by sqrt(window).
fn realized_vol(ret1: &[Option<f64>], window: usize) -> Column {
    let scale = (window as f64).sqrt();
    rolling_std(ret1, window)
        .into_iter()
        .map(|sd| sd.map(|s| s * scale))
        .collect()
}

/// Write every candle-native column into `frame`. `candles` must be one per
/// row, aligned with the frame's timestamps.
pub fn insert_candle_features(frame: &mut FeatureFrame, candles: &[&Candle]) -> Result<()> {
    let col = |f: fn(&Candle) -> f64| -> Column { candles.iter().map(|c| Some(f(c))).collect() };

    let open = col(|c| c.open);
    let high = col(|c| c.high);
    let low = col(|c| c.low);
    let close = col(|c| c.close);
    let volume = col(|c| c.volume);
    let trade_count = col(|c| c.trade_count as f64);
    let buy_vol = col(|c| c.taker_buy_volume);
    let sell_vol = col(|c| c.taker_sell_volume());

    let ret1 = log_return(&close, 1);
    let ret5 = log_return(&close, 5);
    let ret15 = log_return(&close, SHORT_WINDOW);
    let ret60 = log_return(&close, LONG_WINDOW);

    let range_bps: Column = (0..candles.len())
        .map(|i| {
            let spread = high[i]? - low[i]?;
            guarded_ratio(Some(spread), close[i]).map(|r| r * 10_000.0)
        })
        .collect();

    let rv15 = realized_vol(&ret1, SHORT_WINDOW);
    let rv60 = realized_vol(&ret1, LONG_WINDOW);

    let vol_mean = rolling_mean(&volume, LONG_WINDOW);
    let vol_std = rolling_std(&volume, LONG_WINDOW);
    let vol_z: Column = (0..candles.len())
        .map(|i| {
            let deviation = volume[i]? - vol_mean[i]?;
            guarded_ratio(Some(deviation), vol_std[i])
        })
        .collect();

    let cvd_1m: Column = buy_vol
        .iter()
        .zip(&sell_vol)
        .map(|(b, s)| Some((*b)? - (*s)?))
        .collect();
    let cvd_15m = rolling_sum(&cvd_1m, SHORT_WINDOW);

    let buy_ratio: Column = buy_vol
        .iter()
        .zip(&volume)
        .map(|(b, v)| guarded_ratio(*b, *v))
        .collect();

    let hours: Vec<f64> = frame.timestamps().iter().map(|t| t.hour() as f64).collect();
    let dows: Vec<f64> = frame
        .timestamps()
        .iter()
        .map(|t| t.weekday().num_days_from_monday() as f64)
        .collect();
    let cyclic = |values: &[f64], period: f64, f: fn(f64) -> f64| -> Column {
        values.iter().map(|v| Some(f(2.0 * PI * v / period))).collect()
    };
    let hour_sin = cyclic(&hours, 24.0, f64::sin);
    let hour_cos = cyclic(&hours, 24.0, f64::cos);
    let dow_sin = cyclic(&dows, 7.0, f64::sin);
    let dow_cos = cyclic(&dows, 7.0, f64::cos);

    let columns = [
        open, high, low, close, volume, trade_count, buy_vol, sell_vol, ret1, ret5, ret15, ret60,
        range_bps, rv15, rv60, vol_z, cvd_1m, cvd_15m, buy_ratio, hour_sin, hour_cos, dow_sin,
        dow_cos,
    ];
    for (name, values) in CANDLE_COLUMNS.iter().zip(columns) {
        frame.insert(*name, values)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use horizon_core::Timestamp;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn make_candle(i: i64, close: f64, volume: f64, buy: f64) -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            ts: t0() + Duration::minutes(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
            trade_count: 10,
            taker_buy_volume: buy,
        }
    }

    fn make_frame(candles: &[Candle]) -> FeatureFrame {
        let refs: Vec<&Candle> = candles.iter().collect();
        let mut frame = FeatureFrame::new("BTCUSDT", candles.iter().map(|c| c.ts).collect());
        insert_candle_features(&mut frame, &refs).unwrap();
        frame
    }

    #[test]
    fn test_all_columns_present() {
        let frame = make_frame(&[make_candle(0, 100.0, 10.0, 6.0)]);
        for name in CANDLE_COLUMNS {
            assert!(frame.has_column(name), "missing {name}");
        }
        assert_eq!(frame.column_names().len(), CANDLE_COLUMNS.len());
    }

    #[test]
    fn test_flow_columns() {
        let frame = make_frame(&[make_candle(0, 100.0, 10.0, 6.0)]);
        assert_relative_eq!(frame.value(TAKER_SELL_VOL, 0).unwrap(), 4.0);
        assert_relative_eq!(frame.value(CVD_1M, 0).unwrap(), 2.0);
        assert_relative_eq!(frame.value(BUY_RATIO_1M, 0).unwrap(), 0.6);
        assert_relative_eq!(frame.value(RANGE_BPS_1M, 0).unwrap(), 200.0);
    }

    #[test]
    fn test_zero_volume_buy_ratio_is_null() {
        let frame = make_frame(&[make_candle(0, 100.0, 0.0, 0.0)]);
        assert_eq!(frame.value(BUY_RATIO_1M, 0), None);
    }

    #[test]
    fn test_rolling_warmup() {
        let candles: Vec<Candle> = (0..70)
            .map(|i| make_candle(i, 100.0 + (i % 3) as f64, 10.0 + (i % 4) as f64, 5.0))
            .collect();
        let frame = make_frame(&candles);

        assert_eq!(frame.value(RET1M_LOG, 0), None);
        assert!(frame.value(RET1M_LOG, 1).is_some());
        assert_eq!(frame.value(RV15M, 14), None);
        assert!(frame.value(RV15M, 15).is_some());
        assert_eq!(frame.value(RV60M, 59), None);
        assert!(frame.value(RV60M, 60).is_some());
        assert_eq!(frame.value(RET60M_LOG, 59), None);
        assert!(frame.value(RET60M_LOG, 60).is_some());
        assert!(frame.value(VOL_Z_60M, 59).is_some());
        assert_eq!(frame.value(CVD_15M, 13), None);
        assert_relative_eq!(frame.value(CVD_15M, 14).unwrap(), cvd_sum(&candles[0..15]));
    }

    fn cvd_sum(candles: &[Candle]) -> f64 {
        candles
            .iter()
            .map(|c| c.taker_buy_volume - c.taker_sell_volume())
            .sum()
    }

    #[test]
    fn test_constant_volume_zscore_is_null() {
        let candles: Vec<Candle> = (0..61).map(|i| make_candle(i, 100.0, 10.0, 5.0)).collect();
        let frame = make_frame(&candles);
        assert_eq!(frame.value(VOL_Z_60M, 60), None);
    }

    #[test]
    fn test_cyclic_time() {
        let frame = make_frame(&[make_candle(6 * 60, 100.0, 1.0, 0.5)]);
        // 06:00 UTC on a Monday.
        assert_relative_eq!(frame.value(HOUR_SIN, 0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.value(HOUR_COS, 0).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.value(DOW_SIN, 0).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.value(DOW_COS, 0).unwrap(), 1.0, epsilon = 1e-12);
    }
}
