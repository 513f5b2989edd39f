//! Feature fusion.
//!
//! Builds the per-minute feature table from the candle series and the four
//! lagged auxiliary sources:
//!
//! 1. Candle-only indicators on the deduplicated candle series
//! 2. Left-join of each source's lagged minute buckets (constant 0.0 when a
//!    source has no data in the window)
//! 3. Join-dependent indicators (mark basis, VWAP gap, average trade size)
//! 4. Forward fill of lagged columns, then zero fill of everything
//! 5. Warmup trim

use crate::candle::{guarded_ratio, insert_candle_features};
use crate::frame::{Column, FeatureFrame};
use horizon_core::columns::*;
use horizon_core::{floor_to_minute, Candle, Error, Result, Timestamp};
use horizon_ingestion::{
    align_agg_trades, align_depth, align_force_orders, align_mark, LaggedBucket, LaggedBuckets,
    RawSeries,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Leading rows discarded after fusion: 60-minute rolling warmup plus the
/// one-minute lag settle.
pub const WARMUP_ROWS: usize = 61;

/// Columns forward-filled across minutes where their source had no bucket.
pub const FORWARD_FILL_COLUMNS: &[&str] = &[
    SPREAD_BPS,
    IMBALANCE_TOP20,
    MICROPRICE_GAP_BPS,
    MID_PRICE,
    MARK_PRICE_AVG,
    FUNDING_RATE,
    MARK_SPOT_BPS,
    TAKER_BUY_QTY,
    TAKER_SELL_QTY,
    AGG_TRADE_COUNT,
    VWAP_PRICE,
    VWAP_GAP_BPS,
    AVG_TRADE_SIZE_1M,
];

/// Builds fused feature frames. Stateless; every call is a pure function of
/// its input.
#[derive(Debug, Clone)]
pub struct FeatureFusionEngine {
    warmup_rows: usize,
}

impl Default for FeatureFusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureFusionEngine {
    pub fn new() -> Self {
        Self {
            warmup_rows: WARMUP_ROWS,
        }
    }

    /// Fuse raw series into a feature frame.
    ///
    /// Fails with `MissingData` when there are no candles. A frame of at most
    /// `WARMUP_ROWS` rows is returned untrimmed; the caller enforces its own
    /// minimum row count.
    pub fn fuse(&self, raw: &RawSeries) -> Result<FeatureFrame> {
        let candles = dedupe_candles(&raw.candles);
        let symbol = match candles.first() {
            Some(c) => c.symbol.clone(),
            None => return Err(Error::missing_data("no candles in window")),
        };

        let timestamps: Vec<Timestamp> = candles.iter().map(|c| floor_to_minute(c.ts)).collect();
        let mut frame = FeatureFrame::new(symbol, timestamps);
        insert_candle_features(&mut frame, &candles)?;

        join_lagged(&mut frame, &align_depth(&raw.depth), "depth")?;

        let has_mark = join_lagged(&mut frame, &align_mark(&raw.mark), "mark")?;
        let mark_spot = if has_mark {
            derive(&frame, MARK_PRICE_AVG, CLOSE_1M, |mark, close| {
                guarded_ratio(Some(mark - close), Some(close)).map(|r| r * 10_000.0)
            })
        } else {
            vec![Some(0.0); frame.len()]
        };
        frame.insert(MARK_SPOT_BPS, mark_spot)?;

        let has_agg = join_lagged(&mut frame, &align_agg_trades(&raw.agg_trades), "aggtrade")?;
        let (vwap_gap, avg_size) = if has_agg {
            let vwap_gap = derive(&frame, CLOSE_1M, VWAP_PRICE, |close, vwap| {
                guarded_ratio(Some(close - vwap), Some(vwap)).map(|r| r * 10_000.0)
            });
            let qty = derive(&frame, TAKER_BUY_QTY, TAKER_SELL_QTY, |b, s| Some(b + s));
            let count = frame.column(AGG_TRADE_COUNT).unwrap_or_default();
            let avg_size: Column = qty
                .iter()
                .zip(count)
                .map(|(q, c)| guarded_ratio(*q, *c))
                .collect();
            (vwap_gap, avg_size)
        } else {
            (vec![Some(0.0); frame.len()], vec![Some(0.0); frame.len()])
        };
        frame.insert(VWAP_GAP_BPS, vwap_gap)?;
        frame.insert(AVG_TRADE_SIZE_1M, avg_size)?;

        join_lagged(&mut frame, &align_force_orders(&raw.force_orders), "forceorder")?;

        for name in FORWARD_FILL_COLUMNS {
            if let Some(col) = frame.column_mut(name) {
                forward_fill(col);
            }
        }
        for (_, col) in frame.columns_mut() {
            zero_fill(col);
        }

        let rows = frame.len();
        if rows > self.warmup_rows {
            frame = frame.slice_from(self.warmup_rows);
            info!(
                symbol = %frame.symbol(),
                rows = frame.len(),
                trimmed = self.warmup_rows,
                "fused feature frame"
            );
        } else {
            info!(
                symbol = %frame.symbol(),
                rows,
                "fused feature frame shorter than warmup, left untrimmed"
            );
        }
        Ok(frame)
    }
}

/// One candle per minute, ascending. A repeated minute keeps the last candle.
fn dedupe_candles(candles: &[Candle]) -> Vec<&Candle> {
    let mut by_minute: BTreeMap<Timestamp, &Candle> = BTreeMap::new();
    for candle in candles {
        by_minute.insert(floor_to_minute(candle.ts), candle);
    }
    if by_minute.len() < candles.len() {
        debug!(
            duplicates = candles.len() - by_minute.len(),
            "dropped duplicate candle minutes"
        );
    }
    by_minute.into_values().collect()
}

/// Left-join lagged buckets onto the frame's minutes. Returns whether the
/// source had any data; without data every column is constant 0.0.
fn join_lagged<B: LaggedBucket>(
    frame: &mut FeatureFrame,
    buckets: &LaggedBuckets<B>,
    source: &str,
) -> Result<bool> {
    let rows = frame.len();

    if buckets.is_empty() {
        info!(source, "no data for source, using zeros");
        for name in B::COLUMNS {
            frame.insert(*name, vec![Some(0.0); rows])?;
        }
        return Ok(false);
    }

    let mut columns: Vec<Column> = vec![Vec::with_capacity(rows); B::COLUMNS.len()];
    let mut matched = 0usize;
    for ts in frame.timestamps() {
        match buckets.get(*ts) {
            Some(bucket) => {
                matched += 1;
                for (col, value) in columns.iter_mut().zip(bucket.values()) {
                    col.push(value);
                }
            }
            None => {
                for col in columns.iter_mut() {
                    col.push(None);
                }
            }
        }
    }

    let discarded = buckets.len() - matched;
    if discarded > 0 {
        debug!(source, discarded, "lagged buckets outside candle minutes");
    }

    for (name, values) in B::COLUMNS.iter().zip(columns) {
        frame.insert(*name, values)?;
    }
    Ok(true)
}

/// Row-wise combination of two columns; `None` wherever either side is.
fn derive<F>(frame: &FeatureFrame, a: &str, b: &str, f: F) -> Column
where
    F: Fn(f64, f64) -> Option<f64>,
{
    let (Some(a), Some(b)) = (frame.column(a), frame.column(b)) else {
        return vec![None; frame.len()];
    };
    a.iter()
        .zip(b)
        .map(|(x, y)| f((*x)?, (*y)?))
        .collect()
}

/// Carry the last present value forward. Leading gaps stay `None`.
pub fn forward_fill(col: &mut [Option<f64>]) {
    let mut last = None;
    for value in col.iter_mut() {
        match *value {
            Some(v) if v.is_finite() => last = Some(v),
            _ => *value = last,
        }
    }
}

/// Replace every missing or non-finite value with 0.0.
pub fn zero_fill(col: &mut [Option<f64>]) {
    for value in col.iter_mut() {
        if !matches!(*value, Some(v) if v.is_finite()) {
            *value = Some(0.0);
        }
    }
}
