//! Minute alignment of auxiliary series.
//!
//! Sub-minute (depth, mark) and minute-concurrent (aggtrade, force order)
//! observations are grouped by the calendar minute they occurred in,
//! aggregated, and re-keyed to the *following* minute. A bucket built from
//! events in minute `m` can therefore only ever be attached to the row for
//! `m + 1`, never to `m` itself.

use horizon_core::columns::{
    AGG_TRADE_COUNT, FUNDING_RATE, IMBALANCE_TOP20, LIQ_COUNT_1M, MARK_PRICE_AVG,
    MICROPRICE_GAP_BPS, MID_PRICE, SPREAD_BPS, TAKER_BUY_QTY, TAKER_SELL_QTY, VWAP_PRICE,
};
use horizon_core::{
    floor_to_minute, next_minute, AggTradeMinute, DepthSnapshot, ForceOrder, MarkPrice, Timestamp,
    Timestamped,
};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Arithmetic mean that ignores absent and non-finite values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    #[inline]
    pub fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.sum += value;
            self.count += 1;
        }
    }

    #[inline]
    pub fn add_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.add(v);
        }
    }

    /// `None` when nothing was added.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}

/// Per-minute accumulator for one auxiliary source.
pub trait MinuteAccumulator: Default {
    type Observation: Timestamped;
    type Bucket: LaggedBucket;

    fn add(&mut self, obs: &Self::Observation);
    fn finish(&self) -> Self::Bucket;
}

/// An aggregated minute bucket that knows which columns it fills.
pub trait LaggedBucket {
    /// Column names, in the order of [`LaggedBucket::values`].
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Option<f64>>;
}

/// Buckets keyed by the minute they may be attached to (source minute + 1).
#[derive(Debug, Clone)]
pub struct LaggedBuckets<B> {
    buckets: BTreeMap<Timestamp, B>,
}

impl<B> Default for LaggedBuckets<B> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<B> LaggedBuckets<B> {
    /// Bucket attachable to the row for `minute`.
    pub fn get(&self, minute: Timestamp) -> Option<&B> {
        self.buckets.get(&minute)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Attach minutes and buckets in ascending order.
    pub fn iter(&self) -> btree_map::Iter<'_, Timestamp, B> {
        self.buckets.iter()
    }
}

/// Groups observations by minute and applies the one-minute lag.
pub struct MinuteAligner;

impl MinuteAligner {
    /// Aggregate `observations` per minute and re-key each bucket to the next
    /// minute. Input order does not matter.
    pub fn align<A: MinuteAccumulator>(observations: &[A::Observation]) -> LaggedBuckets<A::Bucket> {
        let mut minutes: BTreeMap<Timestamp, A> = BTreeMap::new();
        for obs in observations {
            minutes
                .entry(floor_to_minute(obs.event_time()))
                .or_default()
                .add(obs);
        }

        let buckets = minutes
            .into_iter()
            .map(|(minute, acc)| (next_minute(minute), acc.finish()))
            .collect();

        LaggedBuckets { buckets }
    }
}

/// Depth aggregate for one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBucket {
    pub spread_bps: Option<f64>,
    pub imbalance_top20: Option<f64>,
    pub microprice_gap_bps: Option<f64>,
    pub mid_price: Option<f64>,
}

impl LaggedBucket for DepthBucket {
    const COLUMNS: &'static [&'static str] =
        &[SPREAD_BPS, IMBALANCE_TOP20, MICROPRICE_GAP_BPS, MID_PRICE];

    fn values(&self) -> Vec<Option<f64>> {
        vec![
            self.spread_bps,
            self.imbalance_top20,
            self.microprice_gap_bps,
            self.mid_price,
        ]
    }
}

#[derive(Debug, Default)]
pub struct DepthAccumulator {
    spread_bps: Mean,
    imbalance_top20: Mean,
    microprice_gap_bps: Mean,
    mid_price: Mean,
}

impl MinuteAccumulator for DepthAccumulator {
    type Observation = DepthSnapshot;
    type Bucket = DepthBucket;

    fn add(&mut self, obs: &DepthSnapshot) {
        self.spread_bps.add(obs.spread_bps);
        self.imbalance_top20.add(obs.imbalance_top20);
        self.microprice_gap_bps.add_opt(obs.microprice_gap_bps);
        self.mid_price.add(obs.mid_price);
    }

    fn finish(&self) -> DepthBucket {
        DepthBucket {
            spread_bps: self.spread_bps.value(),
            imbalance_top20: self.imbalance_top20.value(),
            microprice_gap_bps: self.microprice_gap_bps.value(),
            mid_price: self.mid_price.value(),
        }
    }
}

/// Mark price aggregate for one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkBucket {
    pub mark_price_avg: Option<f64>,
    pub funding_rate: Option<f64>,
}

impl LaggedBucket for MarkBucket {
    const COLUMNS: &'static [&'static str] = &[MARK_PRICE_AVG, FUNDING_RATE];

    fn values(&self) -> Vec<Option<f64>> {
        vec![self.mark_price_avg, self.funding_rate]
    }
}

#[derive(Debug, Default)]
pub struct MarkAccumulator {
    mark_price: Mean,
    funding_rate: Mean,
}

impl MinuteAccumulator for MarkAccumulator {
    type Observation = MarkPrice;
    type Bucket = MarkBucket;

    fn add(&mut self, obs: &MarkPrice) {
        self.mark_price.add(obs.mark_price);
        self.funding_rate.add_opt(obs.funding_rate);
    }

    fn finish(&self) -> MarkBucket {
        MarkBucket {
            mark_price_avg: self.mark_price.value(),
            funding_rate: self.funding_rate.value(),
        }
    }
}

/// Aggregated-trade totals for one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct AggTradeBucket {
    pub taker_buy_qty: f64,
    pub taker_sell_qty: f64,
    pub trade_count: u64,
    pub vwap_price: Option<f64>,
}

impl LaggedBucket for AggTradeBucket {
    const COLUMNS: &'static [&'static str] =
        &[TAKER_BUY_QTY, TAKER_SELL_QTY, AGG_TRADE_COUNT, VWAP_PRICE];

    fn values(&self) -> Vec<Option<f64>> {
        vec![
            Some(self.taker_buy_qty),
            Some(self.taker_sell_qty),
            Some(self.trade_count as f64),
            self.vwap_price,
        ]
    }
}

/// Rows are already minute totals, so quantities and counts pass through
/// (summed if a minute repeats) and only the VWAP is averaged.
#[derive(Debug, Default)]
pub struct AggTradeAccumulator {
    taker_buy_qty: f64,
    taker_sell_qty: f64,
    trade_count: u64,
    vwap_price: Mean,
}

impl MinuteAccumulator for AggTradeAccumulator {
    type Observation = AggTradeMinute;
    type Bucket = AggTradeBucket;

    fn add(&mut self, obs: &AggTradeMinute) {
        self.taker_buy_qty += obs.taker_buy_qty;
        self.taker_sell_qty += obs.taker_sell_qty;
        self.trade_count += obs.trade_count as u64;
        self.vwap_price.add_opt(obs.vwap_price);
    }

    fn finish(&self) -> AggTradeBucket {
        AggTradeBucket {
            taker_buy_qty: self.taker_buy_qty,
            taker_sell_qty: self.taker_sell_qty,
            trade_count: self.trade_count,
            vwap_price: self.vwap_price.value(),
        }
    }
}

/// Liquidation count for one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationBucket {
    pub liq_count: u64,
}

impl LaggedBucket for LiquidationBucket {
    const COLUMNS: &'static [&'static str] = &[LIQ_COUNT_1M];

    fn values(&self) -> Vec<Option<f64>> {
        vec![Some(self.liq_count as f64)]
    }
}

#[derive(Debug, Default)]
pub struct LiquidationAccumulator {
    count: u64,
}

impl MinuteAccumulator for LiquidationAccumulator {
    type Observation = ForceOrder;
    type Bucket = LiquidationBucket;

    fn add(&mut self, _obs: &ForceOrder) {
        self.count += 1;
    }

    fn finish(&self) -> LiquidationBucket {
        LiquidationBucket {
            liq_count: self.count,
        }
    }
}

pub fn align_depth(snapshots: &[DepthSnapshot]) -> LaggedBuckets<DepthBucket> {
    MinuteAligner::align::<DepthAccumulator>(snapshots)
}

pub fn align_mark(marks: &[MarkPrice]) -> LaggedBuckets<MarkBucket> {
    MinuteAligner::align::<MarkAccumulator>(marks)
}

pub fn align_agg_trades(trades: &[AggTradeMinute]) -> LaggedBuckets<AggTradeBucket> {
    MinuteAligner::align::<AggTradeAccumulator>(trades)
}

pub fn align_force_orders(orders: &[ForceOrder]) -> LaggedBuckets<LiquidationBucket> {
    MinuteAligner::align::<LiquidationAccumulator>(orders)
}
