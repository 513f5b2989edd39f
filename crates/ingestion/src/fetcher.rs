//! Raw series retrieval.
//!
//! A fetcher returns one source's observations for a symbol and half-open
//! window, ascending by event time. An empty window is an empty vector, not an
//! error.

use horizon_core::{
    AggTradeMinute, Candle, DepthSnapshot, FetchWindow, ForceOrder, MarkPrice, Result, Timestamped,
};
use tracing::debug;

/// Read-only access to the five raw market-data sources.
pub trait RawSeriesFetcher {
    /// 1-minute candles.
    fn candles(&self, window: &FetchWindow) -> Result<Vec<Candle>>;
    /// Order-book depth snapshots.
    fn depth(&self, window: &FetchWindow) -> Result<Vec<DepthSnapshot>>;
    /// Mark price / funding snapshots.
    fn mark(&self, window: &FetchWindow) -> Result<Vec<MarkPrice>>;
    /// Per-minute aggregated trades.
    fn agg_trades(&self, window: &FetchWindow) -> Result<Vec<AggTradeMinute>>;
    /// Liquidation events.
    fn force_orders(&self, window: &FetchWindow) -> Result<Vec<ForceOrder>>;
}

/// All five sources fetched for one window.
#[derive(Debug, Clone, Default)]
pub struct RawSeries {
    pub candles: Vec<Candle>,
    pub depth: Vec<DepthSnapshot>,
    pub mark: Vec<MarkPrice>,
    pub agg_trades: Vec<AggTradeMinute>,
    pub force_orders: Vec<ForceOrder>,
}

impl RawSeries {
    /// Fetch every source for `window`.
    pub fn fetch<F: RawSeriesFetcher + ?Sized>(fetcher: &F, window: &FetchWindow) -> Result<Self> {
        let series = Self {
            candles: fetcher.candles(window)?,
            depth: fetcher.depth(window)?,
            mark: fetcher.mark(window)?,
            agg_trades: fetcher.agg_trades(window)?,
            force_orders: fetcher.force_orders(window)?,
        };
        debug!(
            symbol = %window.symbol,
            candles = series.candles.len(),
            depth = series.depth.len(),
            mark = series.mark.len(),
            agg_trades = series.agg_trades.len(),
            force_orders = series.force_orders.len(),
            "fetched raw series"
        );
        Ok(series)
    }
}

/// Observations that belong to a symbol.
pub trait SymbolScoped {
    fn symbol(&self) -> &str;
}

macro_rules! symbol_scoped {
    ($($ty:ty),*) => {
        $(impl SymbolScoped for $ty {
            fn symbol(&self) -> &str {
                &self.symbol
            }
        })*
    };
}

symbol_scoped!(Candle, DepthSnapshot, MarkPrice, AggTradeMinute, ForceOrder);

/// Restrict to the window's symbol and time range, ascending by event time.
pub fn select_window<T>(items: &[T], window: &FetchWindow) -> Vec<T>
where
    T: Clone + Timestamped + SymbolScoped,
{
    let mut out: Vec<T> = items
        .iter()
        .filter(|item| item.symbol() == window.symbol && window.contains(item.event_time()))
        .cloned()
        .collect();
    out.sort_by_key(|item| item.event_time());
    out
}

/// In-memory raw store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub candles: Vec<Candle>,
    pub depth: Vec<DepthSnapshot>,
    pub mark: Vec<MarkPrice>,
    pub agg_trades: Vec<AggTradeMinute>,
    pub force_orders: Vec<ForceOrder>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, candles: Vec<Candle>) -> Self {
        self.candles = candles;
        self
    }

    pub fn with_depth(mut self, depth: Vec<DepthSnapshot>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_mark(mut self, mark: Vec<MarkPrice>) -> Self {
        self.mark = mark;
        self
    }

    pub fn with_agg_trades(mut self, agg_trades: Vec<AggTradeMinute>) -> Self {
        self.agg_trades = agg_trades;
        self
    }

    pub fn with_force_orders(mut self, force_orders: Vec<ForceOrder>) -> Self {
        self.force_orders = force_orders;
        self
    }
}

impl RawSeriesFetcher for MemoryStore {
    fn candles(&self, window: &FetchWindow) -> Result<Vec<Candle>> {
        Ok(select_window(&self.candles, window))
    }

    fn depth(&self, window: &FetchWindow) -> Result<Vec<DepthSnapshot>> {
        Ok(select_window(&self.depth, window))
    }

    fn mark(&self, window: &FetchWindow) -> Result<Vec<MarkPrice>> {
        Ok(select_window(&self.mark, window))
    }

    fn agg_trades(&self, window: &FetchWindow) -> Result<Vec<AggTradeMinute>> {
        Ok(select_window(&self.agg_trades, window))
    }

    fn force_orders(&self, window: &FetchWindow) -> Result<Vec<ForceOrder>> {
        Ok(select_window(&self.force_orders, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use horizon_core::Timestamp;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn make_mark(symbol: &str, ts: Timestamp, price: f64) -> MarkPrice {
        MarkPrice {
            symbol: symbol.to_string(),
            ts,
            mark_price: price,
            funding_rate: None,
        }
    }

    #[test]
    fn test_window_filters_symbol_and_range() {
        let store = MemoryStore::new().with_mark(vec![
            make_mark("BTCUSDT", t0() + Duration::seconds(90), 3.0),
            make_mark("BTCUSDT", t0(), 1.0),
            make_mark("ETHUSDT", t0() + Duration::seconds(10), 9.0),
            make_mark("BTCUSDT", t0() + Duration::minutes(5), 5.0),
        ]);
        let window = FetchWindow::new("BTCUSDT", t0(), t0() + Duration::minutes(5));

        let marks = store.mark(&window).unwrap();

        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].mark_price, 1.0);
        assert_eq!(marks[1].mark_price, 3.0);
    }

    #[test]
    fn test_empty_window_is_empty() {
        let store = MemoryStore::new();
        let window = FetchWindow::trailing_minutes("BTCUSDT", t0(), 10);
        let series = RawSeries::fetch(&store, &window).unwrap();
        assert!(series.candles.is_empty());
        assert!(series.force_orders.is_empty());
    }
}
