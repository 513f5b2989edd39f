//! Raw market-data observation types.
//!
//! Every observation carries its symbol and a UTC event time. Candles are
//! minute-granular; depth and mark snapshots are sub-minute; aggregated trades
//! are minute-granular but concurrent with the candle they describe;
//! force orders are individual liquidation events.

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// UTC instant.
pub type Timestamp = DateTime<Utc>;

/// Truncate a timestamp to the start of its calendar minute.
#[inline]
pub fn floor_to_minute(ts: Timestamp) -> Timestamp {
    // duration_trunc only covers the i64 nanosecond range (1677..2262).
    ts.duration_trunc(Duration::minutes(1)).unwrap_or_else(|_| {
        ts.with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .unwrap_or(ts)
    })
}

/// The minute immediately after the one containing `ts`.
#[inline]
pub fn next_minute(ts: Timestamp) -> Timestamp {
    floor_to_minute(ts) + Duration::minutes(1)
}

/// Anything with a UTC event time.
pub trait Timestamped {
    fn event_time(&self) -> Timestamp;
}

/// Half-open `[start, end)` time window for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub symbol: String,
    /// Inclusive start.
    pub start: Timestamp,
    /// Exclusive end.
    pub end: Timestamp,
}

impl FetchWindow {
    pub fn new(symbol: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }

    /// Window covering the `days` days before `end`.
    pub fn trailing_days(symbol: impl Into<String>, end: Timestamp, days: u32) -> Self {
        Self::new(symbol, end - Duration::days(days as i64), end)
    }

    /// Window covering the `minutes` minutes before `end`.
    pub fn trailing_minutes(symbol: impl Into<String>, end: Timestamp, minutes: u32) -> Self {
        Self::new(symbol, end - Duration::minutes(minutes as i64), end)
    }

    /// Whether `ts` falls inside the window.
    #[inline]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// 1-minute kline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    /// Minute open time.
    pub ts: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Total base volume.
    pub volume: f64,
    pub trade_count: u32,
    /// Taker buy base volume.
    pub taker_buy_volume: f64,
}

impl Candle {
    /// Taker sell volume (total minus taker buy).
    #[inline]
    pub fn taker_sell_volume(&self) -> f64 {
        self.volume - self.taker_buy_volume
    }
}

impl Timestamped for Candle {
    fn event_time(&self) -> Timestamp {
        self.ts
    }
}

/// Order-book depth snapshot (roughly one per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub symbol: String,
    pub ts: Timestamp,
    pub mid_price: f64,
    pub spread_bps: f64,
    /// Bid/ask size imbalance over the top 20 levels.
    pub imbalance_top20: f64,
    pub microprice_gap_bps: Option<f64>,
}

impl Timestamped for DepthSnapshot {
    fn event_time(&self) -> Timestamp {
        self.ts
    }
}

/// Mark price and funding snapshot (roughly one per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkPrice {
    pub symbol: String,
    pub ts: Timestamp,
    pub mark_price: f64,
    pub funding_rate: Option<f64>,
}

impl Timestamped for MarkPrice {
    fn event_time(&self) -> Timestamp {
        self.ts
    }
}

/// Per-minute aggregated trade totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggTradeMinute {
    pub symbol: String,
    pub ts: Timestamp,
    pub taker_buy_qty: f64,
    pub taker_sell_qty: f64,
    pub trade_count: u32,
    pub vwap_price: Option<f64>,
}

impl Timestamped for AggTradeMinute {
    fn event_time(&self) -> Timestamp {
        self.ts
    }
}

/// Liquidation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceSide {
    Buy,
    Sell,
}

impl ForceSide {
    pub fn as_str(self) -> &'static str {
        match self {
            ForceSide::Buy => "BUY",
            ForceSide::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(ForceSide::Buy),
            "SELL" => Some(ForceSide::Sell),
            _ => None,
        }
    }
}

/// A single liquidation (force order) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceOrder {
    pub symbol: String,
    pub ts: Timestamp,
    pub side: ForceSide,
    pub price: f64,
    pub qty: f64,
}

impl Timestamped for ForceOrder {
    fn event_time(&self) -> Timestamp {
        self.ts
    }
}

/// Predicted or realized price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }

    /// 1 for up, 0 for down.
    pub fn as_class(self) -> u8 {
        match self {
            Direction::Up => 1,
            Direction::Down => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_floor_to_minute() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap() + Duration::milliseconds(500);
        let minute = floor_to_minute(ts);
        assert_eq!(minute, Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap());
    }

    #[test]
    fn test_floor_outside_nanosecond_range() {
        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 45).unwrap();
        assert_eq!(
            floor_to_minute(before_epoch),
            Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 0).unwrap()
        );

        let far = Utc.with_ymd_and_hms(2300, 6, 1, 8, 30, 59).unwrap() + Duration::milliseconds(250);
        assert_eq!(floor_to_minute(far), Utc.with_ymd_and_hms(2300, 6, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_floor_is_idempotent_on_boundary() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(floor_to_minute(ts), ts);
        assert_eq!(next_minute(ts), Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap());
    }

    #[test]
    fn test_window_is_half_open() {
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let window = FetchWindow::trailing_days("BTCUSDT", end, 1);
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert!(!window.contains(end));
    }

    #[test]
    fn test_taker_sell_volume() {
        let candle = Candle {
            symbol: "BTCUSDT".to_string(),
            ts: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 10.0,
            trade_count: 3,
            taker_buy_volume: 4.0,
        };
        assert!((candle.taker_sell_volume() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_force_side_parse() {
        assert_eq!(ForceSide::parse("sell"), Some(ForceSide::Sell));
        assert_eq!(ForceSide::parse("hold"), None);
    }
}
