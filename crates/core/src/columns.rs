//! Canonical column names of the fused feature table.
//!
//! Every join step writes into this single namespace; a name is owned by
//! exactly one producer.

// Candle-native.
pub const OPEN_1M: &str = "open_1m";
pub const HIGH_1M: &str = "high_1m";
pub const LOW_1M: &str = "low_1m";
pub const CLOSE_1M: &str = "close_1m";
pub const VOLUME_1M: &str = "volume_1m";
pub const TRADE_COUNT_1M: &str = "trade_count_1m";
pub const TAKER_BUY_VOL: &str = "taker_buy_vol";
pub const TAKER_SELL_VOL: &str = "taker_sell_vol";
pub const RET1M_LOG: &str = "ret1m_log";
pub const RET5M_LOG: &str = "ret5m_log";
pub const RET15M_LOG: &str = "ret15m_log";
pub const RET60M_LOG: &str = "ret60m_log";
pub const RANGE_BPS_1M: &str = "range_bps_1m";
pub const RV15M: &str = "rv15m";
pub const RV60M: &str = "rv60m";
pub const VOL_Z_60M: &str = "vol_z_60m";
pub const CVD_1M: &str = "cvd_1m";
pub const CVD_15M: &str = "cvd_15m";
pub const BUY_RATIO_1M: &str = "buy_ratio_1m";
pub const HOUR_SIN: &str = "hour_sin";
pub const HOUR_COS: &str = "hour_cos";
pub const DOW_SIN: &str = "dow_sin";
pub const DOW_COS: &str = "dow_cos";

// Depth (lagged one minute).
pub const SPREAD_BPS: &str = "spread_bps";
pub const IMBALANCE_TOP20: &str = "imbalance_top20";
pub const MICROPRICE_GAP_BPS: &str = "microprice_gap_bps";
pub const MID_PRICE: &str = "mid_price";

// Mark (lagged one minute).
pub const MARK_PRICE_AVG: &str = "mark_price_avg";
pub const FUNDING_RATE: &str = "funding_rate";
pub const MARK_SPOT_BPS: &str = "mark_spot_bps";

// Aggregated trades (lagged one minute).
pub const TAKER_BUY_QTY: &str = "taker_buy_qty";
pub const TAKER_SELL_QTY: &str = "taker_sell_qty";
pub const AGG_TRADE_COUNT: &str = "agg_trade_count";
pub const VWAP_PRICE: &str = "vwap_price";
pub const VWAP_GAP_BPS: &str = "vwap_gap_bps";
pub const AVG_TRADE_SIZE_1M: &str = "avg_trade_size_1m";

// Force orders (lagged one minute).
pub const LIQ_COUNT_1M: &str = "liq_count_1m";

/// Base model features, in declaration order.
pub const BASE_FEATURES: &[&str] = &[
    OPEN_1M,
    HIGH_1M,
    LOW_1M,
    CLOSE_1M,
    VOLUME_1M,
    TRADE_COUNT_1M,
    RET1M_LOG,
    RET5M_LOG,
    RET15M_LOG,
    RANGE_BPS_1M,
    RV15M,
    RV60M,
    VOL_Z_60M,
    BUY_RATIO_1M,
    CVD_1M,
    CVD_15M,
    SPREAD_BPS,
    IMBALANCE_TOP20,
    MICROPRICE_GAP_BPS,
    MARK_SPOT_BPS,
    FUNDING_RATE,
    VWAP_GAP_BPS,
    AVG_TRADE_SIZE_1M,
    LIQ_COUNT_1M,
];

/// Optional features appended to the base set on request.
pub const OPTIONAL_FEATURES: &[&str] = &[RET60M_LOG, HOUR_SIN, HOUR_COS, DOW_SIN, DOW_COS];
