use chrono::{Duration, TimeZone, Utc};
use horizon_core::columns::*;
use horizon_core::{
    AggTradeMinute, Candle, DepthSnapshot, FeatureSet, ForceOrder, ForceSide, MarkPrice, Timestamp,
};
use horizon_features::{
    FeatureFusionEngine, Label, LabelBuilder, PredictionRowAssembler, TrainingSetAssembler,
    WARMUP_ROWS,
};
use horizon_ingestion::RawSeries;
use std::sync::Once;

static INIT: Once = Once::new();

fn setup_logging() {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

const SYMBOL: &str = "BTCUSDT";

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn minute(m: i64) -> Timestamp {
    t0() + Duration::minutes(m)
}

fn make_candle(m: i64, close: f64, volume: f64) -> Candle {
    Candle {
        symbol: SYMBOL.to_string(),
        ts: minute(m),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
        trade_count: 30,
        taker_buy_volume: volume * 0.6,
    }
}

fn make_candles(n: i64) -> Vec<Candle> {
    (0..n)
        .map(|m| make_candle(m, 100.0 + ((m * 7) % 11) as f64, 10.0 + (m % 4) as f64))
        .collect()
}

/// Every auxiliary value observed during minute `m` encodes `m`.
fn make_raw(n: i64) -> RawSeries {
    let mut raw = RawSeries {
        candles: make_candles(n),
        ..Default::default()
    };
    for m in 0..n {
        for s in [5, 35] {
            raw.depth.push(DepthSnapshot {
                symbol: SYMBOL.to_string(),
                ts: minute(m) + Duration::seconds(s),
                mid_price: 100.0,
                spread_bps: m as f64,
                imbalance_top20: 0.1,
                microprice_gap_bps: Some(0.2),
            });
            raw.mark.push(MarkPrice {
                symbol: SYMBOL.to_string(),
                ts: minute(m) + Duration::seconds(s),
                mark_price: 1000.0 + m as f64,
                funding_rate: Some(0.0001),
            });
        }
        raw.agg_trades.push(AggTradeMinute {
            symbol: SYMBOL.to_string(),
            ts: minute(m),
            taker_buy_qty: m as f64,
            taker_sell_qty: 1.0,
            trade_count: 4,
            vwap_price: Some(100.0),
        });
        for k in 0..(m % 3 + 1) {
            raw.force_orders.push(ForceOrder {
                symbol: SYMBOL.to_string(),
                ts: minute(m) + Duration::seconds(10 + k),
                side: ForceSide::Buy,
                price: 100.0,
                qty: 1.0,
            });
        }
    }
    raw
}

#[test]
fn test_lagged_values_come_from_previous_minute() {
    setup_logging();
    let frame = FeatureFusionEngine::new().fuse(&make_raw(90)).unwrap();

    for (row, ts) in frame.timestamps().iter().enumerate() {
        let m = (*ts - t0()).num_minutes();
        assert_eq!(frame.value(SPREAD_BPS, row), Some((m - 1) as f64));
        assert_eq!(frame.value(MARK_PRICE_AVG, row), Some(1000.0 + (m - 1) as f64));
        assert_eq!(frame.value(TAKER_BUY_QTY, row), Some((m - 1) as f64));
        assert_eq!(frame.value(LIQ_COUNT_1M, row), Some(((m - 1) % 3 + 1) as f64));
    }
}

#[test]
fn test_late_observations_never_reach_their_own_minute() {
    let mut raw = RawSeries {
        candles: make_candles(70),
        ..Default::default()
    };
    // Last millisecond of minute 65.
    raw.depth.push(DepthSnapshot {
        symbol: SYMBOL.to_string(),
        ts: minute(66) - Duration::milliseconds(1),
        mid_price: 100.0,
        spread_bps: 42.0,
        imbalance_top20: 0.0,
        microprice_gap_bps: None,
    });
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
    let row_of = |m: i64| frame.timestamps().iter().position(|t| *t == minute(m)).unwrap();

    assert_eq!(frame.value(SPREAD_BPS, row_of(65)), Some(0.0));
    assert_eq!(frame.value(SPREAD_BPS, row_of(66)), Some(42.0));
}

#[test]
fn test_warmup_trim() {
    let frame = FeatureFusionEngine::new().fuse(&make_raw(100)).unwrap();
    assert_eq!(frame.len(), 100 - WARMUP_ROWS);
    assert_eq!(frame.timestamps()[0], minute(WARMUP_ROWS as i64));

    for name in [RET60M_LOG, RV15M, RV60M, VOL_Z_60M, CVD_15M] {
        let col = frame.column(name).unwrap();
        assert!(col.iter().all(Option::is_some), "{name} has nulls");
    }
    // Rolling columns are real values after the trim, not fill zeros.
    assert!(frame.value(RV60M, 0).unwrap() > 0.0);
}

#[test]
fn test_labels_on_fused_frame() {
    let mut candles = make_candles(WARMUP_ROWS as i64);
    for (k, close) in [100.0, 105.0, 95.0, 102.0].into_iter().enumerate() {
        candles.push(make_candle(WARMUP_ROWS as i64 + k as i64, close, 10.0));
    }
    let raw = RawSeries {
        candles,
        ..Default::default()
    };
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
    let labels = LabelBuilder::new(1).build(&frame);

    assert_eq!(frame.len(), 4);
    assert_eq!(labels, vec![Label::Up, Label::Down, Label::Up, Label::Undefined]);

    let set = TrainingSetAssembler::new(FeatureSet::base())
        .assemble(&frame, &labels)
        .unwrap();
    assert_eq!(set.labels, vec![1, 0, 1]);
    assert_eq!(set.meta[1].close_now, 105.0);
}

#[test]
fn test_empty_depth_is_zero() {
    let mut raw = make_raw(80);
    raw.depth.clear();
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();

    for name in [SPREAD_BPS, IMBALANCE_TOP20, MICROPRICE_GAP_BPS] {
        assert!(
            frame.column(name).unwrap().iter().all(|v| *v == Some(0.0)),
            "{name} not zero"
        );
    }
}

#[test]
fn test_candles_only_defaults_every_auxiliary_column() {
    let raw = RawSeries {
        candles: make_candles(90),
        ..Default::default()
    };
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
    assert_eq!(frame.len(), 90 - WARMUP_ROWS);

    for name in [
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
        LIQ_COUNT_1M,
    ] {
        let col = frame.column(name).unwrap();
        assert!(col.iter().all(|v| *v == Some(0.0)), "{name} not zero");
    }
}

#[test]
fn test_zero_vwap_and_trade_count_carry_previous_values() {
    let mut raw = make_raw(90);
    let zero = raw.agg_trades.iter_mut().find(|a| a.ts == minute(70)).unwrap();
    zero.vwap_price = Some(0.0);
    zero.trade_count = 0;
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
    let row_of = |m: i64| frame.timestamps().iter().position(|t| *t == minute(m)).unwrap();
    let (before, lagged) = (row_of(70), row_of(71));

    // The minute-70 bucket lands on minute 71.
    assert_eq!(frame.value(VWAP_PRICE, lagged), Some(0.0));
    assert_eq!(frame.value(AGG_TRADE_COUNT, lagged), Some(0.0));

    let gap = frame.value(VWAP_GAP_BPS, lagged).unwrap();
    let size = frame.value(AVG_TRADE_SIZE_1M, lagged).unwrap();
    assert!(gap.is_finite() && size.is_finite());
    assert_eq!(Some(gap), frame.value(VWAP_GAP_BPS, before));
    assert_eq!(Some(size), frame.value(AVG_TRADE_SIZE_1M, before));
    // Minute 69 bucket: (69 + 1) / 4.
    assert_eq!(size, 17.5);
    // Close at minute 70 is 106 against a VWAP of 100.
    assert!((gap - 600.0).abs() < 1e-9);
    // The gap is carried, not recomputed against minute 71's close.
    assert_ne!(frame.value(CLOSE_1M, lagged), frame.value(CLOSE_1M, before));
}

#[test]
fn test_zero_volume_buy_ratio_filled() {
    let mut raw = RawSeries {
        candles: make_candles(70),
        ..Default::default()
    };
    raw.candles[65] = make_candle(65, 100.0, 0.0);
    let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
    let row = 65 - WARMUP_ROWS;

    assert_eq!(frame.value(BUY_RATIO_1M, row), Some(0.0));
    for col in frame.column_names() {
        let v = frame.value(col, row).unwrap();
        assert!(v.is_finite(), "{col} is not finite");
    }
}

#[test]
fn test_training_and_prediction_rows_match() {
    let frame = FeatureFusionEngine::new().fuse(&make_raw(120)).unwrap();
    let features = FeatureSet::with_optional();
    // Every row labelled, so the last training row is the prediction row.
    let labels = vec![Label::Up; frame.len()];

    let train = TrainingSetAssembler::new(features.clone())
        .assemble(&frame, &labels)
        .unwrap();
    let predict = PredictionRowAssembler::new(features.clone())
        .assemble(&frame)
        .unwrap();

    assert_eq!(train.len(), frame.len());
    assert_eq!(train.matrix.columns(), features.names());
    assert_eq!(predict.matrix.columns(), train.matrix.columns());
    assert!(train.report.missing_features.is_empty());

    let last_meta = train.meta.last().unwrap();
    assert_eq!(last_meta.timestamp, predict.meta.timestamp);
    assert_eq!(last_meta.close_now, predict.meta.close_now);

    let train_bits: Vec<u64> = train
        .matrix
        .row(train.len() - 1)
        .unwrap()
        .iter()
        .map(|v| v.to_bits())
        .collect();
    let predict_bits: Vec<u64> = predict.matrix.row(0).unwrap().iter().map(|v| v.to_bits()).collect();
    assert_eq!(train_bits, predict_bits);

    // Column j of the row is the frame's value for the j-th declared feature.
    let last = frame.len() - 1;
    for (j, name) in features.names().iter().enumerate() {
        assert_eq!(predict.matrix.row(0).unwrap()[j], frame.value(name, last).unwrap(), "{name}");
    }
}

#[test]
fn test_pipeline_is_idempotent() {
    let raw = make_raw(150);
    let features = FeatureSet::with_optional();
    let run = || {
        let frame = FeatureFusionEngine::new().fuse(&raw).unwrap();
        let labels = LabelBuilder::new(15).build(&frame);
        TrainingSetAssembler::new(features.clone())
            .assemble(&frame, &labels)
            .unwrap()
    };

    let a = run();
    let b = run();
    assert_eq!(a.labels, b.labels);
    assert_eq!(a.matrix.n_rows(), b.matrix.n_rows());
    for (ra, rb) in a.matrix.rows().iter().zip(b.matrix.rows()) {
        let bits_a: Vec<u64> = ra.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = rb.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }
}

#[test]
fn test_duplicate_declared_features_resolved() {
    let frame = FeatureFusionEngine::new().fuse(&make_raw(80)).unwrap();
    let (features, dropped) = FeatureSet::resolve([CLOSE_1M, SPREAD_BPS, CLOSE_1M]);
    assert_eq!(dropped, vec![CLOSE_1M.to_string()]);

    let input = PredictionRowAssembler::new(features).assemble(&frame).unwrap();
    assert_eq!(input.matrix.columns(), &[CLOSE_1M.to_string(), SPREAD_BPS.to_string()]);
}
