//! Raw data access and minute alignment for the coin-horizon pipeline.
//!
//! This crate handles:
//! - Fetching raw series per source and window (in-memory and SQLite stores)
//! - UTC normalization of stored timestamps
//! - Per-minute aggregation of auxiliary series with the one-minute lag

pub mod aligner;
pub mod fetcher;
pub mod sqlite;
pub mod timestamp;

pub use aligner::{
    align_agg_trades, align_depth, align_force_orders, align_mark, AggTradeBucket, DepthBucket,
    LaggedBucket, LaggedBuckets, LiquidationBucket, MarkBucket, MinuteAligner,
};
pub use fetcher::{MemoryStore, RawSeries, RawSeriesFetcher};
pub use sqlite::SqliteStore;
