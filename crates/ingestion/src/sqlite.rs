//! SQLite-backed raw store.
//!
//! Reads the five raw tables written by the collector. Event times may be
//! stored as TEXT (RFC 3339, or naive UTC) or as INTEGER epoch milliseconds;
//! rows whose time cannot be parsed are dropped, never coerced.

use crate::fetcher::RawSeriesFetcher;
use crate::timestamp::{from_epoch_ms, parse_utc, to_storage};
use horizon_core::{
    AggTradeMinute, Candle, DepthSnapshot, Error, FetchWindow, ForceOrder, ForceSide, MarkPrice,
    Result, Timestamp,
};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use tracing::{debug, warn};

pub const TABLE_KLINE: &str = "f_kline_1m";
pub const TABLE_DEPTH: &str = "f_depth_snapshot_1s";
pub const TABLE_MARK: &str = "f_mark_1s";
pub const TABLE_AGGTRADE: &str = "f_aggtrade_1m";
pub const TABLE_FORCEORDER: &str = "f_forceorder";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS f_kline_1m (
    symbol        TEXT NOT NULL,
    ts_utc        NOT NULL,
    open_         REAL NOT NULL,
    high_         REAL NOT NULL,
    low_          REAL NOT NULL,
    close_        REAL NOT NULL,
    volume_       REAL NOT NULL,
    trade_count   INTEGER NOT NULL,
    taker_buy_vol REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS f_depth_snapshot_1s (
    symbol             TEXT NOT NULL,
    ts_utc             NOT NULL,
    mid_price          REAL NOT NULL,
    spread_bps         REAL NOT NULL,
    imbalance_top20    REAL NOT NULL,
    microprice_gap_bps REAL
);
CREATE TABLE IF NOT EXISTS f_mark_1s (
    symbol       TEXT NOT NULL,
    ts_utc       NOT NULL,
    mark_price   REAL NOT NULL,
    funding_rate REAL
);
CREATE TABLE IF NOT EXISTS f_aggtrade_1m (
    symbol         TEXT NOT NULL,
    ts_utc         NOT NULL,
    taker_buy_qty  REAL NOT NULL,
    taker_sell_qty REAL NOT NULL,
    trade_count    INTEGER NOT NULL,
    vwap_price     REAL
);
CREATE TABLE IF NOT EXISTS f_forceorder (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol    TEXT NOT NULL,
    event_utc NOT NULL,
    side      TEXT NOT NULL,
    price     REAL NOT NULL,
    qty       REAL NOT NULL
);
";

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

/// Decode a stored event time.
fn decode_time(value: ValueRef<'_>) -> Result<Timestamp> {
    match value {
        ValueRef::Integer(ms) => from_epoch_ms(ms),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::malformed_timestamp("timestamp is not valid UTF-8"))?;
            parse_utc(text)
        }
        ValueRef::Null => Err(Error::malformed_timestamp("timestamp is NULL")),
        other => Err(Error::malformed_timestamp(format!(
            "unsupported timestamp type {:?}",
            other.data_type()
        ))),
    }
}

/// SQL expression giving a stored event time as epoch milliseconds.
///
/// INTEGER values are already epoch ms. TEXT goes through `julianday`, which
/// understands the naive and offset forms and normalizes offsets to UTC;
/// text it cannot read yields NULL and never matches a window.
fn event_ms_expr(time_column: &str) -> String {
    format!(
        "(CASE typeof({time_column}) \
         WHEN 'integer' THEN {time_column} \
         WHEN 'text' THEN CAST(round((julianday({time_column}) - 2440587.5) * 86400000.0) AS INTEGER) \
         END)"
    )
}

/// Rows read from one table, with scan counters.
struct TableLoad<T> {
    rows: Vec<T>,
    scanned: usize,
    dropped: usize,
}

/// Raw store over a SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Open (or create) a database for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Private in-memory database with the raw schema.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory().map_err(db_err)?,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the raw tables if they do not exist.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).map_err(db_err)
    }

    /// Load one table for a window.
    ///
    /// `columns` are selected after the time column, which `map` receives
    /// already decoded. Symbol and time window are both bounded in SQL, so
    /// only in-window rows are read. Rows with an unparseable time or an
    /// unreadable value are dropped with a warning.
    fn load<T>(
        &self,
        table: &str,
        time_column: &str,
        columns: &str,
        window: &FetchWindow,
        map: impl Fn(&Row<'_>, Timestamp) -> rusqlite::Result<T>,
    ) -> Result<TableLoad<T>> {
        let event_ms = event_ms_expr(time_column);
        let sql = format!(
            "SELECT {time_column}, {columns} FROM {table}
             WHERE symbol = ?1 AND {event_ms} >= ?2 AND {event_ms} < ?3
             ORDER BY {event_ms}"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt
            .query(params![
                window.symbol,
                window.start.timestamp_millis(),
                window.end.timestamp_millis()
            ])
            .map_err(db_err)?;

        let mut load = TableLoad {
            rows: Vec::new(),
            scanned: 0,
            dropped: 0,
        };
        while let Some(row) = rows.next().map_err(db_err)? {
            load.scanned += 1;
            let raw = row.get_ref(0).map_err(db_err)?;
            let ts = match decode_time(raw) {
                Ok(ts) => ts,
                Err(e) => {
                    load.dropped += 1;
                    warn!(table, code = e.code(), error = %e, "dropping row with malformed timestamp");
                    continue;
                }
            };
            // SQLite and chrono may disagree on exotic text forms.
            if !window.contains(ts) {
                continue;
            }
            match map(row, ts) {
                Ok(item) => load.rows.push(item),
                Err(e) => {
                    load.dropped += 1;
                    warn!(table, ts = %ts, error = %e, "dropping row with unreadable value");
                }
            }
        }

        debug!(
            table,
            symbol = %window.symbol,
            rows = load.rows.len(),
            scanned = load.scanned,
            dropped = load.dropped,
            "loaded table"
        );
        Ok(load)
    }

    pub fn insert_candles(&mut self, candles: &[Candle]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO f_kline_1m (symbol, ts_utc, open_, high_, low_, close_, volume_, trade_count, taker_buy_vol)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(db_err)?;
            for c in candles {
                stmt.execute(params![
                    c.symbol,
                    to_storage(c.ts),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume,
                    c.trade_count,
                    c.taker_buy_volume
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    pub fn insert_depth(&mut self, snapshots: &[DepthSnapshot]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO f_depth_snapshot_1s (symbol, ts_utc, mid_price, spread_bps, imbalance_top20, microprice_gap_bps)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;
            for d in snapshots {
                stmt.execute(params![
                    d.symbol,
                    to_storage(d.ts),
                    d.mid_price,
                    d.spread_bps,
                    d.imbalance_top20,
                    d.microprice_gap_bps
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    pub fn insert_mark(&mut self, marks: &[MarkPrice]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO f_mark_1s (symbol, ts_utc, mark_price, funding_rate) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(db_err)?;
            for m in marks {
                stmt.execute(params![m.symbol, to_storage(m.ts), m.mark_price, m.funding_rate])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    pub fn insert_agg_trades(&mut self, trades: &[AggTradeMinute]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO f_aggtrade_1m (symbol, ts_utc, taker_buy_qty, taker_sell_qty, trade_count, vwap_price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;
            for a in trades {
                stmt.execute(params![
                    a.symbol,
                    to_storage(a.ts),
                    a.taker_buy_qty,
                    a.taker_sell_qty,
                    a.trade_count,
                    a.vwap_price
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    pub fn insert_force_orders(&mut self, orders: &[ForceOrder]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO f_forceorder (symbol, event_utc, side, price, qty) VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;
            for f in orders {
                stmt.execute(params![f.symbol, to_storage(f.ts), f.side.as_str(), f.price, f.qty])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }
}

impl RawSeriesFetcher for SqliteStore {
    fn candles(&self, window: &FetchWindow) -> Result<Vec<Candle>> {
        self.load(
            TABLE_KLINE,
            "ts_utc",
            "open_, high_, low_, close_, volume_, trade_count, taker_buy_vol",
            window,
            |row, ts| {
                Ok(Candle {
                    symbol: window.symbol.clone(),
                    ts,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                    trade_count: row.get(6)?,
                    taker_buy_volume: row.get(7)?,
                })
            },
        )
        .map(|load| load.rows)
    }

    fn depth(&self, window: &FetchWindow) -> Result<Vec<DepthSnapshot>> {
        self.load(
            TABLE_DEPTH,
            "ts_utc",
            "mid_price, spread_bps, imbalance_top20, microprice_gap_bps",
            window,
            |row, ts| {
                Ok(DepthSnapshot {
                    symbol: window.symbol.clone(),
                    ts,
                    mid_price: row.get(1)?,
                    spread_bps: row.get(2)?,
                    imbalance_top20: row.get(3)?,
                    microprice_gap_bps: row.get(4)?,
                })
            },
        )
        .map(|load| load.rows)
    }

    fn mark(&self, window: &FetchWindow) -> Result<Vec<MarkPrice>> {
        self.load(TABLE_MARK, "ts_utc", "mark_price, funding_rate", window, |row, ts| {
            Ok(MarkPrice {
                symbol: window.symbol.clone(),
                ts,
                mark_price: row.get(1)?,
                funding_rate: row.get(2)?,
            })
        })
        .map(|load| load.rows)
    }

    fn agg_trades(&self, window: &FetchWindow) -> Result<Vec<AggTradeMinute>> {
        self.load(
            TABLE_AGGTRADE,
            "ts_utc",
            "taker_buy_qty, taker_sell_qty, trade_count, vwap_price",
            window,
            |row, ts| {
                Ok(AggTradeMinute {
                    symbol: window.symbol.clone(),
                    ts,
                    taker_buy_qty: row.get(1)?,
                    taker_sell_qty: row.get(2)?,
                    trade_count: row.get(3)?,
                    vwap_price: row.get(4)?,
                })
            },
        )
        .map(|load| load.rows)
    }

    fn force_orders(&self, window: &FetchWindow) -> Result<Vec<ForceOrder>> {
        let rows = self.load(
            TABLE_FORCEORDER,
            "event_utc",
            "side, price, qty",
            window,
            |row, ts| {
                let side: String = row.get(1)?;
                Ok((ts, side, row.get::<_, f64>(2)?, row.get::<_, f64>(3)?))
            },
        )?
        .rows;

        let mut out = Vec::with_capacity(rows.len());
        for (ts, side, price, qty) in rows {
            // Unknown side marks a corrupt row.
            match ForceSide::parse(&side) {
                Some(side) => out.push(ForceOrder {
                    symbol: window.symbol.clone(),
                    ts,
                    side,
                    price,
                    qty,
                }),
                None => warn!(side = %side, "dropping force order with unknown side"),
            }
        }
        Ok(out)
    }
}
