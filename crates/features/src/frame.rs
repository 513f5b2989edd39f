//! Column-oriented per-minute feature table.
//!
//! Columns live in a single namespace keyed by canonical name. Inserting a
//! name that is already present is an error, so a feature can never be
//! silently shadowed by a second producer.

use horizon_core::columns::CLOSE_1M;
use horizon_core::{Error, Result, Timestamp};
use std::collections::HashMap;

/// A nullable numeric column.
pub type Column = Vec<Option<f64>>;

/// Fused table: one row per candle minute, strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    symbol: String,
    timestamps: Vec<Timestamp>,
    /// Column names in insertion order.
    names: Vec<String>,
    columns: HashMap<String, Column>,
}

impl FeatureFrame {
    /// Empty frame over the given row minutes.
    pub fn new(symbol: impl Into<String>, timestamps: Vec<Timestamp>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamps,
            names: Vec::new(),
            columns: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Add a column. Fails on a name collision or a length mismatch.
    pub fn insert(&mut self, name: impl Into<String>, values: Column) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(Error::duplicate_column(name));
        }
        if values.len() != self.len() {
            return Err(Error::ColumnLength {
                name,
                expected: self.len(),
                got: values.len(),
            });
        }
        self.names.push(name.clone());
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// Iterate columns mutably, in no particular order.
    pub fn columns_mut(&mut self) -> impl Iterator<Item = (&str, &mut Column)> {
        self.columns.iter_mut().map(|(name, col)| (name.as_str(), col))
    }

    /// Close price column.
    pub fn close(&self) -> Option<&[Option<f64>]> {
        self.column(CLOSE_1M)
    }

    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)?.get(row).copied().flatten()
    }

    /// Frame without its first `start` rows. Returns the frame unchanged when
    /// `start` is not smaller than its length.
    pub fn slice_from(mut self, start: usize) -> Self {
        if start == 0 || start >= self.len() {
            return self;
        }
        self.timestamps.drain(..start);
        for col in self.columns.values_mut() {
            col.drain(..start);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_frame(rows: i64) -> FeatureFrame {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..rows).map(|i| t0 + Duration::minutes(i)).collect();
        FeatureFrame::new("BTCUSDT", ts)
    }

    #[test]
    fn test_insert_and_read() {
        let mut frame = make_frame(3);
        frame.insert("a", vec![Some(1.0), None, Some(3.0)]).unwrap();
        frame.insert("b", vec![Some(0.0); 3]).unwrap();

        assert_eq!(frame.column_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(frame.value("a", 0), Some(1.0));
        assert_eq!(frame.value("a", 1), None);
        assert_eq!(frame.value("missing", 0), None);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut frame = make_frame(2);
        frame.insert("spread_bps", vec![Some(1.0); 2]).unwrap();
        let err = frame.insert("spread_bps", vec![Some(2.0); 2]).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_COLUMN");
        // First producer wins.
        assert_eq!(frame.value("spread_bps", 0), Some(1.0));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut frame = make_frame(2);
        assert!(frame.insert("a", vec![Some(1.0)]).is_err());
        assert!(!frame.has_column("a"));
    }

    #[test]
    fn test_slice_from() {
        let mut frame = make_frame(5);
        frame
            .insert("a", (0..5).map(|i| Some(i as f64)).collect())
            .unwrap();

        let sliced = frame.clone().slice_from(2);
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.value("a", 0), Some(2.0));
        assert_eq!(sliced.timestamps()[0], frame.timestamps()[2]);

        let unchanged = frame.clone().slice_from(10);
        assert_eq!(unchanged, frame);
    }
}
