//! UTC normalization of stored timestamps.
//!
//! Accepted forms:
//! - RFC 3339 with an explicit offset (converted to UTC)
//! - naive `YYYY-MM-DD HH:MM:SS[.fff]` or `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC)
//! - integer epoch milliseconds
//!
//! Anything else is rejected rather than coerced to a guessed time.

use chrono::{DateTime, NaiveDateTime, Utc};
use horizon_core::{Error, Result, Timestamp};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a textual timestamp into a UTC instant.
pub fn parse_utc(text: &str) -> Result<Timestamp> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::malformed_timestamp("empty timestamp"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::malformed_timestamp(format!("unparseable timestamp '{text}'")))
}

/// Convert epoch milliseconds into a UTC instant.
pub fn from_epoch_ms(ms: i64) -> Result<Timestamp> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::malformed_timestamp(format!("epoch ms out of range: {ms}")))
}

/// Render a UTC instant in the naive storage format used by the SQLite store.
pub fn to_storage(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_naive_is_utc() {
        let ts = parse_utc("2024-03-01 12:30:05").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap());
    }

    #[test]
    fn test_fractional_seconds() {
        let ts = parse_utc("2024-03-01T12:30:05.250").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_offset_normalized_to_utc() {
        let ts = parse_utc("2024-03-01T21:30:05+09:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap());
    }

    #[test]
    fn test_malformed_rejected() {
        let err = parse_utc("yesterday at noon").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_TIMESTAMP");
        assert!(parse_utc("").is_err());
        assert!(parse_utc("2024-13-40 99:00:00").is_err());
    }

    #[test]
    fn test_storage_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(to_storage(ts), "2024-03-01 12:30:05.000");
        assert_eq!(parse_utc(&to_storage(ts)).unwrap(), ts);
    }

    #[test]
    fn test_epoch_ms() {
        let ts = from_epoch_ms(1_704_067_260_000).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap());
    }
}
