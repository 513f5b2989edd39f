//! Error types for the coin-horizon pipeline.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the coin-horizon pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not enough rows for warmup, horizon, or a usable train/test split.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A required source returned nothing for the requested window.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A raw observation carried a timestamp that could not be parsed.
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// Two writers targeted the same canonical column name.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A column does not have one value per row.
    #[error("Column '{name}' has {got} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Classifier fitting or scoring error.
    #[error("Model error: {0}")]
    Model(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a missing data error.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Error::MissingData(msg.into())
    }

    /// Create a malformed timestamp error.
    pub fn malformed_timestamp(msg: impl Into<String>) -> Self {
        Error::MalformedTimestamp(msg.into())
    }

    /// Create a duplicate column error.
    pub fn duplicate_column(name: impl Into<String>) -> Self {
        Error::DuplicateColumn(name.into())
    }

    /// Create a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_INVALID",
            Error::InsufficientData(_) => "DATA_INSUFFICIENT",
            Error::MissingData(_) => "DATA_MISSING",
            Error::MalformedTimestamp(_) => "MALFORMED_TIMESTAMP",
            Error::DuplicateColumn(_) => "DUPLICATE_COLUMN",
            Error::ColumnLength { .. } => "COLUMN_LENGTH",
            Error::Model(_) => "MODEL_FAILED",
            Error::Database(_) => "DATABASE",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }

    /// Structured failure suitable for reporting to a caller.
    pub fn to_failure(&self) -> Failure {
        Failure {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Structured failure envelope for a pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::insufficient_data("rows=3").code(), "DATA_INSUFFICIENT");
        assert_eq!(Error::malformed_timestamp("x").code(), "MALFORMED_TIMESTAMP");
        assert_eq!(Error::missing_data("candles").code(), "DATA_MISSING");
    }

    #[test]
    fn test_failure_serializes() {
        let failure = Error::insufficient_data("rows=3").to_failure();
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"code\":\"DATA_INSUFFICIENT\""));
        assert!(json.contains("rows=3"));
    }
}
