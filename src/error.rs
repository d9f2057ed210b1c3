//! Error types for the Madrid district data collector.
//!
//! Each layer gets its own enum so that callers can tell a broken remote
//! source (fall through to the next one) from a broken local write (abort the
//! dataset).

use polars::error::PolarsError;
use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Remote source communication and parsing errors
    #[error("source error")]
    Source(#[from] SourceError),

    /// Dataset collection errors
    #[error("collector error")]
    Collector(#[from] CollectorError),

    /// CSV/JSON storage errors
    #[error("storage error")]
    Storage(#[from] StorageError),

    /// Generic errors that don't fit other categories
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Errors raised while talking to a remote data source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not the JSON we expected
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body was not readable CSV
    #[error("invalid CSV payload: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet could not be opened or read
    #[error("invalid spreadsheet: {0}")]
    Xlsx(String),

    /// Payload was readable but its content did not make sense
    #[error("parse error")]
    Parse(#[from] ParseError),

    /// Source answered but carried no usable rows
    #[error("no data returned by {0}")]
    NoData(String),
}

/// Content-level parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Expected column is absent
    #[error("column not found: {column}")]
    MissingColumn { column: String },

    /// Unexpected payload structure
    #[error("unexpected structure: {0}")]
    UnexpectedStructure(String),
}

/// Dataset collection errors.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Collector task timed out
    #[error("collector '{name}' timed out after {timeout} seconds")]
    Timeout { name: String, timeout: u64 },

    /// Data source error
    #[error("failed to collect from source")]
    Source(#[from] SourceError),

    /// District name is not one of the 21 official districts
    #[error("unknown district: {0}")]
    UnknownDistrict(String),

    /// Source rejected the connection check
    #[error("{0} is not reachable")]
    Unavailable(String),

    /// A credential the collector needs is not configured
    #[error("API key not configured for {name}")]
    MissingApiKey { name: String },

    /// Data validation failed
    #[error("invalid dataset: {0}")]
    ValidationFailed(String),

    /// Local persistence failed while collecting
    #[error("failed to persist collected data")]
    Storage(#[from] StorageError),
}

/// CSV and JSON storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Refused to write a table without rows
    #[error("no rows to write for {name}")]
    EmptyTable { name: String },

    /// Filesystem operation failed
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Dataframe operation or CSV serialisation failed
    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),

    /// JSON serialisation failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row does not match the table header
    #[error("row has {found} cells but table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

impl ConfigError {
    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Creates a status error from HTTP status and response body.
    pub fn status(status: reqwest::StatusCode, body: String) -> Self {
        Self::Status {
            status: status.as_u16(),
            message: body,
        }
    }

    /// Creates a spreadsheet error.
    pub fn xlsx(err: impl std::fmt::Display) -> Self {
        Self::Xlsx(err.to_string())
    }

    /// Creates a no-data error naming the source.
    pub fn no_data(source: impl Into<String>) -> Self {
        Self::NoData(source.into())
    }
}

impl ParseError {
    /// Creates a missing column error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

impl CollectorError {
    /// Creates a timeout error.
    pub fn timeout(name: impl Into<String>, timeout: u64) -> Self {
        Self::Timeout {
            name: name.into(),
            timeout,
        }
    }

    /// Creates a missing API key error.
    pub fn missing_api_key(name: impl Into<String>) -> Self {
        Self::MissingApiKey { name: name.into() }
    }
}

impl StorageError {
    /// Creates an empty table error.
    pub fn empty_table(name: impl Into<String>) -> Self {
        Self::EmptyTable { name: name.into() }
    }

    /// Creates an I/O error bound to a path.
    pub fn io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}
