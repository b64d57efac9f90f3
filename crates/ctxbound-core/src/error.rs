use std::fmt;

use thiserror::Error;

/// Canonical result for every ctxbound crate.
pub type Result<T> = std::result::Result<T, Error>;

/// What a size budget is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKind {
    Rows,
    Bytes,
    Lines,
}

impl fmt::Display for SizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeKind::Rows => f.write_str("rows"),
            SizeKind::Bytes => f.write_str("bytes"),
            SizeKind::Lines => f.write_str("lines"),
        }
    }
}

/// Coarse classification used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    QuerySyntax,
    SizeExceeded,
    NameCollision,
    HandleNotFound,
    StorageIo,
    InvalidArgument,
    Config,
    Engine,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query or unknown table/column. Surfaced verbatim.
    #[error("query error: {0}")]
    QuerySyntax(String),

    #[error("result too large: {actual} {kind} exceeds the limit of {limit}. {suggestion}")]
    SizeExceeded {
        kind: SizeKind,
        actual: u64,
        limit: u64,
        suggestion: String,
    },

    #[error("name '{0}' is already in use by a live view")]
    NameCollision(String),

    #[error("handle '{0}' expired or not found; re-export or re-materialize it")]
    HandleNotFound(String),

    #[error("storage I/O error: {0}")]
    StorageIo(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("engine error: {0}")]
    Engine(String),
}

const ROWS_SUGGESTION: &str =
    "Add aggregation (GROUP BY, AVG/MIN/MAX) or filtering (WHERE, date range) to reduce the row count.";
const BYTES_SUGGESTION: &str =
    "Summarize before returning: select fewer columns, aggregate, or return a handle instead of content.";

impl Error {
    /// Row-count overflow. Always carries an aggregation suggestion.
    pub fn too_many_rows(actual: u64, limit: u64) -> Self {
        Error::SizeExceeded {
            kind: SizeKind::Rows,
            actual,
            limit,
            suggestion: ROWS_SUGGESTION.to_string(),
        }
    }

    /// Byte-size overflow. Always carries a summarization suggestion.
    pub fn too_many_bytes(actual: u64, limit: u64) -> Self {
        Error::SizeExceeded {
            kind: SizeKind::Bytes,
            actual,
            limit,
            suggestion: BYTES_SUGGESTION.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::QuerySyntax(_) => ErrorKind::QuerySyntax,
            Error::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            Error::NameCollision(_) => ErrorKind::NameCollision,
            Error::HandleNotFound(_) => ErrorKind::HandleNotFound,
            Error::StorageIo(_) => ErrorKind::StorageIo,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Config(_) => ErrorKind::Config,
            Error::Engine(_) => ErrorKind::Engine,
        }
    }

    /// True when repeating the producing call (re-export, re-materialize)
    /// can succeed. Size and syntax errors fail identically on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::HandleNotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StorageIo(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidArgument(format!("json: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(format!("yaml: {e}"))
    }
}
