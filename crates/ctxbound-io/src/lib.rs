#![forbid(unsafe_code)]
//! ctxbound-io: the on-disk side of exports.
//!
//! - `storage`: the scratch directory (one file per export, naming, sizing,
//!   idempotent deletion, orphan listing).
//! - `readers`: bounded readers that check the row count *before*
//!   materializing anything, then convert to `ctxbound_core::types::Table`.
//! - `format`: the export file formats.

pub mod format;
pub mod readers;
pub mod storage;

pub use format::ExportFormat;
pub use readers::{open_export, ExportReader};
pub use storage::ScratchDir;

use ctxbound_core::Error;

/// Map a parquet failure. Corrupt or truncated files are storage failures.
pub fn parquet_error(e: parquet::errors::ParquetError) -> Error {
    Error::StorageIo(format!("parquet: {e}"))
}

/// Map an Arrow conversion failure.
pub fn arrow_error(e: arrow::error::ArrowError) -> Error {
    Error::Engine(format!("arrow: {e}"))
}

pub fn csv_error(e: csv::Error) -> Error {
    Error::StorageIo(format!("csv: {e}"))
}
