//! Bounded readers over export files.
//!
//! Opening a reader holds the file descriptor, so a concurrent expiry sweep
//! that unlinks the path cannot hand back a partially deleted file: either the
//! open fails (`HandleNotFound`) or the whole immutable file stays readable.

pub mod csv;
pub mod parquet;

use std::path::Path;

use ctxbound_core::types::Table;
use ctxbound_core::{Error, Result};

use crate::format::ExportFormat;

pub use self::csv::CsvExportReader;
pub use self::parquet::ParquetExportReader;

pub trait ExportReader {
    /// Total rows in the file.
    fn num_rows(&mut self) -> Result<u64>;

    fn column_names(&self) -> Vec<String>;

    /// Materialize the file. Fails with `SizeExceeded` before reading any rows
    /// when the file holds more than `max_rows`.
    fn read_all(self: Box<Self>, max_rows: usize) -> Result<Table>;
}

/// Open `path` with the reader matching its extension.
pub fn open_export(path: &Path) -> Result<Box<dyn ExportReader>> {
    match ExportFormat::from_path(path)? {
        ExportFormat::Parquet => Ok(Box::new(ParquetExportReader::open(path)?)),
        ExportFormat::Csv => Ok(Box::new(CsvExportReader::open(path)?)),
    }
}

pub(crate) fn check_cap(rows: u64, max_rows: usize) -> Result<()> {
    if rows > max_rows as u64 {
        return Err(Error::too_many_rows(rows, max_rows as u64));
    }
    Ok(())
}
