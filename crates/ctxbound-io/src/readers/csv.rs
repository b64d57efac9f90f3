//! CSV export reader.
//!
//! CSV has no footer, so the row count costs one streaming pass. `read_all`
//! keeps at most `max_rows` records in memory and keeps counting past the cap
//! only to report the true size in the error.

use std::fs::File;
use std::path::{Path, PathBuf};

use ctxbound_core::types::{Scalar, Table};
use ctxbound_core::Result;

use super::{check_cap, ExportReader};
use crate::csv_error;
use crate::storage::not_found_or_io;

pub struct CsvExportReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: Vec<String>,
    counted: Option<u64>,
}

impl CsvExportReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| not_found_or_io(path, e))?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            counted: None,
        })
    }
}

impl ExportReader for CsvExportReader {
    fn num_rows(&mut self) -> Result<u64> {
        if let Some(n) = self.counted {
            return Ok(n);
        }
        // Count on a second descriptor so the primary reader stays at row 0.
        let file = File::open(&self.path).map_err(|e| not_found_or_io(&self.path, e))?;
        let mut counter = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut record = csv::ByteRecord::new();
        let mut n = 0u64;
        while counter.read_byte_record(&mut record).map_err(csv_error)? {
            n += 1;
        }
        self.counted = Some(n);
        Ok(n)
    }

    fn column_names(&self) -> Vec<String> {
        self.headers.clone()
    }

    fn read_all(mut self: Box<Self>, max_rows: usize) -> Result<Table> {
        if let Some(n) = self.counted {
            check_cap(n, max_rows)?;
        }

        let mut table = Table::with_columns(&self.headers);
        let mut seen = 0u64;
        let mut record = csv::StringRecord::new();
        while self.reader.read_record(&mut record).map_err(csv_error)? {
            seen += 1;
            if seen <= max_rows as u64 {
                table.push_row(record.iter().map(Scalar::infer).collect())?;
            }
        }
        check_cap(seen, max_rows)?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbound_core::error::ErrorKind;

    fn fixture(rows: usize) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp_fixture.csv");
        let mut body = String::from("session_id,pace,sport\n");
        for i in 0..rows {
            body.push_str(&format!("{},{},run\n", i, 5.0 + i as f64 / 10.0));
        }
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn counts_without_consuming() {
        let (_dir, path) = fixture(12);
        let mut reader = CsvExportReader::open(&path).unwrap();
        assert_eq!(reader.num_rows().unwrap(), 12);
        assert_eq!(reader.column_names(), vec!["session_id", "pace", "sport"]);
        let table = Box::new(reader).read_all(12).unwrap();
        assert_eq!(table.num_rows(), 12);
        assert_eq!(table.column("session_id").unwrap().values[11], Scalar::I64(11));
    }

    #[test]
    fn reports_true_size_when_over_cap() {
        let (_dir, path) = fixture(30);
        let reader = CsvExportReader::open(&path).unwrap();
        let err = Box::new(reader).read_all(10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeExceeded);
        assert!(err.to_string().contains("30 rows"));
    }
}
