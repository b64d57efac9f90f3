use std::path::Path;

use ctxbound_core::id::HandleId;
use ctxbound_core::types::Table;
use ctxbound_core::{Error, Result};
use ctxbound_io::{open_export, ScratchDir};

/// Load an export file, refusing with `SizeExceeded` before materializing
/// anything when it holds more than `max_rows`.
///
/// A file deleted by an expiry sweep between resolution and open surfaces as
/// `HandleNotFound`; once open, the whole file stays readable.
pub fn safe_load(path: impl AsRef<Path>, max_rows: usize) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = open_export(path)?;
    let rows = reader.num_rows()?;
    if rows > max_rows as u64 {
        return Err(Error::too_many_rows(rows, max_rows as u64));
    }
    tracing::debug!(path = %path.display(), rows, "loading export");
    reader.read_all(max_rows)
}

/// `safe_load` by handle identifier, looked up in `scratch`.
pub fn safe_load_handle(scratch: &ScratchDir, handle: &str, max_rows: usize) -> Result<Table> {
    let id = HandleId::parse(handle)?;
    let (path, _) = scratch
        .find(&id)
        .ok_or_else(|| Error::HandleNotFound(id.to_string()))?;
    safe_load(path, max_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbound_core::error::ErrorKind;
    use ctxbound_io::ExportFormat;

    fn csv_export(rows: usize) -> (tempfile::TempDir, ScratchDir, HandleId) {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path());
        let id = HandleId::generate(0);
        let mut body = String::from("ts,pace\n");
        for i in 0..rows {
            body.push_str(&format!("2024-03-01 06:{:02}:00,{}\n", i % 60, 5.0 + i as f64 / 100.0));
        }
        std::fs::write(scratch.path_for(&id, ExportFormat::Csv), body).unwrap();
        (dir, scratch, id)
    }

    #[test]
    fn loads_within_the_cap() {
        let (_dir, scratch, id) = csv_export(40);
        let t = safe_load_handle(&scratch, id.as_str(), 40).unwrap();
        assert_eq!(t.num_rows(), 40);
        assert_eq!(t.column_names(), vec!["ts", "pace"]);
    }

    #[test]
    fn refuses_over_the_cap_with_a_suggestion() {
        let (_dir, scratch, id) = csv_export(41);
        let err = safe_load_handle(&scratch, id.as_str(), 40).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeExceeded);
        assert!(err.to_string().contains("aggregation"));
    }

    #[test]
    fn deleted_exports_are_not_found() {
        let (_dir, scratch, id) = csv_export(1);
        let path = scratch.path_for(&id, ExportFormat::Csv);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            safe_load_handle(&scratch, id.as_str(), 10).unwrap_err().kind(),
            ErrorKind::HandleNotFound
        );
        assert_eq!(safe_load(&path, 10).unwrap_err().kind(), ErrorKind::HandleNotFound);
    }
}
