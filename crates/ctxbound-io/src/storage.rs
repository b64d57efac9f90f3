//! Scratch directory holding export files.
//!
//! Layout: `<root>/exp_<YYYYmmddTHHMMSS>_<8 hex>.<ext>`, one file per export.
//! Files are written once by the engine and never modified afterwards.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ctxbound_core::id::{HandleId, HANDLE_PREFIX};
use ctxbound_core::{Error, Result};

use crate::format::ExportFormat;

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

/// A file found in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchEntry {
    pub path: PathBuf,
    pub handle: HandleId,
    pub size_bytes: u64,
    pub modified_ms: u64,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory tree if missing.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::StorageIo(format!("mkdir {}: {e}", self.root.display())))
    }

    pub fn path_for(&self, handle: &HandleId, format: ExportFormat) -> PathBuf {
        self.root
            .join(format!("{}.{}", handle.as_str(), format.extension()))
    }

    /// Locate the file backing `handle`, whatever its format.
    pub fn find(&self, handle: &HandleId) -> Option<(PathBuf, ExportFormat)> {
        [ExportFormat::Parquet, ExportFormat::Csv]
            .into_iter()
            .map(|f| (self.path_for(handle, f), f))
            .find(|(p, _)| p.is_file())
    }

    pub fn size(&self, path: &Path) -> Result<u64> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| not_found_or_io(path, e))
    }

    /// Delete a file. Idempotent: a missing file is not an error.
    pub fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::StorageIo(format!("delete {}: {e}", path.display()))),
        }
    }

    /// Every export-shaped file currently in the directory.
    pub fn list(&self) -> Result<Vec<ScratchEntry>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::StorageIo(format!("list {}: {e}", self.root.display()))),
        };

        let mut out = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| Error::StorageIo(format!("list: {e}")))?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !stem.starts_with(HANDLE_PREFIX) || ExportFormat::from_path(&path).is_err() {
                continue;
            }
            let Ok(handle) = HandleId::parse(stem) else {
                continue;
            };
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable scratch entry");
                    continue;
                }
            };
            let modified_ms = meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            out.push(ScratchEntry {
                path,
                handle,
                size_bytes: meta.len(),
                modified_ms,
            });
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

pub(crate) fn not_found_or_io(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("<unknown>");
        Error::HandleNotFound(name.to_string())
    } else {
        Error::StorageIo(format!("{}: {e}", path.display()))
    }
}
