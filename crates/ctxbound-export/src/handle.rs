use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ctxbound_core::config::MAX_HANDLE_BYTES;
use ctxbound_core::id::HandleId;
use ctxbound_core::Result;
use ctxbound_io::ExportFormat;

/// Everything known about one export. The file at `path` is immutable once
/// the handle exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportHandle {
    pub handle: HandleId,
    #[serde(skip)]
    pub path: PathBuf,
    pub format: ExportFormat,
    pub row_count: u64,
    pub size_bytes: u64,
    pub columns: Vec<String>,
    pub created_ms: u64,
    pub expires_ms: u64,
}

/// Wire form returned to the client.
#[derive(Debug, Serialize)]
struct HandleSummary<'a> {
    handle: &'a str,
    format: ExportFormat,
    row_count: u64,
    size_bytes: u64,
    columns: &'a [String],
    #[serde(skip_serializing_if = "is_zero")]
    columns_omitted: usize,
    expires_ms: u64,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ExportHandle {
    pub fn id(&self) -> &str {
        self.handle.as_str()
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_ms
    }

    /// Compact JSON under `MAX_HANDLE_BYTES`. Trailing column names are
    /// dropped (and counted in `columns_omitted`) until it fits.
    pub fn to_bounded_json(&self) -> Result<String> {
        let mut keep = self.columns.len();
        loop {
            let summary = HandleSummary {
                handle: self.handle.as_str(),
                format: self.format,
                row_count: self.row_count,
                size_bytes: self.size_bytes,
                columns: &self.columns[..keep],
                columns_omitted: self.columns.len() - keep,
                expires_ms: self.expires_ms,
            };
            let json = serde_json::to_string(&summary)?;
            if json.len() < MAX_HANDLE_BYTES || keep == 0 {
                return Ok(json);
            }
            keep -= 1;
        }
    }
}
