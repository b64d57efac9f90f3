//! Handle- and view-producing reads. Nothing here returns rows except `load`,
//! which goes through the load budget.

use std::sync::Arc;
use std::time::Duration;

use ctxbound_core::config::BudgetConfig;
use ctxbound_core::sweep::{Sweep, SweepReport};
use ctxbound_core::types::Table;
use ctxbound_core::Result;
use ctxbound_export::{ExportHandle, ExportManager};
use ctxbound_io::ExportFormat;
use ctxbound_store::Source;
use ctxbound_views::{MaterializedView, ViewManager};

use crate::{SubReader, TableFamily};

pub struct ExportReader {
    exports: Arc<ExportManager>,
    views: Arc<ViewManager>,
    cfg: Arc<BudgetConfig>,
}

impl ExportReader {
    pub fn new(exports: Arc<ExportManager>, views: Arc<ViewManager>, cfg: Arc<BudgetConfig>) -> Self {
        Self { exports, views, cfg }
    }

    pub fn export(&self, query: &str, format: ExportFormat, max_rows: Option<u64>) -> Result<ExportHandle> {
        self.views.check_access(&Source::parse(query)?)?;
        self.exports.export(query, format, max_rows)
    }

    pub fn materialize(&self, name: &str, query: &str, ttl: Option<Duration>) -> Result<MaterializedView> {
        self.views.materialize(name, query, ttl)
    }

    /// Load an export under `min(max_rows, max_load_rows)`.
    pub fn load(&self, handle: &str, max_rows: Option<usize>) -> Result<Table> {
        let cap = max_rows
            .unwrap_or(self.cfg.max_load_rows)
            .min(self.cfg.max_load_rows);
        self.exports.load(handle, cap)
    }

    pub fn cleanup(&self, handle: &str) -> Result<bool> {
        self.exports.cleanup(handle)
    }

    pub fn drop_view(&self, name: &str) -> Result<bool> {
        self.views.drop_view(name)
    }

    pub fn exports(&self) -> Result<Vec<ExportHandle>> {
        self.exports.list()
    }

    pub fn views(&self) -> Result<Vec<MaterializedView>> {
        self.views.list()
    }

    /// Reclaim expired exports and views now.
    pub fn sweep(&self) -> SweepReport {
        let mut report = self.exports.sweep();
        report.merge(self.views.sweep());
        report
    }
}

impl SubReader for ExportReader {
    fn family(&self) -> TableFamily {
        TableFamily::Export
    }

    fn tables(&self) -> Vec<String> {
        self.views
            .list()
            .map(|vs| vs.into_iter().map(|v| v.name.to_string()).collect())
            .unwrap_or_default()
    }
}
