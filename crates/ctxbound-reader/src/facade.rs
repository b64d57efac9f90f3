//! Reader facade: owns the store, the export and view managers, and one
//! sub-reader per table family. Every public read is a one-line forward.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctxbound_core::clock::{system_clock, SharedClock};
use ctxbound_core::config::BudgetConfig;
use ctxbound_core::schema::Schema;
use ctxbound_core::sweep::{PeriodicSweeper, Sweep, SweepReport};
use ctxbound_core::types::Table;
use ctxbound_core::{Error, Result};
use ctxbound_export::{ExportHandle, ExportManager};
use ctxbound_io::{ExportFormat, ScratchDir};
use ctxbound_store::{DateRange, Store};
use ctxbound_summary::{HistogramResult, ObservedRange, ProfileResult};
use ctxbound_views::{MaterializedView, ViewManager};

use crate::aggregate::{AggregateReader, SessionSummary, Totals};
use crate::export::ExportReader;
use crate::metadata::{MetadataReader, TableInfo};
use crate::splits::{SplitMode, SplitReader, SplitResult};
use crate::timeseries::{SeriesStats, TimeSeriesReader};
use crate::{SubReader, TableFamily};

pub struct DataReader {
    cfg: Arc<BudgetConfig>,
    exports: Arc<ExportManager>,
    views: Arc<ViewManager>,
    metadata: MetadataReader,
    splits: SplitReader,
    aggregate: AggregateReader,
    timeseries: TimeSeriesReader,
    export: ExportReader,
    sweeper: Mutex<Option<PeriodicSweeper>>,
}

impl DataReader {
    pub fn new(store: Arc<Store>, cfg: BudgetConfig) -> Result<Self> {
        Self::with_clock(store, cfg, system_clock())
    }

    /// Build every component over one store and clock. Validates `cfg` and
    /// runs the managers' `init`.
    pub fn with_clock(store: Arc<Store>, cfg: BudgetConfig, clock: SharedClock) -> Result<Self> {
        cfg.validate()?;
        let cfg = Arc::new(cfg);
        let exports = Arc::new(ExportManager::with_clock(store.clone(), &cfg, clock.clone()));
        let views = Arc::new(ViewManager::with_clock(store.clone(), &cfg, clock));
        exports.init()?;
        views.init()?;

        Ok(Self {
            metadata: MetadataReader::new(store.clone(), cfg.clone()),
            splits: SplitReader::new(store.clone(), cfg.clone()),
            aggregate: AggregateReader::new(store.clone(), cfg.clone(), views.clone()),
            timeseries: TimeSeriesReader::new(store, cfg.clone()),
            export: ExportReader::new(exports.clone(), views.clone(), cfg.clone()),
            cfg,
            exports,
            views,
            sweeper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.cfg
    }

    pub fn scratch(&self) -> &ScratchDir {
        self.exports.scratch()
    }

    pub fn sub_reader(&self, family: TableFamily) -> &dyn SubReader {
        match family {
            TableFamily::Metadata => &self.metadata,
            TableFamily::Splits => &self.splits,
            TableFamily::Aggregate => &self.aggregate,
            TableFamily::TimeSeries => &self.timeseries,
            TableFamily::Export => &self.export,
        }
    }

    /// Start background expiry sweeping at the configured interval. A zero
    /// interval leaves sweeping to `sweep()` and lazy expiry.
    pub fn start_sweeper(&self) -> Result<()> {
        let interval = self.cfg.sweep_interval();
        if interval == Duration::ZERO {
            return Ok(());
        }
        let mut slot = self
            .sweeper
            .lock()
            .map_err(|_| Error::Engine("sweeper lock poisoned".into()))?;
        if slot.is_none() {
            let exports: Arc<dyn Sweep> = self.exports.clone();
            let views: Arc<dyn Sweep> = self.views.clone();
            let targets = vec![exports, views];
            *slot = Some(PeriodicSweeper::spawn(targets, interval)?);
            tracing::debug!(interval_secs = interval.as_secs(), "sweeper started");
        }
        Ok(())
    }

    /// Stop sweeping, then delete every export file and drop every view.
    pub fn teardown(&self) -> SweepReport {
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(sweeper) = slot.take() {
                sweeper.stop();
            }
        }
        let mut report = self.exports.teardown();
        report.merge(self.views.teardown());
        tracing::info!(removed = report.removed, failed = report.failed, "reader torn down");
        report
    }

    // metadata

    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        self.metadata.list_tables()
    }

    pub fn describe(&self, table: &str) -> Result<Schema> {
        self.metadata.describe(table)
    }

    pub fn session_count(&self) -> Result<u64> {
        self.metadata.session_count()
    }

    pub fn session_date_range(&self) -> Result<Option<ObservedRange>> {
        self.metadata.session_date_range()
    }

    // splits

    pub fn splits(&self, session_id: i64, mode: SplitMode) -> Result<SplitResult> {
        self.splits.splits(session_id, mode)
    }

    // aggregate

    pub fn profile(&self, table_or_query: &str, range: Option<&DateRange>) -> Result<ProfileResult> {
        self.aggregate.profile(table_or_query, range)
    }

    pub fn histogram(
        &self,
        table_or_query: &str,
        column: &str,
        bins: Option<usize>,
        range: Option<&DateRange>,
    ) -> Result<HistogramResult> {
        self.aggregate.histogram(table_or_query, column, bins, range)
    }

    pub fn session_summary(&self, session_id: i64) -> Result<SessionSummary> {
        self.aggregate.session_summary(session_id)
    }

    pub fn totals(&self, range: Option<&DateRange>) -> Result<Totals> {
        self.aggregate.totals(range)
    }

    // time series

    pub fn resample(&self, session_id: i64, column: &str, buckets: usize) -> Result<Table> {
        self.timeseries.resample(session_id, column, buckets)
    }

    pub fn series_stats(&self, session_id: i64, column: &str) -> Result<SeriesStats> {
        self.timeseries.series_stats(session_id, column)
    }

    // exports and views

    pub fn export(&self, query: &str, format: ExportFormat, max_rows: Option<u64>) -> Result<ExportHandle> {
        self.export.export(query, format, max_rows)
    }

    pub fn materialize(&self, name: &str, query: &str, ttl: Option<Duration>) -> Result<MaterializedView> {
        self.export.materialize(name, query, ttl)
    }

    pub fn load(&self, handle: &str, max_rows: Option<usize>) -> Result<Table> {
        self.export.load(handle, max_rows)
    }

    pub fn cleanup(&self, handle: &str) -> Result<bool> {
        self.export.cleanup(handle)
    }

    pub fn drop_view(&self, name: &str) -> Result<bool> {
        self.export.drop_view(name)
    }

    pub fn exports(&self) -> Result<Vec<ExportHandle>> {
        self.export.exports()
    }

    pub fn views(&self) -> Result<Vec<MaterializedView>> {
        self.export.views()
    }

    pub fn sweep(&self) -> SweepReport {
        self.export.sweep()
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.sweeper.lock() {
            slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clock, config, seeded_store};

    #[test]
    fn every_family_has_a_sub_reader() {
        let dir = tempfile::tempdir().unwrap();
        let reader = DataReader::with_clock(seeded_store(), config(dir.path()), Arc::new(clock())).unwrap();
        for family in TableFamily::ALL {
            assert_eq!(reader.sub_reader(family).family(), family);
        }
        assert_eq!(reader.sub_reader(TableFamily::Splits).tables(), vec!["splits"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BudgetConfig {
            max_views: 0,
            ..config(dir.path())
        };
        assert!(DataReader::new(seeded_store(), cfg).is_err());
    }

    #[test]
    fn sweeper_starts_once_and_teardown_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let reader = DataReader::new(seeded_store(), config(dir.path())).unwrap();
        reader.start_sweeper().unwrap();
        reader.start_sweeper().unwrap();

        let h = reader.export("sessions", ExportFormat::Csv, None).unwrap();
        reader.materialize("recent", "SELECT * FROM sessions", None).unwrap();
        let report = reader.teardown();
        assert_eq!(report, SweepReport { removed: 2, failed: 0 });
        assert!(!h.path.exists());
    }
}
