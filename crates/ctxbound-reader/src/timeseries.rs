//! Second-by-second streams, only ever returned downsampled or summarized.

use std::sync::Arc;

use serde::Serialize;

use ctxbound_core::config::BudgetConfig;
use ctxbound_core::types::Table;
use ctxbound_core::{Error, Result};
use ctxbound_store::{quote_ident, Source, Store};
use ctxbound_summary::{profile, ColumnProfile, SummaryOptions};

use crate::{session_predicate, SubReader, TableFamily};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub session_id: i64,
    pub column: String,
    pub points: u64,
    pub stats: ColumnProfile,
}

pub struct TimeSeriesReader {
    store: Arc<Store>,
    cfg: Arc<BudgetConfig>,
}

impl TimeSeriesReader {
    pub fn new(store: Arc<Store>, cfg: Arc<BudgetConfig>) -> Self {
        Self { store, cfg }
    }

    fn numeric_column(&self, column: &str) -> Result<()> {
        let schema = self.store.describe(&Source::table(&self.cfg.tables.timeseries))?;
        match schema.field_named(column) {
            Some(f) if f.data_type.is_numeric() => Ok(()),
            Some(_) => Err(Error::InvalidArgument(format!("column '{column}' is not numeric"))),
            None => Err(Error::InvalidArgument(format!(
                "unknown column '{column}'; available: {}",
                schema.names().join(", ")
            ))),
        }
    }

    /// Average `column` over `buckets` equal-count slices of the session,
    /// ordered by time. `buckets` is capped at the table-row budget.
    pub fn resample(&self, session_id: i64, column: &str, buckets: usize) -> Result<Table> {
        if buckets == 0 {
            return Err(Error::InvalidArgument("buckets must be at least 1".into()));
        }
        self.numeric_column(column)?;
        let buckets = buckets.min(self.cfg.max_table_rows);
        let col = quote_ident(column);
        let ts = quote_ident(&self.cfg.date_column);
        let sql = format!(
            "SELECT bucket, CAST(MIN({ts}) AS VARCHAR) AS start, \
                    AVG({col}) AS mean, MIN({col}) AS \"min\", MAX({col}) AS \"max\", COUNT({col}) AS points \
             FROM (SELECT {ts}, {col}, NTILE({buckets}) OVER (ORDER BY {ts}) AS bucket \
                   FROM {} WHERE {}) AS s \
             GROUP BY bucket ORDER BY bucket",
            Source::table(&self.cfg.tables.timeseries).relation(),
            session_predicate(session_id)
        );
        tracing::debug!(session_id, column, buckets, "resample");
        self.store.query_table(&sql, buckets)
    }

    pub fn series_stats(&self, session_id: i64, column: &str) -> Result<SeriesStats> {
        self.numeric_column(column)?;
        let source = Source::Query(format!(
            "SELECT {} FROM {} WHERE {}",
            quote_ident(column),
            Source::table(&self.cfg.tables.timeseries).relation(),
            session_predicate(session_id)
        ));
        let mut p = profile(&self.store, &source, None, &SummaryOptions::from_config(&self.cfg))?;
        let stats = p
            .columns
            .remove(column)
            .ok_or_else(|| Error::Engine(format!("profile returned no column '{column}'")))?;
        Ok(SeriesStats {
            session_id,
            column: column.to_string(),
            points: p.row_count,
            stats,
        })
    }
}

impl SubReader for TimeSeriesReader {
    fn family(&self) -> TableFamily {
        TableFamily::TimeSeries
    }

    fn tables(&self) -> Vec<String> {
        vec![self.cfg.tables.timeseries.clone()]
    }
}
