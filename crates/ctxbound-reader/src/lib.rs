#![forbid(unsafe_code)]
//! ctxbound-reader: the single entry point for reads.
//!
//! `DataReader` owns one sub-reader per table family and forwards each
//! public operation to it. Only the split reader can return per-record rows,
//! and only when asked for `SplitMode::Detail`; everything else returns
//! summaries or handles.

pub mod aggregate;
pub mod export;
pub mod facade;
pub mod metadata;
pub mod splits;
pub mod timeseries;

pub use aggregate::{AggregateReader, SessionSummary, Totals};
pub use export::ExportReader;
pub use facade::DataReader;
pub use metadata::{MetadataReader, TableInfo};
pub use splits::{SplitMode, SplitReader, SplitResult};
pub use timeseries::{SeriesStats, TimeSeriesReader};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column joining splits and time-series rows to their session.
pub const SESSION_ID_COLUMN: &str = "session_id";

/// The closed set of sub-readers the facade dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFamily {
    Metadata,
    Splits,
    Aggregate,
    TimeSeries,
    Export,
}

impl TableFamily {
    pub const ALL: [TableFamily; 5] = [
        TableFamily::Metadata,
        TableFamily::Splits,
        TableFamily::Aggregate,
        TableFamily::TimeSeries,
        TableFamily::Export,
    ];
}

impl fmt::Display for TableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableFamily::Metadata => "metadata",
            TableFamily::Splits => "splits",
            TableFamily::Aggregate => "aggregate",
            TableFamily::TimeSeries => "timeseries",
            TableFamily::Export => "export",
        })
    }
}

/// Common surface of every sub-reader.
pub trait SubReader: Send + Sync {
    fn family(&self) -> TableFamily;

    /// Store tables this sub-reader reads from.
    fn tables(&self) -> Vec<String>;
}

pub(crate) fn session_predicate(session_id: i64) -> String {
    format!("{} = {session_id}", ctxbound_store::quote_ident(SESSION_ID_COLUMN))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use ctxbound_core::clock::ManualClock;
    use ctxbound_core::config::BudgetConfig;
    use ctxbound_store::Store;

    /// Four sessions over four days, 40 splits and 600 samples each.
    pub fn seeded_store() -> Arc<Store> {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE sessions AS \
                 SELECT s AS session_id, \
                        CASE WHEN s % 2 = 0 THEN 'run' ELSE 'ride' END AS sport, \
                        TIMESTAMP '2024-03-01 07:00:00' + INTERVAL (s) DAY AS ts \
                 FROM range(1, 5) t(s); \
                 CREATE TABLE splits AS \
                 SELECT s.session_id, k AS split_no, \
                        CAST(4.5 + (k % 10) / 10.0 AS DOUBLE) AS pace, \
                        CAST(140 + k % 20 AS INTEGER) AS hr, \
                        s.ts + INTERVAL (k * 5) MINUTE AS ts \
                 FROM sessions s, range(40) r(k); \
                 CREATE TABLE timeseries AS \
                 SELECT s.session_id, \
                        s.ts + INTERVAL (k) SECOND AS ts, \
                        CAST(130 + k % 40 AS DOUBLE) AS heart_rate, \
                        CASE WHEN k % 50 = 0 THEN NULL ELSE CAST(k % 7 AS DOUBLE) END AS power \
                 FROM sessions s, range(600) r(k); \
                 CREATE TABLE daily AS \
                 SELECT CAST(ts AS DATE) AS ts, COUNT(*) AS sessions FROM sessions GROUP BY 1;",
            )
            .unwrap();
        Arc::new(store)
    }

    pub fn config(dir: &std::path::Path) -> BudgetConfig {
        BudgetConfig {
            scratch_dir: dir.join("scratch"),
            max_table_rows: 20,
            ..BudgetConfig::default()
        }
    }

    pub fn clock() -> ManualClock {
        ManualClock::new(1_760_000_000_000)
    }
}
