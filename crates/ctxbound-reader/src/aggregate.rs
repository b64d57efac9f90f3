//! Pre-reduced reads: profiles, histograms, per-session and global totals.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use ctxbound_core::config::BudgetConfig;
use ctxbound_core::types::Scalar;
use ctxbound_core::{Error, Result};
use ctxbound_store::{DateRange, Source, Store};
use ctxbound_summary::{histogram, profile, HistogramResult, ObservedRange, ProfileResult, SummaryOptions};
use ctxbound_views::ViewManager;

use crate::{session_predicate, SubReader, TableFamily};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: i64,
    /// The session's own row, one value per column.
    pub attributes: BTreeMap<String, Scalar>,
    pub split_count: u64,
    pub sample_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub sessions: u64,
    pub splits: u64,
    pub samples: u64,
    pub days: u64,
    pub date_range: Option<ObservedRange>,
}

pub struct AggregateReader {
    store: Arc<Store>,
    cfg: Arc<BudgetConfig>,
    views: Arc<ViewManager>,
}

impl AggregateReader {
    pub fn new(store: Arc<Store>, cfg: Arc<BudgetConfig>, views: Arc<ViewManager>) -> Self {
        Self { store, cfg, views }
    }

    fn options(&self) -> SummaryOptions {
        SummaryOptions::from_config(&self.cfg)
    }

    fn source(&self, table_or_query: &str) -> Result<Source> {
        let source = Source::parse(table_or_query)?;
        self.views.check_access(&source)?;
        Ok(source)
    }

    pub fn profile(&self, table_or_query: &str, range: Option<&DateRange>) -> Result<ProfileResult> {
        profile(&self.store, &self.source(table_or_query)?, range, &self.options())
    }

    pub fn histogram(
        &self,
        table_or_query: &str,
        column: &str,
        bins: Option<usize>,
        range: Option<&DateRange>,
    ) -> Result<HistogramResult> {
        histogram(
            &self.store,
            &self.source(table_or_query)?,
            column,
            bins,
            range,
            &self.options(),
        )
    }

    pub fn session_summary(&self, session_id: i64) -> Result<SessionSummary> {
        let tables = &self.cfg.tables;
        let filtered = |table: &str| {
            format!(
                "SELECT * FROM {} WHERE {}",
                Source::table(table).relation(),
                session_predicate(session_id)
            )
        };

        let row = self.store.query_table(&filtered(&tables.sessions), 1)?;
        if row.num_rows() == 0 {
            return Err(Error::InvalidArgument(format!("no session with id {session_id}")));
        }
        let attributes = row
            .columns
            .into_iter()
            .filter_map(|c| {
                let value = c.values.into_iter().next()?;
                Some((c.name, value))
            })
            .collect();

        // A store may carry sessions without any split or sample table.
        let related = |table: &str| -> Result<u64> {
            if !self.store.relation_exists(table)? {
                return Ok(0);
            }
            self.store.count(&filtered(table))
        };

        Ok(SessionSummary {
            session_id,
            attributes,
            split_count: related(&tables.splits)?,
            sample_count: related(&tables.timeseries)?,
        })
    }

    /// Row counts per family, optionally restricted to a date range.
    pub fn totals(&self, range: Option<&DateRange>) -> Result<Totals> {
        let tables = &self.cfg.tables;
        let date_column = &self.cfg.date_column;
        let count = |table: &str| -> Result<u64> {
            let source = Source::table(table);
            if !self.store.relation_exists(table)? {
                return Ok(0);
            }
            let has_dates = self.store.describe(&source)?.field_named(date_column).is_some();
            let scoped = if has_dates { range } else { None };
            self.store.count(&source.select_all(scoped, date_column))
        };

        let sessions = self.profile(&tables.sessions, range)?;
        Ok(Totals {
            sessions: sessions.row_count,
            splits: count(&tables.splits)?,
            samples: count(&tables.timeseries)?,
            days: count(&tables.daily)?,
            date_range: sessions.date_range,
        })
    }
}

impl SubReader for AggregateReader {
    fn family(&self) -> TableFamily {
        TableFamily::Aggregate
    }

    fn tables(&self) -> Vec<String> {
        vec![self.cfg.tables.daily.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clock, seeded_store};
    use ctxbound_core::error::ErrorKind;

    fn reader() -> AggregateReader {
        let store = seeded_store();
        let cfg = Arc::new(BudgetConfig::default());
        let views = Arc::new(ViewManager::with_clock(store.clone(), &cfg, Arc::new(clock())));
        AggregateReader::new(store, cfg, views)
    }

    #[test]
    fn profile_and_histogram_pass_through() {
        let r = reader();
        let p = r.profile("splits", None).unwrap();
        assert_eq!(p.row_count, 160);
        assert!(p.columns["pace"].mean.is_some());

        let h = r.histogram("timeseries", "heart_rate", Some(8), None).unwrap();
        assert_eq!(h.bins.len(), 8);
        assert_eq!(h.total_count, 2_400);
    }

    #[test]
    fn session_summary_counts_related_rows() {
        let r = reader();
        let s = r.session_summary(3).unwrap();
        assert_eq!(s.split_count, 40);
        assert_eq!(s.sample_count, 600);
        assert_eq!(s.attributes["sport"], Scalar::Str("ride".into()));

        assert_eq!(r.session_summary(42).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn totals_respect_the_date_range() {
        let r = reader();
        let all = r.totals(None).unwrap();
        assert_eq!((all.sessions, all.splits, all.samples, all.days), (4, 160, 2_400, 4));

        let range = DateRange::parse("2024-03-02", "2024-03-03").unwrap();
        let some = r.totals(Some(&range)).unwrap();
        assert_eq!((some.sessions, some.splits, some.samples, some.days), (2, 80, 1_200, 2));
        assert_eq!(some.date_range.unwrap().end, "2024-03-03");
    }
}
