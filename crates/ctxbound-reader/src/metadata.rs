//! Catalog-level reads: which tables exist, their shape, session coverage.

use std::sync::Arc;

use serde::Serialize;

use ctxbound_core::config::BudgetConfig;
use ctxbound_core::schema::Schema;
use ctxbound_core::types::Scalar;
use ctxbound_core::Result;
use ctxbound_store::{quote_ident, Source, Store};
use ctxbound_summary::ObservedRange;

use crate::{SubReader, TableFamily};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: u64,
    pub columns: usize,
}

pub struct MetadataReader {
    store: Arc<Store>,
    cfg: Arc<BudgetConfig>,
}

impl MetadataReader {
    pub fn new(store: Arc<Store>, cfg: Arc<BudgetConfig>) -> Self {
        Self { store, cfg }
    }

    /// Every table and view with its size.
    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        self.store
            .relation_names()?
            .into_iter()
            .map(|name| {
                let source = Source::table(&name);
                let row_count = self.store.count(&source.to_query())?;
                let columns = self.store.describe(&source)?.fields.len();
                Ok(TableInfo {
                    name,
                    row_count,
                    columns,
                })
            })
            .collect()
    }

    pub fn describe(&self, table: &str) -> Result<Schema> {
        self.store.describe(&Source::parse(table)?)
    }

    pub fn session_count(&self) -> Result<u64> {
        self.store
            .count(&Source::table(&self.cfg.tables.sessions).to_query())
    }

    /// First and last day with a recorded session.
    pub fn session_date_range(&self) -> Result<Option<ObservedRange>> {
        let d = format!("TRY_CAST({} AS DATE)", quote_ident(&self.cfg.date_column));
        let sql = format!(
            "SELECT CAST(MIN({d}) AS VARCHAR) AS date_start, CAST(MAX({d}) AS VARCHAR) AS date_end \
             FROM {}",
            Source::table(&self.cfg.tables.sessions).relation()
        );
        let row = self.store.query_table(&sql, 1)?;
        let first = |name: &str| row.column(name).and_then(|c| c.values.first().cloned());
        Ok(match (first("date_start"), first("date_end")) {
            (Some(Scalar::Str(start)), Some(Scalar::Str(end))) => Some(ObservedRange { start, end }),
            _ => None,
        })
    }
}

impl SubReader for MetadataReader {
    fn family(&self) -> TableFamily {
        TableFamily::Metadata
    }

    fn tables(&self) -> Vec<String> {
        vec![self.cfg.tables.sessions.clone()]
    }
}
