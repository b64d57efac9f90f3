//! Split-level reads. The only place per-record rows can leave the store,
//! and only in `Detail` mode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ctxbound_core::config::BudgetConfig;
use ctxbound_core::types::Table;
use ctxbound_core::Result;
use ctxbound_store::{Source, Store};
use ctxbound_summary::{profile, ProfileResult, SummaryOptions};

use crate::{session_predicate, SubReader, TableFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SplitMode {
    /// A profile of the session's splits; no rows.
    #[default]
    StatisticsOnly,
    /// The rows themselves, capped at `min(max_rows, max_table_rows)`.
    Detail { max_rows: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "result")]
pub enum SplitResult {
    Statistics(ProfileResult),
    Detail(Table),
}

pub struct SplitReader {
    store: Arc<Store>,
    cfg: Arc<BudgetConfig>,
}

impl SplitReader {
    pub fn new(store: Arc<Store>, cfg: Arc<BudgetConfig>) -> Self {
        Self { store, cfg }
    }

    fn session_query(&self, session_id: i64) -> String {
        format!(
            "SELECT * FROM {} WHERE {}",
            Source::table(&self.cfg.tables.splits).relation(),
            session_predicate(session_id)
        )
    }

    pub fn splits(&self, session_id: i64, mode: SplitMode) -> Result<SplitResult> {
        let query = self.session_query(session_id);
        match mode {
            SplitMode::StatisticsOnly => {
                let opts = SummaryOptions::from_config(&self.cfg);
                let p = profile(&self.store, &Source::Query(query), None, &opts)?;
                Ok(SplitResult::Statistics(p))
            }
            SplitMode::Detail { max_rows } => {
                let cap = max_rows.min(self.cfg.max_table_rows);
                tracing::debug!(session_id, cap, "split detail read");
                Ok(SplitResult::Detail(self.store.query_table(&query, cap)?))
            }
        }
    }
}

impl SubReader for SplitReader {
    fn family(&self) -> TableFamily {
        TableFamily::Splits
    }

    fn tables(&self) -> Vec<String> {
        vec![self.cfg.tables.splits.clone()]
    }
}
