#![forbid(unsafe_code)]
//! ctxbound-summary: bounded aggregate statistics.
//!
//! Both engines push all work into the store as aggregate queries and return
//! a result whose size depends on the column (or bin) count only, never on
//! the number of rows summarized.

pub mod histogram;
pub mod profile;

pub use histogram::{histogram, Bin, HistogramResult};
pub use profile::{profile, ColumnProfile, ObservedRange, ProfileResult};

use ctxbound_core::config::BudgetConfig;

/// Knobs shared by both engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Column date ranges are applied to and reported from.
    pub date_column: String,
    pub default_bins: usize,
    pub max_bins: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self::from_config(&BudgetConfig::default())
    }
}

impl SummaryOptions {
    pub fn from_config(cfg: &BudgetConfig) -> Self {
        Self {
            date_column: cfg.date_column.clone(),
            default_bins: cfg.default_bins,
            max_bins: cfg.max_bins,
        }
    }
}
