#![forbid(unsafe_code)]
//! ctxbound: context-bounded access to fitness telemetry.
//!
//! Umbrella crate re-exporting the workspace members under one name.

pub use ctxbound_core as core;
pub use ctxbound_export as export;
pub use ctxbound_io as io;
pub use ctxbound_reader as reader;
pub use ctxbound_safety as safety;
pub use ctxbound_store as store;
pub use ctxbound_summary as summary;
pub use ctxbound_views as views;

pub use ctxbound_core::config::BudgetConfig;
pub use ctxbound_core::{Error, Result};
pub use ctxbound_reader::DataReader;
