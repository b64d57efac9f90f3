#![forbid(unsafe_code)]
//! ctxbound-views: named, expiring materialized views.
//!
//! A view is a table created from a query so that repeated downstream reads
//! hit the precomputed result. At most `max_views` are live; registering one
//! more evicts the oldest by creation time.

pub mod manager;
pub mod registry;

pub use manager::ViewManager;
pub use registry::{MaterializedView, ViewRegistry};
