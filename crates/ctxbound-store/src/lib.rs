#![forbid(unsafe_code)]
//! ctxbound-store: the embedded analytical engine behind every read.
//!
//! `Store` wraps one DuckDB database. Each call runs on its own cloned
//! connection so exports and summaries can proceed in parallel; results come
//! back as the bounded `ctxbound_core::types::Table`, never as engine types.
//! `sql` holds the small amount of SQL text construction the layer needs
//! (identifier quoting, table-or-query sources, date-range predicates).

pub mod sql;
pub mod store;

pub use sql::{quote_ident, quote_literal, DateRange, Source};
pub use store::{engine_error, Store};
