#![forbid(unsafe_code)]
//! ctxbound-core: shared types for the context-bounded access layer.
//!
//! Everything that more than one crate needs lives here: the error taxonomy,
//! the size-budget configuration, clocks, the expiry index used by the export
//! and view registries, and the small `Table`/`Scalar` value model returned by
//! loaders. No engine or file-format dependencies in core.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod sweep;
pub mod ttl;
pub mod types;

pub use error::{Error, Result};

/// Crate version, stamped into CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
