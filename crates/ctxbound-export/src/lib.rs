#![forbid(unsafe_code)]
//! ctxbound-export: run a query, park the full result in a scratch file, hand
//! back an identifier and a few hundred bytes of metadata.
//!
//! - `handle`: the handle record and its size-bounded JSON form.
//! - `registry`: live handles ordered by expiry.
//! - `manager`: export, load, lazy expiry, sweep, orphan cleanup.

pub mod handle;
pub mod manager;
pub mod registry;

pub use handle::ExportHandle;
pub use manager::ExportManager;
pub use registry::ExportRegistry;
