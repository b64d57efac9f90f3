#![forbid(unsafe_code)]
//! ctxbound-safety: guards for code running on the client side of a handle.
//!
//! Analysis code loads exports, computes, and hands something back to a
//! context-limited caller. Every function here either returns output under a
//! fixed budget or fails with `SizeExceeded`; none of them truncate silently
//! except `safe_render_table`, which marks what it left out.

pub mod load;
pub mod render;
pub mod serialize;
pub mod validate;

pub use load::{safe_load, safe_load_handle};
pub use render::{safe_render_table, MAX_CELL_CHARS};
pub use serialize::safe_serialize;
pub use validate::{validate, Validation, Validator};
