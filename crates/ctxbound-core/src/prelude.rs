//! Convenient re-exports for downstream crates.

pub use crate::clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use crate::config::{BudgetConfig, TableNames};
pub use crate::error::{Error, ErrorKind, Result, SizeKind};
pub use crate::id::{HandleId, ViewName};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::sweep::{PeriodicSweeper, Sweep, SweepReport};
pub use crate::ttl::TtlIndex;
pub use crate::types::{Column, Scalar, Table};
