use serde::Serialize;

use ctxbound_core::{Error, Result};

/// Compact JSON for `value`, or `SizeExceeded` when it is over `max_bytes`.
pub fn safe_serialize<T: Serialize + ?Sized>(value: &T, max_bytes: usize) -> Result<String> {
    let json = serde_json::to_string(value)?;
    if json.len() > max_bytes {
        return Err(Error::too_many_bytes(json.len() as u64, max_bytes as u64));
    }
    Ok(json)
}
