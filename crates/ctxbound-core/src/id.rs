//! Strongly-typed identifiers handed to callers instead of content.

use std::fmt;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix shared by every export identifier and scratch file.
pub const HANDLE_PREFIX: &str = "exp_";

/// Opaque export identifier: `exp_<YYYYmmddTHHMMSS>_<8 hex>`.
///
/// Doubles as the scratch file stem, so it is restricted to `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct HandleId(String);

impl HandleId {
    /// Mint a new identifier stamped with `now_ms`.
    pub fn generate(now_ms: u64) -> Self {
        let stamp = Utc
            .timestamp_millis_opt(now_ms as i64)
            .single()
            .unwrap_or_default()
            .format("%Y%m%dT%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{HANDLE_PREFIX}{stamp}_{}", &suffix[..8]))
    }

    /// Validate a caller-supplied identifier.
    pub fn parse(s: &str) -> Result<Self> {
        let valid = s.starts_with(HANDLE_PREFIX)
            && s.len() <= 64
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::HandleNotFound(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HandleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Engine-level name of a materialized view. Must be a plain SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ViewName(String);

impl ViewName {
    pub fn parse(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if head_ok && s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(Error::InvalidArgument(format!(
                "view name '{s}' must match [A-Za-z_][A-Za-z0-9_]{{0,62}}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
