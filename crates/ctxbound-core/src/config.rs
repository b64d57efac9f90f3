//! Size-budget configuration shared by every component.
//!
//! Layering: `Default` → optional YAML file → `CTXBOUND_*` environment →
//! CLI flags (applied by the binary). The value is read-only once built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hard ceiling on `histogram` bins regardless of configuration.
pub const ABSOLUTE_MAX_BINS: usize = 100;

/// Serialized export handles must stay under this many bytes.
pub const MAX_HANDLE_BYTES: usize = 500;

/// Names of the table families the reader facade knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// One row per recorded session.
    pub sessions: String,
    /// Split-level detail (per-lap / per-interval records).
    pub splits: String,
    /// Second-by-second sensor samples.
    pub timeseries: String,
    /// Pre-reduced daily aggregates.
    pub daily: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            sessions: "sessions".to_string(),
            splits: "splits".to_string(),
            timeseries: "timeseries".to_string(),
            daily: "daily".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Max bytes of any JSON payload handed to the reasoning client.
    pub max_json_bytes: usize,

    /// Max bytes of non-JSON text handed to the reasoning client.
    pub max_text_bytes: usize,

    /// Max data rows in a rendered table.
    pub max_table_rows: usize,

    /// Max rows `safe_load` will materialize from an export.
    pub max_load_rows: usize,

    /// Default row cap for `export` when the caller gives none.
    pub max_export_rows: u64,

    /// Max live materialized views; the oldest is evicted past this.
    pub max_views: usize,

    pub export_ttl_secs: u64,
    pub view_ttl_secs: u64,

    pub default_bins: usize,
    pub max_bins: usize,

    /// Directory holding export files (one file per export).
    pub scratch_dir: PathBuf,

    /// Interval of the optional background sweeper.
    pub sweep_interval_secs: u64,

    /// Column used by date-range filters.
    pub date_column: String,

    pub tables: TableNames,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_json_bytes: 8 * 1024,
            max_text_bytes: 16 * 1024,
            max_table_rows: 50,
            max_load_rows: 100_000,
            max_export_rows: 1_000_000,
            max_views: 10,
            export_ttl_secs: 3_600,
            view_ttl_secs: 3_600,
            default_bins: 20,
            max_bins: ABSOLUTE_MAX_BINS,
            scratch_dir: std::env::temp_dir().join("ctxbound-scratch"),
            sweep_interval_secs: 60,
            date_column: "ts".to_string(),
            tables: TableNames::default(),
        }
    }
}

impl BudgetConfig {
    /// Defaults overlaid with `CTXBOUND_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    pub fn from_yaml_str(doc: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(doc)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let doc = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_yaml_str(&doc)
    }

    /// Overlay environment variables onto `self`.
    ///
    /// Environment variables:
    /// - `CTXBOUND_MAX_JSON_BYTES`, `CTXBOUND_MAX_TEXT_BYTES`
    /// - `CTXBOUND_MAX_TABLE_ROWS`, `CTXBOUND_MAX_LOAD_ROWS`, `CTXBOUND_MAX_EXPORT_ROWS`
    /// - `CTXBOUND_MAX_VIEWS`
    /// - `CTXBOUND_EXPORT_TTL_SECS`, `CTXBOUND_VIEW_TTL_SECS`
    /// - `CTXBOUND_DEFAULT_BINS`, `CTXBOUND_MAX_BINS`
    /// - `CTXBOUND_SCRATCH_DIR`, `CTXBOUND_SWEEP_INTERVAL_SECS`, `CTXBOUND_DATE_COLUMN`
    pub fn apply_env(&mut self) {
        env_parse("CTXBOUND_MAX_JSON_BYTES", &mut self.max_json_bytes);
        env_parse("CTXBOUND_MAX_TEXT_BYTES", &mut self.max_text_bytes);
        env_parse("CTXBOUND_MAX_TABLE_ROWS", &mut self.max_table_rows);
        env_parse("CTXBOUND_MAX_LOAD_ROWS", &mut self.max_load_rows);
        env_parse("CTXBOUND_MAX_EXPORT_ROWS", &mut self.max_export_rows);
        env_parse("CTXBOUND_MAX_VIEWS", &mut self.max_views);
        env_parse("CTXBOUND_EXPORT_TTL_SECS", &mut self.export_ttl_secs);
        env_parse("CTXBOUND_VIEW_TTL_SECS", &mut self.view_ttl_secs);
        env_parse("CTXBOUND_DEFAULT_BINS", &mut self.default_bins);
        env_parse("CTXBOUND_MAX_BINS", &mut self.max_bins);
        env_parse("CTXBOUND_SWEEP_INTERVAL_SECS", &mut self.sweep_interval_secs);

        if let Ok(s) = std::env::var("CTXBOUND_SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(s);
        }

        if let Ok(s) = std::env::var("CTXBOUND_DATE_COLUMN") {
            self.date_column = s;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            ("max_json_bytes", self.max_json_bytes),
            ("max_text_bytes", self.max_text_bytes),
            ("max_table_rows", self.max_table_rows),
            ("max_load_rows", self.max_load_rows),
            ("max_views", self.max_views),
            ("default_bins", self.default_bins),
            ("max_bins", self.max_bins),
        ];
        for (name, v) in nonzero {
            if v == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.max_export_rows == 0 {
            return Err(Error::Config("max_export_rows must be greater than zero".into()));
        }
        if self.max_bins > ABSOLUTE_MAX_BINS {
            return Err(Error::Config(format!(
                "max_bins {} exceeds the hard ceiling of {ABSOLUTE_MAX_BINS}",
                self.max_bins
            )));
        }
        if self.default_bins > self.max_bins {
            return Err(Error::Config(format!(
                "default_bins {} exceeds max_bins {}",
                self.default_bins, self.max_bins
            )));
        }
        if self.date_column.trim().is_empty() {
            return Err(Error::Config("date_column must not be empty".into()));
        }
        Ok(())
    }

    pub fn export_ttl(&self) -> Duration {
        Duration::from_secs(self.export_ttl_secs)
    }

    pub fn view_ttl(&self) -> Duration {
        Duration::from_secs(self.view_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(s) = std::env::var(key) {
        match s.parse::<T>() {
            Ok(v) => *slot = v,
            Err(_) => tracing::warn!(key, value = %s, "ignoring unparsable environment override"),
        }
    }
}
