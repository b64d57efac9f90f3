//! Last-line check on anything about to be handed to the caller.

use serde::Serialize;

use ctxbound_core::config::BudgetConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validation {
    fn pass() -> Self {
        Self { ok: true, reason: None }
    }

    fn fail(reason: String) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub max_json_bytes: usize,
    pub max_table_rows: usize,
    pub max_text_bytes: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::from_config(&BudgetConfig::default())
    }
}

impl Validator {
    pub fn from_config(cfg: &BudgetConfig) -> Self {
        Self {
            max_json_bytes: cfg.max_json_bytes,
            max_table_rows: cfg.max_table_rows,
            max_text_bytes: cfg.max_text_bytes,
        }
    }

    /// JSON is held to the byte budget. Anything else is treated as a
    /// rendered table: a header, `max_table_rows` rows and one marker line.
    pub fn validate(&self, output: &str) -> Validation {
        if looks_like_json(output) {
            if output.len() > self.max_json_bytes {
                return Validation::fail(format!(
                    "JSON output is {} bytes, over the {}-byte limit; summarize or return a handle",
                    output.len(),
                    self.max_json_bytes
                ));
            }
            return Validation::pass();
        }

        let lines = output.lines().count();
        let max_lines = self.max_table_rows + 2;
        if lines > max_lines {
            return Validation::fail(format!(
                "text output has {lines} lines, over the {max_lines}-line limit \
                 ({} rows plus header and marker); render with safe_render_table",
                self.max_table_rows
            ));
        }
        if output.len() > self.max_text_bytes {
            return Validation::fail(format!(
                "text output is {} bytes, over the {}-byte limit",
                output.len(),
                self.max_text_bytes
            ));
        }
        Validation::pass()
    }
}

/// Validate against the default budgets.
pub fn validate(output: &str) -> Validation {
    Validator::default().validate(output)
}

fn looks_like_json(output: &str) -> bool {
    let t = output.trim_start();
    (t.starts_with('{') || t.starts_with('['))
        && serde_json::from_str::<serde::de::IgnoredAny>(output).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::safe_render_table;
    use ctxbound_core::types::{Column, Scalar, Table};

    #[test]
    fn json_is_checked_by_bytes() {
        assert!(validate(r#"{"row_count": 2000}"#).ok);
        let big = format!("[{}]", vec!["1"; 5_000].join(","));
        let v = validate(&big);
        assert!(!v.ok);
        assert!(v.reason.unwrap().contains("8192-byte"));
    }

    #[test]
    fn text_is_checked_by_lines() {
        let v = Validator {
            max_json_bytes: 100,
            max_table_rows: 10,
            max_text_bytes: 10_000,
        };
        let ok = (0..12).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        assert!(v.validate(&ok).ok);
        let long = (0..13).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let res = v.validate(&long);
        assert!(!res.ok);
        assert!(res.reason.unwrap().contains("13 lines"));
    }

    #[test]
    fn rendered_tables_always_pass() {
        let t = Table::new(vec![Column::new(
            "split_id",
            (0..5_000).map(Scalar::I64).collect(),
        )])
        .unwrap();
        let cfg = BudgetConfig::default();
        let out = safe_render_table(&t, cfg.max_table_rows, None).unwrap();
        assert_eq!(Validator::from_config(&cfg).validate(&out), Validation::pass());
    }

    #[test]
    fn malformed_json_falls_back_to_text_rules() {
        let v = validate("{not json");
        assert!(v.ok);
    }
}
