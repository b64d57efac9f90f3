//! SQL text helpers. Callers pass either a table/view name or a full query;
//! everything else (quoting, sub-query wrapping, date filters) is built here.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ctxbound_core::{Error, Result};

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal, escaping embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// What a summary or export runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A table or materialized view, optionally schema-qualified.
    Table(String),
    /// An arbitrary `SELECT`.
    Query(String),
}

impl Source {
    /// Bare (optionally dotted) identifiers are tables; anything else is a query.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim().trim_end_matches(';').trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("empty table name or query".into()));
        }
        if is_identifier_path(trimmed) {
            Ok(Source::Table(trimmed.to_string()))
        } else {
            Ok(Source::Query(trimmed.to_string()))
        }
    }

    pub fn table(name: &str) -> Self {
        Source::Table(name.to_string())
    }

    /// Relation text usable after `FROM`. A query is closed on its own line
    /// so a trailing `--` comment cannot swallow the parenthesis.
    pub fn relation(&self) -> String {
        match self {
            Source::Table(name) => name
                .split('.')
                .map(quote_ident)
                .collect::<Vec<_>>()
                .join("."),
            Source::Query(q) => format!("({q}\n)"),
        }
    }

    /// Runnable query text: the query itself, or a full scan of the table.
    pub fn to_query(&self) -> String {
        match self {
            Source::Table(_) => format!("SELECT * FROM {}", self.relation()),
            Source::Query(q) => q.clone(),
        }
    }

    /// `SELECT * FROM <source> [WHERE <date predicate>]`.
    pub fn select_all(&self, range: Option<&DateRange>, date_column: &str) -> String {
        let mut sql = format!("SELECT * FROM {} AS src", self.relation());
        if let Some(r) = range {
            sql.push_str(" WHERE ");
            sql.push_str(&r.predicate(date_column));
        }
        sql
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Table(t) => f.write_str(t),
            Source::Query(q) => f.write_str(q),
        }
    }
}

fn is_identifier_path(s: &str) -> bool {
    s.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Inclusive calendar-day range applied to the configured date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let day = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| Error::InvalidArgument(format!("invalid date '{s}': {e}")))
        };
        Self::new(day(start)?, day(end)?)
    }

    pub fn predicate(&self, column: &str) -> String {
        format!(
            "CAST({} AS DATE) BETWEEN DATE '{}' AND DATE '{}'",
            quote_ident(column),
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_tables_everything_else_is_a_query() {
        assert_eq!(Source::parse("splits").unwrap(), Source::table("splits"));
        assert_eq!(
            Source::parse(" main.splits ; ").unwrap(),
            Source::table("main.splits")
        );
        assert!(matches!(
            Source::parse("SELECT * FROM splits WHERE session_id=42;").unwrap(),
            Source::Query(q) if q == "SELECT * FROM splits WHERE session_id=42"
        ));
        assert!(Source::parse("   ").is_err());
    }

    #[test]
    fn trailing_line_comment_stays_inside_the_subquery() {
        let source = Source::parse("SELECT * FROM splits -- every split").unwrap();
        let sql = source.select_all(None, "ts");
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM splits -- every split\n) AS src");
    }

    #[test]
    fn relation_quotes_tables_and_wraps_queries() {
        assert_eq!(Source::table("main.splits").relation(), "\"main\".\"splits\"");
        assert_eq!(
            Source::Query("SELECT 1".into()).relation(),
            "(SELECT 1\n)"
        );
        assert_eq!(Source::table("splits").to_query(), "SELECT * FROM \"splits\"");
        assert_eq!(Source::Query("SELECT 1".into()).to_query(), "SELECT 1");
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn date_ranges_validate_and_render() {
        let r = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        assert_eq!(
            r.predicate("ts"),
            "CAST(\"ts\" AS DATE) BETWEEN DATE '2024-03-01' AND DATE '2024-03-31'"
        );
        assert!(DateRange::parse("2024-04-01", "2024-03-01").is_err());
        assert!(DateRange::parse("March 1", "2024-03-01").is_err());

        let sql = Source::table("splits").select_all(Some(&r), "ts");
        assert!(sql.starts_with("SELECT * FROM \"splits\" AS src WHERE CAST(\"ts\""));
    }
}
