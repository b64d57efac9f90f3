//! Per-column profile of a table, view or query.
//!
//! One `DESCRIBE` to learn the columns, then one aggregate query for every
//! statistic. Numeric min/max/mean come back as `DOUBLE`; other orderable
//! columns report min/max as text and no mean.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ctxbound_core::schema::{DataType, Field};
use ctxbound_core::types::{Scalar, Table};
use ctxbound_core::{Error, Result};
use ctxbound_store::{quote_ident, DateRange, Source, Store};

use crate::SummaryOptions;

/// First and last calendar day observed in the date column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    #[serde(rename = "type")]
    pub data_type: String,
    pub min: Scalar,
    pub max: Scalar,
    /// Numeric columns only.
    pub mean: Option<f64>,
    /// Fraction of rows where the column is null; 0.0 for an empty source.
    pub null_rate: f64,
    pub distinct_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResult {
    pub row_count: u64,
    pub date_range: Option<ObservedRange>,
    pub columns: BTreeMap<String, ColumnProfile>,
}

/// Profile `source`, optionally restricted to `range` on the date column.
pub fn profile(
    store: &Store,
    source: &Source,
    range: Option<&DateRange>,
    opts: &SummaryOptions,
) -> Result<ProfileResult> {
    let schema = store.describe(source)?;
    let date_field = schema
        .field_named(&opts.date_column)
        .filter(|f| f.data_type.is_temporal() || f.data_type == DataType::Utf8);
    if range.is_some() && date_field.is_none() {
        return Err(Error::InvalidArgument(format!(
            "date range given but '{}' has no date column '{}'",
            source, opts.date_column
        )));
    }

    let mut select = vec!["COUNT(*) AS row_count".to_string()];
    for (i, field) in schema.fields.iter().enumerate() {
        select.extend(column_aggregates(i, field));
    }
    if let Some(field) = date_field {
        let d = format!("TRY_CAST({} AS DATE)", quote_ident(&field.name));
        select.push(format!("CAST(MIN({d}) AS VARCHAR) AS date_start"));
        select.push(format!("CAST(MAX({d}) AS VARCHAR) AS date_end"));
    }

    let sql = format!(
        "SELECT {} FROM ({}) AS f",
        select.join(", "),
        source.select_all(range, &opts.date_column)
    );
    tracing::debug!(source = %source, columns = schema.fields.len(), "profile");
    let row = store.query_table(&sql, 1)?;

    let row_count = int_at(&row, "row_count");
    let mut columns = BTreeMap::new();
    for (i, field) in schema.fields.iter().enumerate() {
        let non_null = int_at(&row, &alias(i, "nn"));
        let null_rate = if row_count == 0 {
            0.0
        } else {
            1.0 - non_null as f64 / row_count as f64
        };
        columns.insert(
            field.name.clone(),
            ColumnProfile {
                data_type: type_label(&field.data_type),
                min: value_at(&row, &alias(i, "min")),
                max: value_at(&row, &alias(i, "max")),
                mean: value_at(&row, &alias(i, "mean")).as_f64(),
                null_rate,
                distinct_count: int_at(&row, &alias(i, "nd")),
            },
        );
    }

    let date_range = match (value_at(&row, "date_start"), value_at(&row, "date_end")) {
        (Scalar::Str(start), Scalar::Str(end)) => Some(ObservedRange { start, end }),
        _ => None,
    };

    Ok(ProfileResult {
        row_count,
        date_range,
        columns,
    })
}

fn alias(i: usize, stat: &str) -> String {
    format!("c{i}_{stat}")
}

fn column_aggregates(i: usize, field: &Field) -> Vec<String> {
    let q = quote_ident(&field.name);
    let null_double = "CAST(NULL AS DOUBLE)";
    let (min, max, mean) = if field.data_type.is_numeric() {
        (
            format!("CAST(MIN({q}) AS DOUBLE)"),
            format!("CAST(MAX({q}) AS DOUBLE)"),
            format!("AVG(CAST({q} AS DOUBLE))"),
        )
    } else if field.data_type.is_orderable() {
        (
            format!("CAST(MIN({q}) AS VARCHAR)"),
            format!("CAST(MAX({q}) AS VARCHAR)"),
            null_double.to_string(),
        )
    } else {
        (
            "CAST(NULL AS VARCHAR)".to_string(),
            "CAST(NULL AS VARCHAR)".to_string(),
            null_double.to_string(),
        )
    };
    let distinct = match field.data_type {
        DataType::Other(_) => "CAST(0 AS BIGINT)".to_string(),
        _ => format!("COUNT(DISTINCT {q})"),
    };
    vec![
        format!("COUNT({q}) AS {}", alias(i, "nn")),
        format!("{distinct} AS {}", alias(i, "nd")),
        format!("{min} AS {}", alias(i, "min")),
        format!("{max} AS {}", alias(i, "max")),
        format!("{mean} AS {}", alias(i, "mean")),
    ]
}

fn type_label(dt: &DataType) -> String {
    match dt {
        DataType::Boolean => "boolean".into(),
        DataType::Int64 => "integer".into(),
        DataType::Float64 | DataType::Decimal => "float".into(),
        DataType::Utf8 => "string".into(),
        DataType::Binary => "binary".into(),
        DataType::Date => "date".into(),
        DataType::Timestamp => "timestamp".into(),
        DataType::Other(name) => name.to_ascii_lowercase(),
    }
}

fn value_at(row: &Table, name: &str) -> Scalar {
    row.column(name)
        .and_then(|c| c.values.first().cloned())
        .unwrap_or(Scalar::Null)
}

fn int_at(row: &Table, name: &str) -> u64 {
    match value_at(row, name) {
        Scalar::I64(n) => n.max(0) as u64,
        Scalar::F64(f) if f >= 0.0 => f as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;
    use ctxbound_core::error::ErrorKind;

    #[test]
    fn profiles_every_column_inside_the_store() {
        let store = seeded_store();
        let p = profile(&store, &Source::table("splits"), None, &SummaryOptions::default()).unwrap();
        assert_eq!(p.row_count, 300);
        assert_eq!(p.columns.len(), 6);

        let pace = &p.columns["pace"];
        assert_eq!(pace.data_type, "float");
        assert_eq!(pace.null_rate, 0.0);
        assert_eq!(pace.min, Scalar::F64(4.0));
        assert!(pace.mean.is_some());

        let hr = &p.columns["hr"];
        assert!((hr.null_rate - 0.1).abs() < 1e-9);

        let sport = &p.columns["sport"];
        assert_eq!(sport.distinct_count, 2);
        assert_eq!(sport.min, Scalar::Str("ride".into()));
        assert_eq!(sport.mean, None);

        let range = p.date_range.unwrap();
        assert_eq!(range.start, "2024-03-01");
        assert_eq!(range.end, "2024-03-04");
    }

    #[test]
    fn date_range_and_query_sources() {
        let store = seeded_store();
        let range = DateRange::parse("2024-03-01", "2024-03-01").unwrap();
        let src = Source::parse("SELECT * FROM splits WHERE session_id = 0").unwrap();
        let p = profile(&store, &src, Some(&range), &SummaryOptions::default()).unwrap();
        // 72 splits fall on the first day; every third belongs to session 0.
        assert_eq!(p.row_count, 24);
        assert_eq!(p.columns["session_id"].distinct_count, 1);
    }

    #[test]
    fn empty_sources_have_zero_null_rate() {
        let store = seeded_store();
        let src = Source::parse("SELECT * FROM splits WHERE pace < 0").unwrap();
        let p = profile(&store, &src, None, &SummaryOptions::default()).unwrap();
        assert_eq!(p.row_count, 0);
        assert_eq!(p.columns["pace"].null_rate, 0.0);
        assert_eq!(p.columns["pace"].mean, None);
        assert!(p.date_range.is_none());
    }

    #[test]
    fn output_size_is_independent_of_row_count() {
        let store = seeded_store();
        store
            .execute_batch("CREATE TABLE big AS SELECT * FROM splits, range(50) r(k);")
            .unwrap();
        let opts = SummaryOptions::default();
        let small = serde_json::to_string(&profile(&store, &Source::table("splits"), None, &opts).unwrap()).unwrap();
        let big = serde_json::to_string(&profile(&store, &Source::table("big"), None, &opts).unwrap()).unwrap();
        // `big` has one extra column; allow for it but nothing proportional to rows.
        assert!(big.len() < small.len() + 300);
    }

    #[test]
    fn unknown_table_is_a_query_error() {
        let store = seeded_store();
        let err = profile(&store, &Source::table("laps"), None, &SummaryOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    }
}
