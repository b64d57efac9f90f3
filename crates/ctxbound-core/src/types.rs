//! Lightweight value/column model for small, already-bounded results.
//!
//! Loaders convert Arrow batches and engine rows into these so callers never
//! need Arrow or DuckDB types. Anything large stays on disk behind a handle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I64(i) => Some(*i as f64),
            Scalar::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Best-effort type inference for untyped text cells (CSV).
    pub fn infer(text: &str) -> Self {
        if text.is_empty() {
            return Scalar::Null;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Scalar::I64(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Scalar::F64(f);
        }
        match text {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Scalar::Str(text.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I64(i) => write!(f, "{i}"),
            Scalar::F64(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{}", (x * 1e6).round() / 1e6)
                }
            }
            Scalar::Str(s) => f.write_str(s),
            Scalar::Bin(b) => write!(f, "[binary {} bytes]", b.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column-major table. All columns have the same length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(Error::InvalidArgument(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    first.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Empty table with the given column names.
    pub fn with_columns(names: &[String]) -> Self {
        Self {
            columns: names.iter().map(|n| Column::new(n.clone(), Vec::new())).collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append one row; `row` must match the column count.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidArgument(format!(
                "row has {} values, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (col, v) in self.columns.iter_mut().zip(row) {
            col.values.push(v);
        }
        Ok(())
    }

    /// Append all rows of `other`; column names must match in order.
    pub fn extend(&mut self, other: Table) -> Result<()> {
        if self.column_names() != other.column_names() {
            return Err(Error::InvalidArgument("cannot append tables with different columns".into()));
        }
        for (col, more) in self.columns.iter_mut().zip(other.columns) {
            col.values.extend(more.values);
        }
        Ok(())
    }

    /// Projection onto `names`, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| {
                self.column(n)
                    .cloned()
                    .ok_or_else(|| Error::InvalidArgument(format!("unknown column '{n}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Table { columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::new("session_id", vec![Scalar::I64(1), Scalar::I64(2)]),
            Column::new("pace", vec![Scalar::F64(5.5), Scalar::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Table::new(vec![
            Column::new("a", vec![Scalar::I64(1)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("column 'b'"));
    }

    #[test]
    fn select_and_column_access() {
        let t = sample();
        assert_eq!(t.num_rows(), 2);
        let p = t.select(&["pace".to_string()]).unwrap();
        assert_eq!(p.column_names(), vec!["pace"]);
        assert!(t.select(&["hr".to_string()]).is_err());
        assert_eq!(t.column("pace").unwrap().values[1], Scalar::Null);
        assert!(t.column("hr").is_none());
    }

    #[test]
    fn push_and_extend() {
        let mut t = Table::with_columns(&["a".to_string(), "b".to_string()]);
        t.push_row(vec![Scalar::I64(1), Scalar::Str("x".into())]).unwrap();
        assert!(t.push_row(vec![Scalar::Null]).is_err());
        let other = t.clone();
        t.extend(other).unwrap();
        assert_eq!(t.num_rows(), 2);
    }

    #[test]
    fn infer_cells() {
        assert_eq!(Scalar::infer(""), Scalar::Null);
        assert_eq!(Scalar::infer("42"), Scalar::I64(42));
        assert_eq!(Scalar::infer("4.5"), Scalar::F64(4.5));
        assert_eq!(Scalar::infer("true"), Scalar::Bool(true));
        assert_eq!(Scalar::infer("run"), Scalar::Str("run".into()));
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Scalar::F64(3.0).to_string(), "3.0");
        assert_eq!(Scalar::F64(1.0 / 3.0).to_string(), "0.333333");
        assert_eq!(Scalar::Bin(vec![0; 4]).to_string(), "[binary 4 bytes]");
    }
}
