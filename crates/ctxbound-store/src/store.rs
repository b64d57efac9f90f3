//! DuckDB-backed store.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate};
use duckdb::types::Value;
use duckdb::Connection;

use ctxbound_core::schema::{DataType, Field, Schema};
use ctxbound_core::types::{Column, Scalar, Table};
use ctxbound_core::{Error, Result};

use crate::sql::{quote_literal, Source};

/// Upper bound on columns read back by `describe`.
const MAX_DESCRIBE_COLUMNS: usize = 4_096;

/// Classify an engine failure. Parser, catalog and binder errors are the
/// caller's query; everything else is the engine.
pub fn engine_error(e: duckdb::Error) -> Error {
    let msg = e.to_string();
    let caller_fault = ["Parser Error", "Catalog Error", "Binder Error", "syntax error"]
        .iter()
        .any(|m| msg.contains(m));
    if caller_fault {
        Error::QuerySyntax(msg)
    } else if msg.contains("IO Error") {
        Error::StorageIo(msg)
    } else {
        Error::Engine(msg)
    }
}

pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(engine_error)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(engine_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A fresh connection to the same database. Connections are not shared
    /// across threads; each call clones its own.
    fn connection(&self) -> Result<Connection> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| Error::Engine("store connection lock poisoned".into()))?;
        guard.try_clone().map_err(engine_error)
    }

    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection()?.execute_batch(sql).map_err(engine_error)
    }

    /// Execute one statement, returning the engine's changed-row count.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.connection()?.execute(sql, []).map_err(engine_error)
    }

    /// Row count of an arbitrary query, computed inside the engine.
    pub fn count(&self, query: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM ({query}\n) AS q");
        let n: i64 = self
            .connection()?
            .query_row(&sql, [], |row| row.get(0))
            .map_err(engine_error)?;
        Ok(n.max(0) as u64)
    }

    /// Run `sql` and collect at most `max_rows` rows.
    ///
    /// Fails with `SizeExceeded` (reporting the true count) rather than
    /// truncating when the result is larger.
    pub fn query_table(&self, sql: &str, max_rows: usize) -> Result<Table> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(engine_error)?;
        let mut rows = stmt.query([]).map_err(engine_error)?;
        let names: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut table = Table::with_columns(&names);
        let mut overflow = false;
        while let Some(row) = rows.next().map_err(engine_error)? {
            if table.num_rows() == max_rows {
                overflow = true;
                break;
            }
            let values = (0..names.len())
                .map(|i| row.get::<_, Value>(i).map(scalar_from_value))
                .collect::<duckdb::Result<Vec<_>>>()
                .map_err(engine_error)?;
            table.push_row(values)?;
        }
        drop(rows);

        if overflow {
            let actual = self.count(sql)?;
            return Err(Error::too_many_rows(actual, max_rows as u64));
        }
        Ok(table)
    }

    /// Column names and types of a table, view or query.
    pub fn describe(&self, source: &Source) -> Result<Schema> {
        let sql = format!("DESCRIBE SELECT * FROM {} AS src", source.relation());
        let table = self.query_table(&sql, MAX_DESCRIBE_COLUMNS)?;
        let names = table
            .column("column_name")
            .ok_or_else(|| Error::Engine("DESCRIBE returned no column_name".into()))?;
        let types = table
            .column("column_type")
            .ok_or_else(|| Error::Engine("DESCRIBE returned no column_type".into()))?;
        let nulls = table.column("null");

        let fields = names
            .values
            .iter()
            .zip(&types.values)
            .enumerate()
            .map(|(i, (name, ty))| {
                let nullable = nulls
                    .map(|c| !matches!(&c.values[i], Scalar::Str(s) if s == "NO"))
                    .unwrap_or(true);
                Field::new(name.to_string(), DataType::from_sql(&ty.to_string()), nullable)
            })
            .collect();
        Ok(Schema::new(fields))
    }

    /// Tables and views in the main schema, sorted.
    pub fn relation_names(&self) -> Result<Vec<String>> {
        let table = self.query_table(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name",
            usize::MAX,
        )?;
        Ok(table
            .column("table_name")
            .map(|c| c.values.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default())
    }

    pub fn relation_exists(&self, name: &str) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND lower(table_name) = lower({})",
            quote_literal(name)
        );
        let n: i64 = self
            .connection()?
            .query_row(&sql, [], |row| row.get(0))
            .map_err(engine_error)?;
        Ok(n > 0)
    }

    /// `COPY (query) TO path (options)`.
    pub fn copy_to(&self, query: &str, path: &Path, options: &str) -> Result<()> {
        let target = path
            .to_str()
            .ok_or_else(|| Error::InvalidArgument(format!("non-UTF-8 path {}", path.display())))?;
        let sql = format!("COPY ({query}\n) TO {} ({options})", quote_literal(target));
        self.execute(&sql).map(|_| ())
    }
}

fn scalar_from_value(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Boolean(b) => Scalar::Bool(b),
        Value::TinyInt(i) => Scalar::I64(i as i64),
        Value::SmallInt(i) => Scalar::I64(i as i64),
        Value::Int(i) => Scalar::I64(i as i64),
        Value::BigInt(i) => Scalar::I64(i),
        Value::HugeInt(i) => i64::try_from(i)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(i as f64)),
        Value::UTinyInt(i) => Scalar::I64(i as i64),
        Value::USmallInt(i) => Scalar::I64(i as i64),
        Value::UInt(i) => Scalar::I64(i as i64),
        Value::UBigInt(i) => i64::try_from(i)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(i as f64)),
        Value::Float(f) => Scalar::F64(f as f64),
        Value::Double(f) => Scalar::F64(f),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Scalar::F64)
            .unwrap_or_else(|_| Scalar::Str(d.to_string())),
        Value::Text(s) => Scalar::Str(s),
        Value::Enum(s) => Scalar::Str(s),
        Value::Blob(b) => Scalar::Bin(b),
        Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|d| Scalar::Str(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Scalar::Null),
        Value::Timestamp(unit, v) => DateTime::from_timestamp_micros(unit.to_micros(v))
            .map(|t| Scalar::Str(t.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Scalar::Null),
        other => Scalar::Str(format!("{other:?}")),
    }
}
