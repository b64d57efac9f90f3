//! Logical schema types. Pure data; no Arrow or engine dependency here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Decimal,
    Utf8,
    Binary,
    Date,
    Timestamp,
    /// Anything the summary engines treat as opaque (lists, structs, ...).
    Other(String),
}

impl DataType {
    /// Map an engine type name (`BIGINT`, `DECIMAL(9,2)`, `TIMESTAMP WITH TIME ZONE`).
    pub fn from_sql(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" | "UHUGEINT" => DataType::Int64,
            "FLOAT" | "REAL" | "DOUBLE" => DataType::Float64,
            "DECIMAL" | "NUMERIC" => DataType::Decimal,
            "VARCHAR" | "TEXT" | "STRING" | "UUID" => DataType::Utf8,
            "BLOB" | "BYTEA" => DataType::Binary,
            "DATE" => DataType::Date,
            b if b.starts_with("TIMESTAMP") => DataType::Timestamp,
            _ => DataType::Other(upper),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64 | DataType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Timestamp)
    }

    /// Types whose min/max are meaningful.
    pub fn is_orderable(&self) -> bool {
        self.is_numeric() || self.is_temporal() || matches!(self, DataType::Utf8 | DataType::Boolean)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
