//! Parquet export reader built on `parquet::arrow`.
//!
//! The row count comes from the file footer, so oversized exports are refused
//! without decoding a single page.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::datatypes::{
    DataType as ArrowType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use ctxbound_core::types::{Column, Scalar, Table};
use ctxbound_core::Result;

use super::{check_cap, ExportReader};
use crate::storage::not_found_or_io;
use crate::{arrow_error, parquet_error};

const BATCH_ROWS: usize = 8 * 1024;

pub struct ParquetExportReader {
    builder: ParquetRecordBatchReaderBuilder<File>,
}

impl ParquetExportReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| not_found_or_io(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_error)?;
        Ok(Self { builder })
    }

    fn footer_rows(&self) -> u64 {
        self.builder.metadata().file_metadata().num_rows().max(0) as u64
    }
}

impl ExportReader for ParquetExportReader {
    fn num_rows(&mut self) -> Result<u64> {
        Ok(self.footer_rows())
    }

    fn column_names(&self) -> Vec<String> {
        self.builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    fn read_all(self: Box<Self>, max_rows: usize) -> Result<Table> {
        let this = *self;
        check_cap(this.footer_rows(), max_rows)?;

        let mut table = Table::with_columns(&this.column_names());
        let reader = this
            .builder
            .with_batch_size(BATCH_ROWS)
            .build()
            .map_err(parquet_error)?;
        for batch in reader {
            let batch = batch.map_err(arrow_error)?;
            table.extend(batch_to_table(&batch)?)?;
        }
        Ok(table)
    }
}

/// Convert one Arrow batch to the core table model.
pub fn batch_to_table(batch: &RecordBatch) -> Result<Table> {
    let schema = batch.schema();
    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| Ok(Column::new(field.name().clone(), array_to_scalars(array)?)))
        .collect::<Result<Vec<_>>>()?;
    Table::new(columns)
}

macro_rules! primitive {
    ($array:expr, $ty:ty, $variant:ident, $as:ty) => {{
        let a = $array.as_primitive::<$ty>();
        (0..a.len())
            .map(|i| {
                if a.is_null(i) {
                    Scalar::Null
                } else {
                    Scalar::$variant(a.value(i) as $as)
                }
            })
            .collect()
    }};
}

fn array_to_scalars(array: &ArrayRef) -> Result<Vec<Scalar>> {
    let values = match array.data_type() {
        ArrowType::Null => vec![Scalar::Null; array.len()],
        ArrowType::Boolean => {
            let a = array.as_boolean();
            (0..a.len())
                .map(|i| {
                    if a.is_null(i) {
                        Scalar::Null
                    } else {
                        Scalar::Bool(a.value(i))
                    }
                })
                .collect()
        }
        ArrowType::Int8 => primitive!(array, Int8Type, I64, i64),
        ArrowType::Int16 => primitive!(array, Int16Type, I64, i64),
        ArrowType::Int32 => primitive!(array, Int32Type, I64, i64),
        ArrowType::Int64 => primitive!(array, Int64Type, I64, i64),
        ArrowType::UInt8 => primitive!(array, UInt8Type, I64, i64),
        ArrowType::UInt16 => primitive!(array, UInt16Type, I64, i64),
        ArrowType::UInt32 => primitive!(array, UInt32Type, I64, i64),
        // u64 above i64::MAX is rare in telemetry; keep precision as f64.
        ArrowType::UInt64 => primitive!(array, UInt64Type, F64, f64),
        ArrowType::Float32 => primitive!(array, Float32Type, F64, f64),
        ArrowType::Float64 => primitive!(array, Float64Type, F64, f64),
        ArrowType::Utf8 => strings(array.as_string::<i32>()),
        ArrowType::LargeUtf8 => strings(array.as_string::<i64>()),
        ArrowType::Binary => {
            let a = array.as_binary::<i32>();
            (0..a.len())
                .map(|i| {
                    if a.is_null(i) {
                        Scalar::Null
                    } else {
                        Scalar::Bin(a.value(i).to_vec())
                    }
                })
                .collect()
        }
        ArrowType::Decimal128(_, _) => {
            let cast = arrow::compute::cast(array, &ArrowType::Float64).map_err(arrow_error)?;
            primitive!(cast, Float64Type, F64, f64)
        }
        // Dates, timestamps, nested types: render through Arrow's display cast.
        _ => {
            let cast = arrow::compute::cast(array, &ArrowType::Utf8).map_err(arrow_error)?;
            strings(cast.as_string::<i32>())
        }
    };
    Ok(values)
}

fn strings<O: arrow::array::OffsetSizeTrait>(a: &arrow::array::GenericStringArray<O>) -> Vec<Scalar> {
    (0..a.len())
        .map(|i| {
            if a.is_null(i) {
                Scalar::Null
            } else {
                Scalar::Str(a.value(i).to_string())
            }
        })
        .collect()
}
