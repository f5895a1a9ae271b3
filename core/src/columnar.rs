//! Conversion of row-oriented data into Arrow record batches.
//!
//! Row types implement [`ToRecordBatch`] by naming their schema and building
//! one column per field with [`ToArrowArray`].

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tally_common::{CommonError, Result};

/// A scalar type with a matching Arrow array.
pub trait ToArrowArray: Sized {
    /// The Arrow type of the produced array.
    fn data_type() -> DataType;

    /// Builds an array from the values projected out of `rows`.
    fn to_array<R>(rows: &[R], project: impl Fn(&R) -> Self) -> ArrayRef;
}

impl ToArrowArray for i64 {
    fn data_type() -> DataType {
        DataType::Int64
    }

    fn to_array<R>(rows: &[R], project: impl Fn(&R) -> Self) -> ArrayRef {
        Arc::new(rows.iter().map(project).collect::<Int64Array>())
    }
}

impl ToArrowArray for u64 {
    fn data_type() -> DataType {
        DataType::UInt64
    }

    fn to_array<R>(rows: &[R], project: impl Fn(&R) -> Self) -> ArrayRef {
        Arc::new(rows.iter().map(project).collect::<UInt64Array>())
    }
}

impl ToArrowArray for f64 {
    fn data_type() -> DataType {
        DataType::Float64
    }

    fn to_array<R>(rows: &[R], project: impl Fn(&R) -> Self) -> ArrayRef {
        Arc::new(rows.iter().map(project).collect::<Float64Array>())
    }
}

impl ToArrowArray for String {
    fn data_type() -> DataType {
        DataType::Utf8
    }

    fn to_array<R>(rows: &[R], project: impl Fn(&R) -> Self) -> ArrayRef {
        Arc::new(rows.iter().map(project).map(Some).collect::<StringArray>())
    }
}

/// A row type that can be laid out as an Arrow record batch.
pub trait ToRecordBatch: Sized {
    /// The schema every batch built from this type has.
    fn schema() -> SchemaRef;

    /// The columns for `rows`, in schema order.
    fn columns(rows: &[Self]) -> Vec<ArrayRef>;

    /// Builds one batch holding all of `rows`. An empty slice gives an empty
    /// batch with the full schema.
    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        RecordBatch::try_new(Self::schema(), Self::columns(rows)).map_err(|e| {
            CommonError::serialization_error_with_source("failed to build record batch", e)
        })
    }
}
