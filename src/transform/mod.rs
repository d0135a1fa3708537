//! Derivation of dimension and fact tables from raw record batches.
//!
//! All transforms are pure functions over immutable RecordBatches: column
//! projections, a literal page filter, full-tuple deduplication, scalar
//! timestamp derivation and the catalog hash join. No transform performs I/O.

pub mod catalog;
pub mod events;
pub mod plays;
pub mod time;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::SchemaRef;
use snafu::prelude::*;

use crate::error::{ColumnTypeSnafu, MissingColumnSnafu, TransformError};

/// Look up a column by name.
fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, TransformError> {
    batch.column_by_name(name).context(MissingColumnSnafu { name })
}

/// Look up a Utf8 column by name.
pub(crate) fn string_col<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, TransformError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .context(ColumnTypeSnafu {
            name,
            expected: "Utf8",
        })
}

/// Look up an Int64 column by name.
pub(crate) fn int64_col<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Int64Array, TransformError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Int64Array>()
        .context(ColumnTypeSnafu {
            name,
            expected: "Int64",
        })
}

/// Look up an Int32 column by name.
#[allow(dead_code)]
pub(crate) fn int32_col<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Int32Array, TransformError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Int32Array>()
        .context(ColumnTypeSnafu {
            name,
            expected: "Int32",
        })
}

/// Look up a Float64 column by name.
#[allow(dead_code)]
pub(crate) fn float64_col<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Float64Array, TransformError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .context(ColumnTypeSnafu {
            name,
            expected: "Float64",
        })
}

/// Project source columns (in order) into a batch with the target schema.
///
/// Renames are positional: `source_columns[i]` becomes the i-th field of
/// `target`. Arrays are shared, not copied.
pub(crate) fn project(
    batch: &RecordBatch,
    target: &SchemaRef,
    source_columns: &[&str],
) -> Result<RecordBatch, TransformError> {
    let arrays: Vec<ArrayRef> = source_columns
        .iter()
        .map(|name| column(batch, name).cloned())
        .collect::<Result<_, _>>()?;

    Ok(RecordBatch::try_new(target.clone(), arrays)?)
}

/// Concatenate batches into one batch with the given schema.
pub(crate) fn concat(
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> Result<RecordBatch, TransformError> {
    Ok(arrow::compute::concat_batches(schema, batches)?)
}

/// Read an optional string cell as an owned value.
fn opt_string(array: &StringArray, row: usize) -> Option<String> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row).to_string())
    }
}
