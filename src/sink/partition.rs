//! Partition grouping for Hive-style table layouts.
//!
//! Splits record batches into groups by the rendered values of the partition
//! key columns, in the key order given. Grouping is deterministic (BTreeMap
//! ordering), so identical input always yields the same partition layout.

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::DataType;
use snafu::prelude::*;
use std::collections::BTreeMap;

use crate::error::{ColumnTypeSnafu, MissingColumnSnafu, TransformError};

/// Directory name used for null partition values.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// One partition of a table: ordered key/value pairs and the rows in it.
#[derive(Debug)]
pub struct PartitionGroup {
    /// Partition values in key order, e.g. [("year", "2018"), ("month", "11")].
    pub values: Vec<(String, String)>,
    /// The rows belonging to this partition.
    pub batches: Vec<RecordBatch>,
}

impl PartitionGroup {
    /// Hive-style directory prefix, e.g. "year=2018/month=11".
    pub fn path_prefix(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Total row count across batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Render one cell of a partition key column as a directory value.
fn render_cell(array: &ArrayRef, row: usize) -> Result<String, TransformError> {
    if array.is_null(row) {
        return Ok(HIVE_DEFAULT_PARTITION.to_string());
    }

    let rendered = match array.data_type() {
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::Int32 => array
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Int64 => array
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float64 => array
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row).to_string()),
        _ => None,
    };

    rendered.context(ColumnTypeSnafu {
        name: "partition key",
        expected: "Utf8 | Int32 | Int64 | Float64",
    })
}

/// Split batches into partition groups by the given key columns.
///
/// Keys are rendered in order; rows with null keys land in the
/// `__HIVE_DEFAULT_PARTITION__` directory for that key. An empty key list
/// yields a single group with no partition prefix.
pub fn split_by_partitions(
    batches: &[RecordBatch],
    keys: &[&str],
) -> Result<Vec<PartitionGroup>, TransformError> {
    if keys.is_empty() {
        return Ok(vec![PartitionGroup {
            values: Vec::new(),
            batches: batches.to_vec(),
        }]);
    }

    let mut groups: BTreeMap<Vec<String>, Vec<RecordBatch>> = BTreeMap::new();

    for batch in batches {
        if batch.num_rows() == 0 {
            continue;
        }

        let key_arrays: Vec<&ArrayRef> = keys
            .iter()
            .map(|name| {
                batch
                    .column_by_name(name)
                    .context(MissingColumnSnafu { name: *name })
            })
            .collect::<Result<_, _>>()?;

        // Rendered key tuple per row
        let mut row_keys = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let key = key_arrays
                .iter()
                .map(|a| render_cell(a, row))
                .collect::<Result<Vec<_>, _>>()?;
            row_keys.push(key);
        }

        let mut distinct: BTreeMap<&Vec<String>, ()> = BTreeMap::new();
        for key in &row_keys {
            distinct.insert(key, ());
        }

        for (key, _) in distinct {
            let mask =
                BooleanArray::from_iter(row_keys.iter().map(|k| Some(k == key)));
            let filtered = filter_record_batch(batch, &mask)?;
            groups.entry(key.clone()).or_default().push(filtered);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, batches)| PartitionGroup {
            values: keys
                .iter()
                .map(|k| k.to_string())
                .zip(key)
                .collect(),
            batches,
        })
        .collect())
}
