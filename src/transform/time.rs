//! Time dimension derivation.
//!
//! Epoch-millisecond → calendar derivation is a pure scalar function:
//! milliseconds are truncated to whole seconds, interpreted as UTC, and
//! formatted as "%Y-%m-%d %H:%M:%S". Year, month, week-of-year, day and
//! hour are scalar projections of the same instant. No rounding beyond
//! integer truncation.

use arrow::array::{Array, Int32Builder, RecordBatch, StringBuilder};
use chrono::{DateTime, Datelike, Timelike, Utc};
use snafu::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use super::int64_col;
use crate::error::{MissingTimestampSnafu, TimestampRangeSnafu, TransformError};
use crate::schema;

/// Calendar parts derived from one epoch-millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParts {
    pub start_time: String,
    pub year: i32,
    pub month: i32,
    pub week_of_year: i32,
    pub day_of_month: i32,
    pub hour: i32,
}

/// Derive calendar parts from an epoch-millisecond timestamp.
pub fn time_parts(ts_millis: i64) -> Result<TimeParts, TransformError> {
    let secs = ts_millis / 1000;
    let dt: DateTime<Utc> =
        DateTime::from_timestamp(secs, 0).context(TimestampRangeSnafu { ts: ts_millis })?;

    Ok(TimeParts {
        start_time: dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        year: dt.year(),
        month: dt.month() as i32,
        week_of_year: dt.iso_week().week() as i32,
        day_of_month: dt.day() as i32,
        hour: dt.hour() as i32,
    })
}

/// Build the time dimension from filtered play events.
///
/// One row per distinct start_time; duplicate timestamps across events
/// collapse to a single row.
pub fn time_table(plays: &RecordBatch) -> Result<RecordBatch, TransformError> {
    let ts = int64_col(plays, "ts")?;

    let mut seen: HashSet<i64> = HashSet::new();
    let mut start_time = StringBuilder::new();
    let mut year = Int32Builder::new();
    let mut month = Int32Builder::new();
    let mut week_of_year = Int32Builder::new();
    let mut day_of_month = Int32Builder::new();
    let mut hour = Int32Builder::new();

    for row in 0..plays.num_rows() {
        ensure!(!ts.is_null(row), MissingTimestampSnafu { row });
        let millis = ts.value(row);

        // Dedup on truncated seconds, the grain of start_time
        if !seen.insert(millis / 1000) {
            continue;
        }

        let parts = time_parts(millis)?;
        start_time.append_value(parts.start_time);
        year.append_value(parts.year);
        month.append_value(parts.month);
        week_of_year.append_value(parts.week_of_year);
        day_of_month.append_value(parts.day_of_month);
        hour.append_value(parts.hour);
    }

    Ok(RecordBatch::try_new(
        schema::time(),
        vec![
            Arc::new(start_time.finish()),
            Arc::new(year.finish()),
            Arc::new(month.finish()),
            Arc::new(week_of_year.finish()),
            Arc::new(day_of_month.finish()),
            Arc::new(hour.finish()),
        ],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn ts_batch(values: Vec<Option<i64>>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("ts", DataType::Int64, true)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[test]
    fn test_reference_timestamp() {
        // 1541121934796 ms => 2018-11-02 01:25:34 UTC
        let parts = time_parts(1541121934796).unwrap();
        assert_eq!(parts.start_time, "2018-11-02 01:25:34");
        assert_eq!(parts.year, 2018);
        assert_eq!(parts.month, 11);
        assert_eq!(parts.week_of_year, 44);
        assert_eq!(parts.day_of_month, 2);
        assert_eq!(parts.hour, 1);
    }

    #[test]
    fn test_truncation_not_rounding() {
        // 999 ms of sub-second offset must truncate, not round up
        let a = time_parts(1541121934000).unwrap();
        let b = time_parts(1541121934999).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = time_parts(1541121934796).unwrap();
        let b = time_parts(1541121934796).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_time_table_dedups_start_time() {
        let batch = ts_batch(vec![
            Some(1541121934796),
            Some(1541121934100), // same second after truncation
            Some(1541121935000),
        ]);
        let table = time_table(&batch).unwrap();
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_time_table_rejects_null_ts() {
        let batch = ts_batch(vec![Some(1541121934796), None]);
        assert!(matches!(
            time_table(&batch),
            Err(TransformError::MissingTimestamp { row: 1 })
        ));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert!(matches!(
            time_parts(i64::MAX),
            Err(TransformError::TimestampRange { .. })
        ));
    }
}
