//! Static Arrow schemas for the raw inputs and the warehouse tables.
//!
//! The warehouse shape is fixed by the domain, so schemas are declared here
//! rather than configured. Raw schemas list only the fields the pipeline
//! consumes; the NDJSON decoder ignores everything else.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

/// Schema for raw song-catalog records (`song_data/*/*/*/*.json`).
pub fn raw_songs() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("year", DataType::Int32, true),
        Field::new("duration", DataType::Float64, true),
    ]))
}

/// Schema for raw session-log events (`log_data/*/*/*.json`).
pub fn raw_events() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ]))
}

/// Songs dimension, partitioned by (artist_id, year).
pub fn songs() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("year", DataType::Int32, true),
        Field::new("duration", DataType::Float64, true),
    ]))
}

/// Artists dimension, unpartitioned.
pub fn artists() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]))
}

/// Users dimension, deduplicated by the full row tuple.
pub fn users() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, true),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ]))
}

/// Time dimension, deduplicated by start_time, partitioned by (year, month).
pub fn time() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("start_time", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("week_of_year", DataType::Int32, false),
        Field::new("day_of_month", DataType::Int32, false),
        Field::new("hour", DataType::Int32, false),
    ]))
}

/// Songplays fact table, partitioned by (year, month).
///
/// song_id/artist_id are null when a play event has no exact
/// (title, artist name) match in the catalog.
pub fn songplays() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("songplay_id", DataType::Int64, false),
        Field::new("start_time", DataType::Utf8, false),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_songs_field_order_matches_projection() {
        let schema = songs();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ["song_id", "title", "artist_id", "year", "duration"]);
    }

    #[test]
    fn test_time_field_names() {
        let schema = time();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            ["start_time", "year", "month", "week_of_year", "day_of_month", "hour"]
        );
    }

    #[test]
    fn test_fact_join_keys_are_nullable() {
        let schema = songplays();
        assert!(schema.field_with_name("song_id").unwrap().is_nullable());
        assert!(schema.field_with_name("artist_id").unwrap().is_nullable());
        assert!(!schema.field_with_name("songplay_id").unwrap().is_nullable());
    }
}
