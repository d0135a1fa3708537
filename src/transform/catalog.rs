//! Catalog dimension extraction: songs and artists.
//!
//! Pure projections over raw catalog batches. No filtering: every catalog
//! row appears in exactly one songs row and exactly one artists row, field
//! values preserved verbatim (renames aside). The catalog guarantees
//! song_id uniqueness, so no deduplication is applied.

use arrow::array::RecordBatch;

use super::project;
use crate::error::TransformError;
use crate::schema;

/// Project a raw catalog batch into the songs dimension.
pub fn songs_table(catalog: &RecordBatch) -> Result<RecordBatch, TransformError> {
    project(
        catalog,
        &schema::songs(),
        &["song_id", "title", "artist_id", "year", "duration"],
    )
}

/// Project a raw catalog batch into the artists dimension.
///
/// Renames artist_name→name, artist_location→location,
/// artist_latitude→latitude, artist_longitude→longitude.
pub fn artists_table(catalog: &RecordBatch) -> Result<RecordBatch, TransformError> {
    project(
        catalog,
        &schema::artists(),
        &[
            "artist_id",
            "artist_name",
            "artist_location",
            "artist_latitude",
            "artist_longitude",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionFormat;
    use crate::source::{NdjsonReader, NdjsonReaderConfig};
    use crate::transform::{float64_col, string_col};
    use bytes::Bytes;

    fn catalog_batch() -> RecordBatch {
        let data = concat!(
            r#"{"song_id":"SOBOO1","title":"Boo","artist_id":"AR1","artist_name":"Crazy Frog","artist_location":"Sweden","artist_latitude":59.33,"artist_longitude":18.06,"year":2005,"duration":168.2}"#,
            "\n",
            r#"{"song_id":"SONOPE1","title":"Nope","artist_id":"AR2","artist_name":"Nobody","artist_location":null,"artist_latitude":null,"artist_longitude":null,"year":0,"duration":12.0}"#,
            "\n",
        );
        let reader = NdjsonReader::new(
            crate::schema::raw_songs(),
            NdjsonReaderConfig::new(1024, CompressionFormat::None),
        );
        let mut result = reader
            .read(Bytes::from_static(data.as_bytes()), "catalog.json")
            .unwrap();
        result.batches.remove(0)
    }

    #[test]
    fn test_songs_projection_preserves_values() {
        let songs = songs_table(&catalog_batch()).unwrap();
        assert_eq!(songs.num_rows(), 2);
        assert_eq!(songs.schema(), crate::schema::songs());
        assert_eq!(string_col(&songs, "song_id").unwrap().value(0), "SOBOO1");
        assert_eq!(string_col(&songs, "title").unwrap().value(0), "Boo");
        assert_eq!(float64_col(&songs, "duration").unwrap().value(0), 168.2);
    }

    #[test]
    fn test_artists_projection_renames() {
        use arrow::array::Array;

        let artists = artists_table(&catalog_batch()).unwrap();
        assert_eq!(artists.num_rows(), 2);
        assert_eq!(artists.schema(), crate::schema::artists());
        assert_eq!(string_col(&artists, "name").unwrap().value(0), "Crazy Frog");
        assert_eq!(string_col(&artists, "location").unwrap().value(0), "Sweden");
        // Null source values stay null through the rename
        assert!(string_col(&artists, "location").unwrap().is_null(1));
        assert!(float64_col(&artists, "latitude").unwrap().is_null(1));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let batch = catalog_batch();
        let sliced = batch.project(&[0, 1]).unwrap();
        assert!(matches!(
            songs_table(&sliced),
            Err(TransformError::MissingColumn { .. })
        ));
    }
}
