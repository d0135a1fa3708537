//! Fact builder: the songplays table.
//!
//! Joins filtered play events against the persisted catalog dimensions via
//! exact (title, artist name) string equality. The join is strictly left
//! preserving: every play event produces exactly one fact row, with null
//! song_id/artist_id on a catalog miss. No fuzzy matching - differing
//! capitalization or feature-artist suffixes simply fail to match.

use arrow::array::{Array, Int32Builder, Int64Builder, RecordBatch, StringBuilder};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::time::time_parts;
use super::{int64_col, opt_string, string_col};
use crate::error::{MissingTimestampSnafu, TransformError};
use crate::schema;

/// Denormalized catalog view keyed by (title, artist name).
///
/// Built by left-joining songs to artists on artist_id. Songs whose artist
/// name is unresolvable can never satisfy the equality join (an event's
/// artist string never equals null), so they are not indexed. Duplicate
/// (title, name) keys keep the first entry, preserving one fact row per
/// event.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: HashMap<(String, String), (Option<String>, Option<String>)>,
}

impl CatalogIndex {
    /// Build the index from songs and artists dimension batches.
    pub fn build(
        songs: &[RecordBatch],
        artists: &[RecordBatch],
    ) -> Result<Self, TransformError> {
        // artist_id -> name lookup (right side of the songs-artists join)
        let mut artist_names: HashMap<String, String> = HashMap::new();
        for batch in artists {
            let ids = string_col(batch, "artist_id")?;
            let names = string_col(batch, "name")?;
            for row in 0..batch.num_rows() {
                if let (Some(id), Some(name)) = (opt_string(ids, row), opt_string(names, row)) {
                    artist_names.entry(id).or_insert(name);
                }
            }
        }

        let mut entries = HashMap::new();
        for batch in songs {
            let song_ids = string_col(batch, "song_id")?;
            let titles = string_col(batch, "title")?;
            let artist_ids = string_col(batch, "artist_id")?;
            for row in 0..batch.num_rows() {
                let Some(title) = opt_string(titles, row) else {
                    continue;
                };
                let artist_id = opt_string(artist_ids, row);
                let Some(name) = artist_id
                    .as_deref()
                    .and_then(|id| artist_names.get(id))
                    .cloned()
                else {
                    continue;
                };
                entries
                    .entry((title, name))
                    .or_insert((opt_string(song_ids, row), artist_id));
            }
        }

        Ok(Self { entries })
    }

    /// Number of joinable (title, name) keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no joinable keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, title: &str, name: &str) -> Option<&(Option<String>, Option<String>)> {
        self.entries.get(&(title.to_string(), name.to_string()))
    }
}

/// Build the songplays fact table from filtered play events.
///
/// `next_id` is a run-scoped counter: ids are strictly increasing and unique
/// within one pipeline run, with no cross-run stability promised.
pub fn songplays_table(
    plays: &RecordBatch,
    index: &CatalogIndex,
    next_id: &mut i64,
) -> Result<RecordBatch, TransformError> {
    let ts = int64_col(plays, "ts")?;
    let user_ids = string_col(plays, "userId")?;
    let levels = string_col(plays, "level")?;
    let songs = string_col(plays, "song")?;
    let artists = string_col(plays, "artist")?;
    let session_ids = int64_col(plays, "sessionId")?;
    let locations = string_col(plays, "location")?;
    let user_agents = string_col(plays, "userAgent")?;

    let mut songplay_id = Int64Builder::new();
    let mut start_time = StringBuilder::new();
    let mut user_id = StringBuilder::new();
    let mut level = StringBuilder::new();
    let mut song_id = StringBuilder::new();
    let mut artist_id = StringBuilder::new();
    let mut session_id = Int64Builder::new();
    let mut location = StringBuilder::new();
    let mut user_agent = StringBuilder::new();
    let mut year = Int32Builder::new();
    let mut month = Int32Builder::new();

    for row in 0..plays.num_rows() {
        ensure!(!ts.is_null(row), MissingTimestampSnafu { row });
        let parts = time_parts(ts.value(row))?;

        let matched = match (opt_string(songs, row), opt_string(artists, row)) {
            (Some(title), Some(name)) => index.lookup(&title, &name),
            _ => None,
        };

        songplay_id.append_value(*next_id);
        *next_id += 1;

        start_time.append_value(&parts.start_time);
        user_id.append_option(opt_string(user_ids, row));
        level.append_option(opt_string(levels, row));
        match matched {
            Some((sid, aid)) => {
                song_id.append_option(sid.as_deref());
                artist_id.append_option(aid.as_deref());
            }
            None => {
                song_id.append_null();
                artist_id.append_null();
            }
        }
        session_id.append_option(if session_ids.is_null(row) {
            None
        } else {
            Some(session_ids.value(row))
        });
        location.append_option(opt_string(locations, row));
        user_agent.append_option(opt_string(user_agents, row));
        year.append_value(parts.year);
        month.append_value(parts.month);
    }

    Ok(RecordBatch::try_new(
        schema::songplays(),
        vec![
            Arc::new(songplay_id.finish()),
            Arc::new(start_time.finish()),
            Arc::new(user_id.finish()),
            Arc::new(level.finish()),
            Arc::new(song_id.finish()),
            Arc::new(artist_id.finish()),
            Arc::new(session_id.finish()),
            Arc::new(location.finish()),
            Arc::new(user_agent.finish()),
            Arc::new(year.finish()),
            Arc::new(month.finish()),
        ],
    )?)
}
