//! Event dimension extraction: play-event filter and users dimension.
//!
//! The `page == "NextSong"` filter is computed once per run and the filtered
//! batch feeds the users dimension, the time dimension and the fact builder,
//! so all three see an identical row set.

use arrow::array::{Array, BooleanArray, RecordBatch};
use arrow::compute::filter_record_batch;
use std::collections::HashSet;

use super::{opt_string, project, string_col};
use crate::error::TransformError;
use crate::schema;

/// The page value marking a song-play event.
pub const PLAY_EVENT_PAGE: &str = "NextSong";

/// Retain only play events (`page == "NextSong"`).
///
/// Null pages and any other page value are dropped.
pub fn filter_play_events(events: &RecordBatch) -> Result<RecordBatch, TransformError> {
    let page = string_col(events, "page")?;

    let mask = BooleanArray::from_iter(
        (0..events.num_rows())
            .map(|row| Some(!page.is_null(row) && page.value(row) == PLAY_EVENT_PAGE)),
    );

    Ok(filter_record_batch(events, &mask)?)
}

/// Full five-column row identity used for users deduplication.
///
/// Deduplication is by the entire tuple, including `level`: a user who
/// changed plan tiers mid-dataset keeps one row per distinct combination.
#[derive(Hash, PartialEq, Eq)]
struct UserRow {
    user_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    level: Option<String>,
}

/// Build the users dimension from filtered play events.
///
/// Projects and renames the five user columns, then collapses duplicate
/// tuples, keeping first-seen order.
pub fn users_table(plays: &RecordBatch) -> Result<RecordBatch, TransformError> {
    let projected = project(
        plays,
        &schema::users(),
        &["userId", "firstName", "lastName", "gender", "level"],
    )?;

    let user_id = string_col(&projected, "user_id")?;
    let first_name = string_col(&projected, "first_name")?;
    let last_name = string_col(&projected, "last_name")?;
    let gender = string_col(&projected, "gender")?;
    let level = string_col(&projected, "level")?;

    let mut seen: HashSet<UserRow> = HashSet::new();
    let mask = BooleanArray::from_iter((0..projected.num_rows()).map(|row| {
        Some(seen.insert(UserRow {
            user_id: opt_string(user_id, row),
            first_name: opt_string(first_name, row),
            last_name: opt_string(last_name, row),
            gender: opt_string(gender, row),
            level: opt_string(level, row),
        }))
    }));

    Ok(filter_record_batch(&projected, &mask)?)
}
