//! End-to-end pipeline test against a local filesystem warehouse.
//!
//! Seeds a raw dataset in the fixed directory layout, runs the pipeline and
//! inspects the Parquet tables it writes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray};
use bytes::Bytes;
use tempfile::TempDir;

use snowmelt::config::{
    CompressionFormat, Config, InputConfig, MetricsConfig, OutputConfig, ParquetCompression,
};
use snowmelt::error::PipelineError;
use snowmelt::pipeline::Pipeline;
use snowmelt::sink::parquet::decode_batches;

const SONG_FILE: &str = concat!(
    r#"{"song_id":"SOBOO1","title":"Boo","artist_id":"AR1","artist_name":"Crazy Frog","artist_location":"Stockholm","artist_latitude":59.3,"artist_longitude":18.1,"year":2005,"duration":168.2}"#,
    "\n",
    r#"{"song_id":"SOSNOW1","title":"Snow","artist_id":"AR2","artist_name":"Whiteout","artist_location":null,"artist_latitude":null,"artist_longitude":null,"year":0,"duration":201.5}"#,
    "\n",
);

const LOG_FILE: &str = concat!(
    // Joins against the catalog
    r#"{"page":"NextSong","ts":1541121934796,"userId":"10","firstName":"Ada","lastName":"L","gender":"F","level":"free","song":"Boo","artist":"Crazy Frog","sessionId":5,"location":"Malmo","userAgent":"ua1"}"#,
    "\n",
    // Same user, same second: one time row, one extra fact row
    r#"{"page":"NextSong","ts":1541121934100,"userId":"10","firstName":"Ada","lastName":"L","gender":"F","level":"free","song":"Unknown Song","artist":"Nobody","sessionId":5,"location":"Malmo","userAgent":"ua1"}"#,
    "\n",
    // Non-play event, must be dropped everywhere
    r#"{"page":"Home","ts":1541121940000,"userId":"10","firstName":"Ada","lastName":"L","gender":"F","level":"free","sessionId":5,"location":"Malmo","userAgent":"ua1"}"#,
    "\n",
    // Second user, later second
    r#"{"page":"NextSong","ts":1541121936000,"userId":"11","firstName":"Bo","lastName":"K","gender":"M","level":"paid","song":"Snow","artist":"Whiteout","sessionId":6,"location":"Oslo","userAgent":"ua2"}"#,
    "\n",
);

fn seed_input(root: &Path) {
    let songs = root.join("song_data/A/A/A");
    fs::create_dir_all(&songs).unwrap();
    fs::write(songs.join("TRAAAAA.json"), SONG_FILE).unwrap();

    let logs = root.join("log_data/2018/11");
    fs::create_dir_all(&logs).unwrap();
    fs::write(logs.join("2018-11-02-events.json"), LOG_FILE).unwrap();
}

fn config(input: &Path, output: &Path) -> Config {
    Config {
        input: InputConfig {
            path: input.to_str().unwrap().to_string(),
            compression: CompressionFormat::None,
            storage_options: HashMap::new(),
            batch_size: 8192,
            max_concurrent_files: 2,
        },
        output: OutputConfig {
            path: output.to_str().unwrap().to_string(),
            storage_options: HashMap::new(),
            compression: ParquetCompression::Snappy,
        },
        metrics: MetricsConfig {
            enabled: false,
            address: String::new(),
        },
    }
}

fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn read_table(output: &Path, table: &str) -> Vec<RecordBatch> {
    let mut batches = Vec::new();
    for file in parquet_files(&output.join(table)) {
        let raw = Bytes::from(fs::read(&file).unwrap());
        batches.extend(decode_batches(raw, file.to_str().unwrap()).unwrap());
    }
    batches
}

fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|b| b.num_rows()).sum()
}

/// All rows of a table rendered as sorted strings, for set comparison
/// independent of file layout and row order.
fn table_row_set(output: &Path, table: &str) -> Vec<String> {
    let mut rows = Vec::new();
    for batch in read_table(output, table) {
        for row in 0..batch.num_rows() {
            let mut cells = Vec::new();
            for col in batch.columns() {
                let cell = if col.is_null(row) {
                    "null".to_string()
                } else if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
                    a.value(row).to_string()
                } else if let Some(a) = col.as_any().downcast_ref::<Int64Array>() {
                    a.value(row).to_string()
                } else if let Some(a) = col.as_any().downcast_ref::<Int32Array>() {
                    a.value(row).to_string()
                } else if let Some(a) = col.as_any().downcast_ref::<Float64Array>() {
                    a.value(row).to_string()
                } else {
                    panic!("unhandled column type in table {table}");
                };
                cells.push(cell);
            }
            rows.push(cells.join("|"));
        }
    }
    rows.sort();
    rows
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
}

async fn run(input: &Path, output: &Path) -> snowmelt::PipelineStats {
    let pipeline = Pipeline::new(config(input, output)).await.unwrap();
    pipeline.run().await.unwrap()
}

#[tokio::test]
async fn test_full_run_builds_star_schema() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());

    let stats = run(input.path(), output.path()).await;
    assert_eq!(stats.song_files, 1);
    assert_eq!(stats.log_files, 1);
    assert_eq!(stats.records_read, 6);

    // All five tables exist
    for table in ["songs", "artists", "users", "time", "songplay"] {
        assert!(
            !parquet_files(&output.path().join(table)).is_empty(),
            "missing table {table}"
        );
    }

    assert_eq!(total_rows(&read_table(output.path(), "songs")), 2);
    assert_eq!(total_rows(&read_table(output.path(), "artists")), 2);
    // One user row per distinct tuple
    assert_eq!(total_rows(&read_table(output.path(), "users")), 2);
    // Two play events share a truncated second
    assert_eq!(total_rows(&read_table(output.path(), "time")), 2);
    // Every NextSong event produces exactly one fact row
    assert_eq!(total_rows(&read_table(output.path(), "songplay")), 3);
}

#[tokio::test]
async fn test_partition_directory_layout() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());
    run(input.path(), output.path()).await;

    assert!(
        output
            .path()
            .join("songs/artist_id=AR1/year=2005")
            .is_dir()
    );
    assert!(output.path().join("songs/artist_id=AR2/year=0").is_dir());
    assert!(output.path().join("time/year=2018/month=11").is_dir());
    assert!(output.path().join("songplay/year=2018/month=11").is_dir());

    // Artists are unpartitioned: files sit directly under the table dir
    for file in parquet_files(&output.path().join("artists")) {
        assert_eq!(file.parent().unwrap(), output.path().join("artists"));
    }
}

#[tokio::test]
async fn test_fact_join_hits_and_misses() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());
    run(input.path(), output.path()).await;

    let batches = read_table(output.path(), "songplay");
    let mut rows: Vec<(String, Option<String>, Option<String>)> = Vec::new();
    for batch in &batches {
        let songs = string_col(batch, "song_id");
        let artists = string_col(batch, "artist_id");
        let start = string_col(batch, "start_time");
        for row in 0..batch.num_rows() {
            rows.push((
                start.value(row).to_string(),
                (!songs.is_null(row)).then(|| songs.value(row).to_string()),
                (!artists.is_null(row)).then(|| artists.value(row).to_string()),
            ));
        }
    }
    rows.sort();
    assert_eq!(rows.len(), 3);

    let hits: Vec<_> = rows.iter().filter(|(_, s, _)| s.is_some()).collect();
    let misses: Vec<_> = rows.iter().filter(|(_, s, _)| s.is_none()).collect();

    // "Boo" and "Snow" resolve, "Unknown Song" leaves null ids
    assert_eq!(hits.len(), 2);
    assert_eq!(misses.len(), 1);
    assert!(hits.iter().any(|(_, s, a)| {
        s.as_deref() == Some("SOBOO1") && a.as_deref() == Some("AR1")
    }));
    assert_eq!(misses[0].0, "2018-11-02 01:25:34");
    assert!(misses[0].2.is_none());
}

#[tokio::test]
async fn test_songplay_ids_unique_and_increasing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());
    run(input.path(), output.path()).await;

    let mut ids = Vec::new();
    for batch in read_table(output.path(), "songplay") {
        let col = batch
            .column_by_name("songplay_id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap()
            .clone();
        for row in 0..col.len() {
            ids.push(col.value(row));
        }
    }
    ids.sort();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_rerun_overwrites_instead_of_accumulating() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());

    let first = run(input.path(), output.path()).await;
    let first_files = parquet_files(&output.path().join("songplay"));

    let second = run(input.path(), output.path()).await;
    let second_files = parquet_files(&output.path().join("songplay"));

    // Same row counts, fresh files, no accumulation
    assert_eq!(first.songplays.rows, second.songplays.rows);
    assert_eq!(first_files.len(), second_files.len());
    assert_ne!(first_files, second_files);
    assert_eq!(total_rows(&read_table(output.path(), "songplay")), 3);
    assert_eq!(total_rows(&read_table(output.path(), "users")), 2);
}

#[tokio::test]
async fn test_rerun_reproduces_dimension_contents() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());

    run(input.path(), output.path()).await;
    let first: Vec<Vec<String>> = ["songs", "artists", "users", "time"]
        .iter()
        .map(|table| table_row_set(output.path(), table))
        .collect();
    assert!(first.iter().all(|rows| !rows.is_empty()));

    run(input.path(), output.path()).await;
    for (table, expected) in ["songs", "artists", "users", "time"].iter().zip(&first) {
        assert_eq!(
            &table_row_set(output.path(), table),
            expected,
            "rerun changed contents of table {table}"
        );
    }
}

#[tokio::test]
async fn test_missing_dataset_fails_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    // song_data present, log_data absent
    let songs = input.path().join("song_data/A/A/A");
    fs::create_dir_all(&songs).unwrap();
    fs::write(songs.join("TRAAAAA.json"), SONG_FILE).unwrap();

    let pipeline = Pipeline::new(config(input.path(), output.path()))
        .await
        .unwrap();
    match pipeline.run().await {
        Err(PipelineError::NoInputFiles { pattern }) => {
            assert_eq!(pattern, "log_data/*/*/*.json");
        }
        other => panic!("expected NoInputFiles, got {other:?}"),
    }
}

#[tokio::test]
async fn test_preflight_validates_without_writing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_input(input.path());

    let pipeline = Pipeline::new(config(input.path(), output.path()))
        .await
        .unwrap();
    pipeline.preflight().await.unwrap();

    assert!(parquet_files(&output.path().join("songplay")).is_empty());
    assert!(parquet_files(&output.path().join("songs")).is_empty());
}
