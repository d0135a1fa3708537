//! Pipeline orchestration.
//!
//! One run is a single batch job: parse the song catalog, write the songs
//! and artists dimensions, re-read them from the warehouse to build the
//! join index, then parse the event logs and write the users and time
//! dimensions and the songplays fact table. Every table write is an
//! overwrite, so a rerun against the same output root converges to the
//! same warehouse.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use futures::StreamExt;
use snafu::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::emit;
use crate::error::{
    NoInputFilesSnafu, ParquetSnafu, PipelineError, PipelineStorageSnafu, ReaderSnafu, SinkSnafu,
    TaskJoinSnafu, TransformSnafu,
};
use crate::metrics::events::{FileRead, RecordsRead};
use crate::schema;
use crate::sink::{TableWriteStats, TableWriter, parquet};
use crate::source::{NdjsonReader, NdjsonReaderConfig};
use crate::storage::{StorageProvider, StorageProviderRef, list_json_files};
use crate::transform::{catalog, concat, events, plays, time};

/// Raw dataset prefixes and their fixed directory depths below the input root.
const SONG_DATA: (&str, usize) = ("song_data", 4);
const LOG_DATA: (&str, usize) = ("log_data", 3);

/// Warehouse table directory names.
const SONGS_TABLE: &str = "songs";
const ARTISTS_TABLE: &str = "artists";
const USERS_TABLE: &str = "users";
const TIME_TABLE: &str = "time";
const SONGPLAYS_TABLE: &str = "songplay";

/// Statistics for one pipeline run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub song_files: usize,
    pub log_files: usize,
    pub records_read: usize,
    pub songs: TableWriteStats,
    pub artists: TableWriteStats,
    pub users: TableWriteStats,
    pub time: TableWriteStats,
    pub songplays: TableWriteStats,
}

/// The ETL pipeline: raw JSON datasets in, star-schema Parquet out.
pub struct Pipeline {
    config: Config,
    input: StorageProviderRef,
    output: StorageProviderRef,
    writer: TableWriter,
}

struct Dataset {
    files: usize,
    records: usize,
    batches: Vec<RecordBatch>,
}

impl Pipeline {
    /// Construct a pipeline from configuration, connecting both storage roots.
    pub async fn new(config: Config) -> Result<Self, PipelineError> {
        let input = Arc::new(
            StorageProvider::for_url_with_options(
                &config.input.path,
                config.input.storage_options.clone(),
            )
            .await
            .context(PipelineStorageSnafu)?,
        );
        let output = Arc::new(
            StorageProvider::for_url_with_options(
                &config.output.path,
                config.output.storage_options.clone(),
            )
            .await
            .context(PipelineStorageSnafu)?,
        );
        let writer = TableWriter::new(Arc::clone(&output), config.output.compression);

        Ok(Self {
            config,
            input,
            output,
            writer,
        })
    }

    /// Validate the configured input without writing anything.
    ///
    /// Connects storage, lists both datasets and fails the same way a real
    /// run would if either dataset is empty.
    pub async fn preflight(&self) -> Result<(), PipelineError> {
        for (prefix, depth) in [SONG_DATA, LOG_DATA] {
            let files = list_json_files(&self.input, prefix, depth)
                .await
                .context(PipelineStorageSnafu)?;
            ensure!(
                !files.is_empty(),
                NoInputFilesSnafu {
                    pattern: dataset_pattern(prefix, depth),
                }
            );
            info!(prefix, files = files.len(), "Dataset found");
        }
        Ok(())
    }

    /// Run the full pipeline once.
    pub async fn run(&self) -> Result<PipelineStats, PipelineError> {
        let mut stats = PipelineStats::default();

        // Catalog half: songs and artists dimensions
        let song_data = self.read_dataset(SONG_DATA, schema::raw_songs()).await?;
        stats.song_files = song_data.files;
        stats.records_read += song_data.records;

        let mut songs = Vec::with_capacity(song_data.batches.len());
        let mut artists = Vec::with_capacity(song_data.batches.len());
        for batch in &song_data.batches {
            songs.push(catalog::songs_table(batch).context(TransformSnafu)?);
            artists.push(catalog::artists_table(batch).context(TransformSnafu)?);
        }

        stats.songs = self
            .writer
            .write_table(SONGS_TABLE, &songs, &["artist_id", "year"])
            .await
            .context(SinkSnafu)?;
        stats.artists = self
            .writer
            .write_table(ARTISTS_TABLE, &artists, &[])
            .await
            .context(SinkSnafu)?;

        // The join index is built from the persisted dimensions, so the fact
        // table always reflects exactly what the warehouse holds.
        let songs = self.read_table(SONGS_TABLE).await?;
        let artists = self.read_table(ARTISTS_TABLE).await?;
        let index = plays::CatalogIndex::build(&songs, &artists).context(TransformSnafu)?;
        info!(keys = index.len(), "Catalog join index built");

        // Event half: users and time dimensions plus the songplays fact
        let log_data = self.read_dataset(LOG_DATA, schema::raw_events()).await?;
        stats.log_files = log_data.files;
        stats.records_read += log_data.records;

        let mut play_batches = Vec::with_capacity(log_data.batches.len());
        for batch in &log_data.batches {
            play_batches.push(events::filter_play_events(batch).context(TransformSnafu)?);
        }
        // One batch for the event-derived tables, so deduplication and fact
        // ids span the whole run rather than one file.
        let plays = concat(&schema::raw_events(), &play_batches).context(TransformSnafu)?;
        info!(plays = plays.num_rows(), "Play events filtered");

        let users = events::users_table(&plays).context(TransformSnafu)?;
        let time = time::time_table(&plays).context(TransformSnafu)?;

        let mut next_id = 0;
        let facts = plays::songplays_table(&plays, &index, &mut next_id).context(TransformSnafu)?;

        stats.users = self
            .writer
            .write_table(USERS_TABLE, &[users], &[])
            .await
            .context(SinkSnafu)?;
        stats.time = self
            .writer
            .write_table(TIME_TABLE, &[time], &["year", "month"])
            .await
            .context(SinkSnafu)?;
        stats.songplays = self
            .writer
            .write_table(SONGPLAYS_TABLE, &[facts], &["year", "month"])
            .await
            .context(SinkSnafu)?;

        info!(
            song_files = stats.song_files,
            log_files = stats.log_files,
            records = stats.records_read,
            songplays = stats.songplays.rows,
            "Pipeline run complete"
        );

        Ok(stats)
    }

    /// List, fetch and parse one raw dataset.
    ///
    /// Files are fetched with bounded concurrency but batches are collected
    /// in listing order, so a rerun sees rows in the same order.
    async fn read_dataset(
        &self,
        (prefix, depth): (&str, usize),
        schema: SchemaRef,
    ) -> Result<Dataset, PipelineError> {
        let files = list_json_files(&self.input, prefix, depth)
            .await
            .context(PipelineStorageSnafu)?;
        ensure!(
            !files.is_empty(),
            NoInputFilesSnafu {
                pattern: dataset_pattern(prefix, depth),
            }
        );
        info!(prefix, files = files.len(), "Reading dataset");

        let reader_config =
            NdjsonReaderConfig::new(self.config.input.batch_size, self.config.input.compression);

        let file_count = files.len();
        let results: Vec<Result<(Vec<RecordBatch>, usize), PipelineError>> =
            futures::stream::iter(files.into_iter().map(|file| {
                let storage = Arc::clone(&self.input);
                let schema = Arc::clone(&schema);
                let reader_config = reader_config.clone();
                async move {
                    let raw = storage.get(file.as_str()).await.context(PipelineStorageSnafu)?;
                    // Parsing is CPU-bound, keep it off the async executor
                    let result = tokio::task::spawn_blocking(move || {
                        NdjsonReader::new(schema, reader_config).read(raw, &file)
                    })
                    .await
                    .context(TaskJoinSnafu)?
                    .context(ReaderSnafu)?;
                    emit!(FileRead);
                    emit!(RecordsRead {
                        count: result.total_records as u64,
                    });
                    Ok((result.batches, result.total_records))
                }
            }))
            .buffered(self.config.input.max_concurrent_files)
            .collect()
            .await;

        let mut dataset = Dataset {
            files: file_count,
            records: 0,
            batches: Vec::new(),
        };
        for result in results {
            let (batches, records) = result?;
            dataset.records += records;
            dataset.batches.extend(batches);
        }
        Ok(dataset)
    }

    /// Read a warehouse table back from storage.
    async fn read_table(&self, table: &str) -> Result<Vec<RecordBatch>, PipelineError> {
        let mut paths = Vec::new();
        {
            let mut stream = self
                .output
                .list_with_prefix(table)
                .await
                .context(PipelineStorageSnafu)?;
            while let Some(result) = stream.next().await {
                let path = result
                    .map_err(|source| crate::error::StorageError::ObjectStore { source })
                    .context(PipelineStorageSnafu)?;
                if path.as_ref().ends_with(".parquet") {
                    paths.push(path.to_string());
                }
            }
        }
        paths.sort();

        let mut batches = Vec::new();
        for path in paths {
            let raw = self
                .output
                .get(path.as_str())
                .await
                .context(PipelineStorageSnafu)?;
            batches.extend(parquet::decode_batches(raw, &path).context(ParquetSnafu)?);
        }
        Ok(batches)
    }
}

fn dataset_pattern(prefix: &str, depth: usize) -> String {
    let dirs = vec!["*"; depth - 1].join("/");
    format!("{prefix}/{dirs}/*.json")
}
