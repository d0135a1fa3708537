//! Parquet encoding and the overwriting table writer.
//!
//! Each table write is an overwrite: the table prefix is cleared first, then
//! one Parquet file per partition group is encoded in memory and put to
//! `<table>/<partition>/<uuid>.parquet`.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use super::partition::split_by_partitions;
use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    EncodeSnafu, ParquetError, PartitionSnafu, ReadBatchSnafu, ReaderCreateSnafu, SinkError,
    TableStorageSnafu, WriteSnafu, WriterCreateSnafu,
};
use crate::metrics::events::{BytesWritten, ParquetFileWritten, RowsWritten};
use crate::storage::StorageProviderRef;

/// Statistics for one table write.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableWriteStats {
    pub rows: usize,
    pub files: usize,
    pub bytes: usize,
}

/// Writes warehouse tables as partitioned Parquet with overwrite semantics.
pub struct TableWriter {
    storage: StorageProviderRef,
    compression: ParquetCompression,
}

impl TableWriter {
    pub fn new(storage: StorageProviderRef, compression: ParquetCompression) -> Self {
        Self {
            storage,
            compression,
        }
    }

    /// Overwrite `table` with the given batches, partitioned by `partition_by`.
    ///
    /// An empty batch set still clears the table prefix, leaving an empty
    /// table rather than stale data from a previous run.
    pub async fn write_table(
        &self,
        table: &'static str,
        batches: &[RecordBatch],
        partition_by: &[&str],
    ) -> Result<TableWriteStats, SinkError> {
        let removed = self
            .storage
            .delete_prefix(table)
            .await
            .context(TableStorageSnafu { table })?;
        if removed > 0 {
            debug!(table, removed, "Cleared previous table contents");
        }

        let groups = split_by_partitions(batches, partition_by)
            .context(PartitionSnafu { table })?;

        let mut stats = TableWriteStats::default();
        for group in groups {
            if group.num_rows() == 0 {
                continue;
            }

            let schema = group.batches[0].schema();
            let buffer = encode_batches(schema, &group.batches, self.compression)
                .context(EncodeSnafu { table })?;

            let prefix = group.path_prefix();
            let filename = format!("{}.parquet", Uuid::now_v7());
            let path = if prefix.is_empty() {
                format!("{table}/{filename}")
            } else {
                format!("{table}/{prefix}/{filename}")
            };

            stats.rows += group.num_rows();
            stats.files += 1;
            stats.bytes += buffer.len();

            emit!(ParquetFileWritten { table });
            emit!(BytesWritten {
                bytes: buffer.len() as u64,
            });
            emit!(RowsWritten {
                table,
                count: group.num_rows() as u64,
            });

            self.storage
                .put(path, buffer)
                .await
                .context(TableStorageSnafu { table })?;
        }

        info!(
            table,
            rows = stats.rows,
            files = stats.files,
            bytes = stats.bytes,
            "Table written"
        );

        Ok(stats)
    }
}

/// Encode batches into a single in-memory Parquet file.
pub fn encode_batches(
    schema: SchemaRef,
    batches: &[RecordBatch],
    compression: ParquetCompression,
) -> Result<Vec<u8>, ParquetError> {
    let props = WriterProperties::builder()
        .set_compression(match compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        })
        .build();

    let mut writer =
        ArrowWriter::try_new(Vec::new(), schema, Some(props)).context(WriterCreateSnafu)?;
    for batch in batches {
        writer.write(batch).context(WriteSnafu)?;
    }
    writer.into_inner().context(WriteSnafu)
}

/// Decode every batch from an in-memory Parquet file.
pub fn decode_batches(raw: Bytes, path: &str) -> Result<Vec<RecordBatch>, ParquetError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(raw)
        .context(ReaderCreateSnafu { path })?
        .build()
        .context(ReaderCreateSnafu { path })?;

    reader
        .into_iter()
        .map(|batch| batch.context(ReadBatchSnafu { path }))
        .collect()
}
