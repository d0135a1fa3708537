//! NDJSON reader.
//!
//! Reads newline-delimited JSON files (optionally gzip or zstd compressed)
//! and converts them to Arrow RecordBatches using a fixed schema. Unknown
//! fields are ignored; a structurally malformed record is a fatal error for
//! the run, there is no per-record skip policy.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use arrow::json::ReaderBuilder;
use bytes::Bytes;
use snafu::prelude::*;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

use crate::config::CompressionFormat;
use crate::emit;
use crate::error::{
    BatchFlushSnafu, DecoderBuildSnafu, GzipDecompressionSnafu, JsonDecodeSnafu, ReaderError,
    ZstdDecompressionSnafu,
};
use crate::metrics::events::BytesRead;

/// Configuration for the NDJSON reader.
#[derive(Debug, Clone)]
pub struct NdjsonReaderConfig {
    /// Number of records per batch.
    pub batch_size: usize,
    /// Compression format of input files.
    pub compression: CompressionFormat,
}

impl NdjsonReaderConfig {
    /// Create a new reader configuration.
    pub fn new(batch_size: usize, compression: CompressionFormat) -> Self {
        Self {
            batch_size,
            compression,
        }
    }
}

/// Result of reading and parsing a file.
#[derive(Debug)]
pub struct ReadResult {
    /// Parsed record batches.
    pub batches: Vec<RecordBatch>,
    /// Total number of records read.
    pub total_records: usize,
}

/// A reader for NDJSON files that yields Arrow RecordBatches.
pub struct NdjsonReader {
    schema: SchemaRef,
    config: NdjsonReaderConfig,
}

impl NdjsonReader {
    /// Create a new NDJSON reader with the given schema and configuration.
    pub fn new(schema: SchemaRef, config: NdjsonReaderConfig) -> Self {
        Self { schema, config }
    }

    /// Read raw file data and parse it into record batches.
    pub fn read(&self, raw: Bytes, path: &str) -> Result<ReadResult, ReaderError> {
        emit!(BytesRead {
            bytes: raw.len() as u64,
        });

        let data = match self.config.compression {
            CompressionFormat::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(&raw[..]);
                let mut buf = Vec::new();
                decoder
                    .read_to_end(&mut buf)
                    .context(GzipDecompressionSnafu {
                        path: path.to_string(),
                    })?;
                buf
            }
            CompressionFormat::Zstd => {
                zstd::decode_all(&raw[..]).context(ZstdDecompressionSnafu {
                    path: path.to_string(),
                })?
            }
            CompressionFormat::None => raw.to_vec(),
        };

        // Parse JSON to batches
        let mut decoder = ReaderBuilder::new(Arc::clone(&self.schema))
            .with_batch_size(self.config.batch_size)
            .with_strict_mode(false)
            .build_decoder()
            .map_err(|e| {
                DecoderBuildSnafu {
                    message: e.to_string(),
                }
                .build()
            })?;

        // Decode and flush in interleaved fashion - decode() stops after batch_size
        // records, so we must flush after each decode to get all records
        let mut offset = 0;
        let mut batches = Vec::new();
        let mut total_records = 0;

        loop {
            let consumed = decoder.decode(&data[offset..]).map_err(|e| {
                JsonDecodeSnafu {
                    path: path.to_string(),
                    message: e.to_string(),
                }
                .build()
            })?;

            if let Some(batch) = decoder.flush().map_err(|e| {
                BatchFlushSnafu {
                    path: path.to_string(),
                    message: e.to_string(),
                }
                .build()
            })? {
                total_records += batch.num_rows();
                batches.push(batch);
            }

            if consumed == 0 {
                // No progress - check if remaining bytes are just whitespace
                let remaining = &data[offset..];
                if !remaining.iter().all(|&b| b.is_ascii_whitespace()) {
                    debug!(
                        "Could not parse {} trailing bytes in {}",
                        remaining.len(),
                        path
                    );
                }
                break;
            }
            offset += consumed;
        }

        debug!(
            "Parsed {} batches ({} records) from {}",
            batches.len(),
            total_records,
            path
        );

        Ok(ReadResult {
            batches,
            total_records,
        })
    }
}
