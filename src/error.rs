//! Error types for snowmelt using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// Local filesystem configuration error.
    #[snafu(display("Local filesystem configuration error"))]
    LocalConfig { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Input path is empty.
    #[snafu(display("Input path cannot be empty"))]
    EmptyInputPath,

    /// Output path is empty.
    #[snafu(display("Output path cannot be empty"))]
    EmptyOutputPath,

    /// max_concurrent_files is zero, which would stall file reads.
    #[snafu(display("max_concurrent_files must be at least 1"))]
    ZeroMaxConcurrentFiles,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Reader Errors ============

/// Errors that can occur during NDJSON file reading.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// Gzip decompression failed.
    #[snafu(display("Gzip decompression failed for {path}"))]
    GzipDecompression {
        source: std::io::Error,
        path: String,
    },

    /// Zstd decompression failed.
    #[snafu(display("Zstd decompression failed for {path}"))]
    ZstdDecompression {
        source: std::io::Error,
        path: String,
    },

    /// Failed to build JSON decoder.
    #[snafu(display("Failed to build JSON decoder: {message}"))]
    DecoderBuild { message: String },

    /// Failed to decode a JSON record.
    #[snafu(display("Failed to decode JSON for {path}: {message}"))]
    JsonDecode { path: String, message: String },

    /// Failed to flush decoded records into a batch.
    #[snafu(display("Failed to flush batch for {path}: {message}"))]
    BatchFlush { path: String, message: String },
}

// ============ Transform Errors ============

/// Errors that can occur while deriving dimension and fact tables.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// A required column is missing from the input batch.
    #[snafu(display("Missing column '{name}' in input batch"))]
    MissingColumn { name: String },

    /// A column has an unexpected Arrow type.
    #[snafu(display("Column '{name}' has unexpected type (expected {expected})"))]
    ColumnType { name: String, expected: String },

    /// An epoch timestamp is outside the representable calendar range.
    #[snafu(display("Timestamp {ts} ms is out of range"))]
    TimestampRange { ts: i64 },

    /// A play event has no timestamp to derive start_time from.
    #[snafu(display("Play event at row {row} has no timestamp"))]
    MissingTimestamp { row: usize },

    /// Arrow kernel failure (filter, concat, batch construction).
    #[snafu(display("Arrow compute failed: {message}"))]
    Arrow { message: String },
}

impl From<arrow::error::ArrowError> for TransformError {
    fn from(err: arrow::error::ArrowError) -> Self {
        TransformError::Arrow {
            message: err.to_string(),
        }
    }
}

// ============ Parquet Errors ============

/// Errors that can occur during Parquet encoding and decoding.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParquetError {
    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer"))]
    WriterCreate {
        source: parquet::errors::ParquetError,
    },

    /// Parquet write error.
    #[snafu(display("Parquet write error"))]
    Write {
        source: parquet::errors::ParquetError,
    },

    /// Failed to open a Parquet file for reading.
    #[snafu(display("Failed to read Parquet file {path}"))]
    ReaderCreate {
        source: parquet::errors::ParquetError,
        path: String,
    },

    /// Failed to decode a batch from a Parquet file.
    #[snafu(display("Failed to decode Parquet batch from {path}"))]
    ReadBatch {
        source: arrow::error::ArrowError,
        path: String,
    },
}

// ============ Sink Errors ============

/// Errors that can occur while persisting a warehouse table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to split batches into partition groups.
    #[snafu(display("Failed to partition table '{table}'"))]
    Partition {
        source: TransformError,
        table: String,
    },

    /// Failed to encode a Parquet file.
    #[snafu(display("Failed to encode Parquet for table '{table}'"))]
    Encode {
        source: ParquetError,
        table: String,
    },

    /// Failed to persist table files.
    #[snafu(display("Failed to write table '{table}'"))]
    TableStorage {
        source: StorageError,
        table: String,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ Pipeline Error (top-level) ============

/// Top-level pipeline errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Storage error.
    #[snafu(display("Storage error"))]
    PipelineStorage { source: StorageError },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Reader error.
    #[snafu(display("Reader error"))]
    Reader { source: ReaderError },

    /// Transform error.
    #[snafu(display("Transform error"))]
    Transform { source: TransformError },

    /// Parquet error.
    #[snafu(display("Parquet error"))]
    Parquet { source: ParquetError },

    /// Sink error.
    #[snafu(display("Sink error"))]
    Sink { source: SinkError },

    /// No input files matched a required pattern.
    #[snafu(display("No input files found under '{pattern}'"))]
    NoInputFiles { pattern: String },

    /// A blocking parse task panicked or was cancelled.
    #[snafu(display("Task join error"))]
    TaskJoin { source: tokio::task::JoinError },

    /// Address parsing error.
    #[snafu(display("Failed to parse address"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },
}
