//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the pipeline.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! Prometheus metric.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when raw records are decoded from input files.
pub struct RecordsRead {
    pub count: u64,
}

impl InternalEvent for RecordsRead {
    fn emit(self) {
        trace!(count = self.count, "Records read");
        counter!("snowmelt_records_read_total").increment(self.count);
    }
}

/// Event emitted when rows are written to a warehouse table.
pub struct RowsWritten {
    pub table: &'static str,
    pub count: u64,
}

impl InternalEvent for RowsWritten {
    fn emit(self) {
        trace!(table = self.table, count = self.count, "Rows written");
        counter!("snowmelt_rows_written_total", "table" => self.table).increment(self.count);
    }
}

/// Event emitted when raw bytes are read from source storage.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes read");
        counter!("snowmelt_bytes_read_total").increment(self.bytes);
    }
}

/// Event emitted when Parquet bytes are written to the warehouse.
pub struct BytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes written");
        counter!("snowmelt_bytes_written_total").increment(self.bytes);
    }
}

/// Event emitted when an input file has been parsed.
pub struct FileRead;

impl InternalEvent for FileRead {
    fn emit(self) {
        counter!("snowmelt_files_read_total").increment(1);
    }
}

/// Event emitted when a Parquet file has been persisted.
pub struct ParquetFileWritten {
    pub table: &'static str,
}

impl InternalEvent for ParquetFileWritten {
    fn emit(self) {
        trace!(table = self.table, "Parquet file written");
        counter!("snowmelt_parquet_files_written_total", "table" => self.table).increment(1);
    }
}

/// Type of storage operation.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    List,
    Delete,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
            StorageOperation::Delete => "delete",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted for each storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        counter!(
            "snowmelt_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}
