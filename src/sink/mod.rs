//! Partitioned Parquet sink.
//!
//! Splits table batches into Hive-style partition groups and persists them
//! with per-table overwrite semantics.

pub mod parquet;
pub mod partition;

pub use parquet::{TableWriteStats, TableWriter};
pub use partition::{HIVE_DEFAULT_PARTITION, PartitionGroup, split_by_partitions};
