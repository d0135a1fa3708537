//! Snowmelt turns raw music-streaming JSON datasets into a star-schema
//! Parquet warehouse.
//!
//! A run reads two fixed-layout NDJSON datasets below the input root
//! (`song_data/` and `log_data/`), derives four dimension tables (songs,
//! artists, users, time) and one fact table (songplay), and overwrites them
//! as Hive-partitioned Parquet below the output root. Input and output can
//! each live on the local filesystem or S3.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineStats};
