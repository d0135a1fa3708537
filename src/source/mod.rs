//! Raw record source: NDJSON decoding.

mod reader;

pub use reader::{NdjsonReader, NdjsonReaderConfig, ReadResult};
