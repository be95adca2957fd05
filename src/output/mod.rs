//! Output module
//!
//! Handles Arrow RecordBatch creation and Parquet file writing.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Converting pool records to Arrow RecordBatches (`key` Int64, `value` JSON text)
//! - Writing Parquet files, one per stream

mod batch;
mod writer;

pub use batch::{record_batch_schema, records_to_batch};
pub use writer::{ParquetSink, ParquetWriter, ParquetWriterConfig, WrittenFile};

#[cfg(test)]
mod tests;
