//! Parquet file writer
//!
//! Writes pool records to one Parquet file per stream.

use super::batch::{record_batch_schema, records_to_batch};
use crate::decode::Record;
use crate::error::{Error, Result};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024, // 1M rows
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer
pub struct ParquetWriter {
    /// Arrow writer
    writer: ArrowWriter<File>,
    /// Number of rows written
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(
        path: impl AsRef<Path>,
        schema: &Schema,
        config: &ParquetWriterConfig,
    ) -> Result<Self> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::output(format!("Failed to create file: {e}")))?;

        let props = config.build_properties();
        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch to the file
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch)?;

        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Get the number of rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Close the writer and finalize the file
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close()?;
        Ok(rows)
    }
}

/// A finished per-stream output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Stream name
    pub stream: String,
    /// File path
    pub path: PathBuf,
    /// Rows written
    pub rows: usize,
}

struct StreamFile {
    path: PathBuf,
    writer: ParquetWriter,
    buffer: Vec<Record>,
}

/// Buffers records per stream and writes them to `<dir>/<stream>.parquet`
pub struct ParquetSink {
    dir: PathBuf,
    config: ParquetWriterConfig,
    batch_size: usize,
    streams: HashMap<String, StreamFile>,
}

impl ParquetSink {
    /// Create a sink writing into `dir` (created if missing)
    pub fn new(dir: impl AsRef<Path>, config: ParquetWriterConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::output(format!("Failed to create output directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            config,
            batch_size: 10_000,
            streams: HashMap::new(),
        })
    }

    /// Records buffered per stream before a batch is written
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Output path of a stream
    pub fn path_for(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{stream}.parquet"))
    }

    /// Add a record to a stream's file
    pub fn push(&mut self, stream: &str, record: Record) -> Result<()> {
        if !self.streams.contains_key(stream) {
            let path = self.path_for(stream);
            let writer = ParquetWriter::new(&path, &record_batch_schema(), &self.config)?;
            debug!(stream, path = %path.display(), "Opened Parquet output");
            self.streams.insert(
                stream.to_string(),
                StreamFile {
                    path,
                    writer,
                    buffer: Vec::new(),
                },
            );
        }

        let batch_size = self.batch_size;
        if let Some(file) = self.streams.get_mut(stream) {
            file.buffer.push(record);
            if file.buffer.len() >= batch_size {
                flush(file)?;
            }
        }
        Ok(())
    }

    /// Flush and close every file
    pub fn finish(self) -> Result<Vec<WrittenFile>> {
        let mut written = Vec::with_capacity(self.streams.len());
        for (stream, mut file) in self.streams {
            flush(&mut file)?;
            let rows = file.writer.close()?;
            written.push(WrittenFile {
                stream,
                path: file.path,
                rows,
            });
        }
        written.sort_by(|a, b| a.stream.cmp(&b.stream));
        Ok(written)
    }
}

fn flush(file: &mut StreamFile) -> Result<()> {
    if file.buffer.is_empty() {
        return Ok(());
    }
    let batch = records_to_batch(&file.buffer)?;
    file.writer.write(&batch)?;
    file.buffer.clear();
    Ok(())
}
