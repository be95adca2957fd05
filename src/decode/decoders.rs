//! Decoder implementations
//!
//! Bundle payloads are gzip-compressed JSON arrays of `{key, value}` items.

use super::types::{Record, RecordIter};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::io::Read;

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// ============================================================================
// Gzip Decompressor
// ============================================================================

/// Inflates gzip-compressed bundle payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipDecompressor;

impl GzipDecompressor {
    /// Create a new decompressor
    pub fn new() -> Self {
        Self
    }

    /// Decompress a payload
    ///
    /// Fails with [`Error::Decompression`] when the input is not valid gzip
    /// framing or the stream is truncated or corrupt.
    pub fn decompress(&self, storage_id: &str, data: &[u8]) -> Result<Vec<u8>> {
        if !data.starts_with(&GZIP_MAGIC) {
            return Err(Error::decompression(storage_id, "missing gzip header"));
        }

        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 4);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::decompression(storage_id, e.to_string()))?;
        Ok(out)
    }
}

// ============================================================================
// JSON Record Extractor
// ============================================================================

/// Parses a decompressed payload into records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordExtractor;

impl JsonRecordExtractor {
    /// Create a new extractor
    pub fn new() -> Self {
        Self
    }

    /// Parse the payload as a JSON array of records
    pub fn extract(&self, data: &[u8]) -> Result<RecordIter> {
        let records: Vec<Record> = serde_json::from_slice(data)
            .map_err(|e| Error::decode(format!("Failed to parse bundle payload: {e}")))?;
        Ok(records.into_iter())
    }
}

// ============================================================================
// Bundle Decoder
// ============================================================================

/// Decompresses and extracts a bundle payload in one step
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleDecoder {
    decompressor: GzipDecompressor,
    extractor: JsonRecordExtractor,
}

impl BundleDecoder {
    /// Create a new bundle decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode raw (already verified) bundle bytes into records
    pub fn decode(&self, storage_id: &str, data: &[u8]) -> Result<RecordIter> {
        let decompressed = self.decompressor.decompress(storage_id, data)?;
        self.extractor.extract(&decompressed)
    }
}
