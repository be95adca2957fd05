//! Bundle payload decoding
//!
//! Gzip decompression followed by JSON record extraction.
//!
//! # Overview
//!
//! A bundle payload, once fetched and verified, is a gzip stream holding a
//! JSON array of `{key, value}` items. [`GzipDecompressor`] inflates it,
//! [`JsonRecordExtractor`] turns it into [`Record`]s, and [`BundleDecoder`]
//! chains the two.

mod decoders;
mod types;

pub use decoders::{BundleDecoder, GzipDecompressor, JsonRecordExtractor};
pub use types::{record_schema, Record, RecordIter};
