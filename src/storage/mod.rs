//! Bundle storage access
//!
//! Retrieves bundle payloads from the storage provider named in the bundle
//! descriptor and checks them against the hash recorded on chain.
//!
//! # Overview
//!
//! - [`ContentFetcher`] routes a storage id to the native storage endpoint
//!   or to the decentralized-storage gateway, based on the provider id
//! - [`IntegrityVerifier`] compares the SHA-256 of the fetched bytes with
//!   the expected hex digest

mod fetcher;
mod verify;

pub use fetcher::{
    ContentFetcher, StorageEndpoints, StorageRoute, DEFAULT_GATEWAY_URL,
    DEFAULT_NATIVE_STORAGE_URL, NATIVE_STORAGE_PROVIDER,
};
pub use verify::{sha256_hex, IntegrityVerifier};
