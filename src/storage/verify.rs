//! Payload integrity verification

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Checks fetched bytes against the hash carried in the bundle descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Create a new verifier
    pub fn new() -> Self {
        Self
    }

    /// Whether the SHA-256 of `data` equals `expected_hex` (case-insensitive)
    pub fn verify(&self, data: &[u8], expected_hex: &str) -> bool {
        sha256_hex(data) == expected_hex.to_ascii_lowercase()
    }

    /// Like [`verify`](Self::verify), failing with [`Error::Integrity`]
    pub fn ensure(&self, bundle_id: &str, data: &[u8], expected_hex: &str) -> Result<()> {
        let actual = sha256_hex(data);
        if actual == expected_hex.to_ascii_lowercase() {
            Ok(())
        } else {
            Err(Error::integrity(bundle_id, expected_hex, actual))
        }
    }
}
