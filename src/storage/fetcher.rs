//! Storage provider routing and payload retrieval

use crate::error::{Error, Result};
use crate::http::HttpClient;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Provider id of the native storage provider
pub const NATIVE_STORAGE_PROVIDER: &str = "3";

/// Default endpoint of the native storage provider
pub const DEFAULT_NATIVE_STORAGE_URL: &str = "https://storage.kyve.network";

/// Default decentralized-storage gateway
pub const DEFAULT_GATEWAY_URL: &str = "https://arweave.net";

/// Where a storage id is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRoute {
    /// Native storage provider
    Native,
    /// Decentralized-storage gateway (every other provider id)
    Gateway,
}

impl StorageRoute {
    /// Pick the route for a provider id
    pub fn for_provider(provider_id: &str) -> Self {
        if provider_id == NATIVE_STORAGE_PROVIDER {
            Self::Native
        } else {
            Self::Gateway
        }
    }
}

/// Base URLs of the two storage routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEndpoints {
    /// Native storage base URL
    pub native_url: String,
    /// Gateway base URL
    pub gateway_url: String,
}

impl Default for StorageEndpoints {
    fn default() -> Self {
        Self {
            native_url: DEFAULT_NATIVE_STORAGE_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

impl StorageEndpoints {
    /// Create endpoints from explicit base URLs
    pub fn new(native_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            native_url: native_url.into(),
            gateway_url: gateway_url.into(),
        }
    }

    /// Full URL of a stored payload
    pub fn url_for(&self, storage_id: &str, provider_id: &str) -> String {
        let base = match StorageRoute::for_provider(provider_id) {
            StorageRoute::Native => &self.native_url,
            StorageRoute::Gateway => &self.gateway_url,
        };
        format!("{}/{}", base.trim_end_matches('/'), storage_id)
    }
}

/// Fetches raw bundle payloads
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: HttpClient,
    endpoints: StorageEndpoints,
}

impl ContentFetcher {
    /// Create a fetcher over the given client and endpoints
    pub fn new(client: HttpClient, endpoints: StorageEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Storage endpoints in use
    pub fn endpoints(&self) -> &StorageEndpoints {
        &self.endpoints
    }

    /// Retrieve the raw bytes stored under `storage_id`
    ///
    /// Any non-success answer (after the client's own retries) becomes an
    /// [`Error::Fetch`]; whether that ends the sync is the caller's call.
    pub async fn fetch(&self, storage_id: &str, provider_id: &str) -> Result<Bytes> {
        let url = self.endpoints.url_for(storage_id, provider_id);
        debug!(storage_id, provider_id, %url, "Fetching bundle data");

        self.client.get_bytes(&url).await.map_err(|e| match e {
            Error::HttpStatus { status, body } => Error::fetch(storage_id, Some(status), body),
            Error::RateLimited { .. } => Error::fetch(storage_id, Some(429), e.to_string()),
            other => Error::fetch(storage_id, None, other.to_string()),
        })
    }
}
