//! Pool REST client

use super::types::{BundlePage, PoolInfo, PoolResponse};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use std::collections::HashMap;
use tracing::debug;

/// Path prefix of the finalized bundle listing
pub const BUNDLES_PATH: &str = "/kyve/v1/bundles";

/// Path prefix of the pool query endpoint
pub const POOL_PATH: &str = "/kyve/query/v1beta1/pool";

/// Client for the pool endpoints under a chain REST base URL
#[derive(Debug, Clone)]
pub struct PoolApi {
    client: HttpClient,
    url_base: String,
}

impl PoolApi {
    /// Create a client for the given REST base URL
    pub fn new(client: HttpClient, url_base: impl Into<String>) -> Self {
        Self {
            client,
            url_base: url_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// REST base URL
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    /// URL of a pool's bundle listing
    pub fn bundles_url(&self, pool_id: u64) -> String {
        format!("{}{BUNDLES_PATH}/{pool_id}", self.url_base)
    }

    /// URL of a pool's metadata
    pub fn pool_url(&self, pool_id: u64) -> String {
        format!("{}{POOL_PATH}/{pool_id}", self.url_base)
    }

    /// Fetch one page of finalized bundles
    pub async fn list_bundles(
        &self,
        pool_id: u64,
        params: HashMap<String, String>,
    ) -> Result<BundlePage> {
        let url = self.bundles_url(pool_id);
        debug!(pool_id, ?params, "Listing bundles");
        let request = RequestConfig::new().queries(params);
        self.client.get_json_with_config(&url, &request).await
    }

    /// Fetch pool metadata
    pub async fn pool_info(&self, pool_id: u64) -> Result<PoolInfo> {
        let url = self.pool_url(pool_id);
        let response: PoolResponse = self.client.get_json(&url).await?;
        Ok(response.into())
    }
}
