//! Connector trait and the KYVE source
//!
//! Defines the core Connector trait (spec, check, discover, read) and the
//! KYVE implementation, which exposes one incremental stream per pool.

use crate::config::{Catalog, CatalogStream, ConfiguredCatalog, SourceConfig};
use crate::decode::record_schema;
use crate::engine::{MessageStream, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pool::PoolApi;
use crate::state::{State, StateManager, StatefulCursor, CURSOR_FIELD};
use crate::storage::ContentFetcher;
use crate::stream::{stream_name, PoolStream, PoolStreamConfig};
use crate::types::SyncMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

// ============================================================================
// Connector Spec
// ============================================================================

/// Connector specification returned by spec()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSpec {
    /// Connector name
    pub name: String,

    /// Human-readable title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// JSON schema of the connector configuration
    pub connection_specification: Value,

    /// Whether the connector supports incremental syncs
    pub supports_incremental: bool,
}

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Connector Trait
// ============================================================================

/// Core trait that connectors implement
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector specification
    fn spec(&self) -> ConnectorSpec;

    /// Tests if the configuration is valid and the upstream reachable
    async fn check(&self, config: &Value) -> Result<CheckResult>;

    /// Lists available streams
    async fn discover(&self, config: &Value) -> Result<Catalog>;

    /// Reads data from selected streams
    ///
    /// Returns a stream of messages (records, state checkpoints, logs)
    async fn read(
        &self,
        config: &Value,
        catalog: &ConfiguredCatalog,
        state: Option<&State>,
    ) -> Result<MessageStream>;
}

// ============================================================================
// KYVE Source
// ============================================================================

/// Source reading finalized bundles of KYVE data pools
#[derive(Debug, Clone, Default)]
pub struct KyveSource {
    sync_config: SyncConfig,
}

impl KyveSource {
    /// Create a source with the default sync configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sync configuration used by `read`
    #[must_use]
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Catalog entry of a pool stream
    pub fn catalog_stream(pool_id: u64) -> CatalogStream {
        CatalogStream {
            name: stream_name(pool_id),
            json_schema: record_schema(),
            supported_sync_modes: vec![SyncMode::FullRefresh, SyncMode::Incremental],
            default_cursor_field: Some(vec![CURSOR_FIELD.to_string()]),
            source_defined_primary_key: None,
        }
    }

    /// Build the sync engine for the selected streams
    ///
    /// Incremental streams resume from the cursor held by `state`; full
    /// refresh streams start at their configured offset. Cursor updates
    /// go to the same state manager.
    pub async fn build_engine(
        &self,
        config: &SourceConfig,
        catalog: &ConfiguredCatalog,
        state: StateManager,
    ) -> Result<SyncEngine> {
        config.validate()?;
        let client = HttpClient::with_config(config.http_client_config())?;
        let api = PoolApi::new(client.clone(), &config.url_base);
        let fetcher = ContentFetcher::new(client, config.storage_endpoints());
        let starts: HashMap<u64, u64> = config.pools()?.into_iter().collect();

        let mut streams = Vec::with_capacity(catalog.streams.len());
        for configured in &catalog.streams {
            let name = &configured.stream.name;
            let pool_id = starts
                .keys()
                .copied()
                .find(|id| stream_name(*id) == *name)
                .ok_or_else(|| Error::StreamNotFound {
                    stream: name.clone(),
                })?;

            let mut stream_config = PoolStreamConfig::new(pool_id)
                .with_pagination(config.pagination(starts[&pool_id]))
                .with_fetch_policy(config.on_fetch_error);
            match api.pool_info(pool_id).await {
                Ok(info) => stream_config = stream_config.with_runtime(info.runtime),
                Err(e) => warn!(pool = pool_id, error = %e, "Could not resolve pool runtime"),
            }

            let mut stream = PoolStream::new(stream_config, api.clone(), fetcher.clone());
            if configured.sync_mode == SyncMode::Incremental {
                if let Some(cursor) = state.get_cursor(name).await {
                    info!(stream = %name, %cursor, "Resuming from saved state");
                    stream.set_state(cursor)?;
                }
            }
            streams.push(stream);
        }

        Ok(SyncEngine::new(state, streams).with_config(self.sync_config.clone()))
    }
}

#[async_trait]
impl Connector for KyveSource {
    fn spec(&self) -> ConnectorSpec {
        ConnectorSpec {
            name: env!("CARGO_PKG_NAME").to_string(),
            title: "KYVE".to_string(),
            description: Some(
                "Reads validated, hash-checked data bundles of KYVE pools".to_string(),
            ),
            connection_specification: SourceConfig::spec_schema(),
            supports_incremental: true,
        }
    }

    async fn check(&self, config: &Value) -> Result<CheckResult> {
        let config = match SourceConfig::from_value(config) {
            Ok(config) => config,
            Err(e) => return Ok(CheckResult::failure(e.to_string())),
        };
        let client = HttpClient::with_config(config.http_client_config())?;
        let api = PoolApi::new(client, &config.url_base);

        for pool_id in config.pool_ids()? {
            match api.pool_info(pool_id).await {
                Ok(info) => info!(pool = pool_id, runtime = %info.runtime, "Pool reachable"),
                Err(e) => {
                    return Ok(CheckResult::failure(format!(
                        "Pool {pool_id} could not be read: {e}"
                    )))
                }
            }
        }
        Ok(CheckResult::success())
    }

    async fn discover(&self, config: &Value) -> Result<Catalog> {
        let config = SourceConfig::from_value(config)?;
        let streams = config
            .pool_ids()?
            .into_iter()
            .map(Self::catalog_stream)
            .collect();
        Ok(Catalog { streams })
    }

    async fn read(
        &self,
        config: &Value,
        catalog: &ConfiguredCatalog,
        state: Option<&State>,
    ) -> Result<MessageStream> {
        let config = SourceConfig::from_value(config)?;
        let state = StateManager::from_state(state.cloned().unwrap_or_default());
        let engine = self.build_engine(&config, catalog, state).await?;
        Ok(engine.into_stream())
    }
}
