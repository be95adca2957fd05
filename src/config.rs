//! Configuration types for the KYVE source
//!
//! Source configuration (pools, endpoints, paging, HTTP behaviour) and the
//! catalog types exchanged with the orchestrator.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pagination::PaginationConfig;
use crate::storage::{StorageEndpoints, DEFAULT_GATEWAY_URL, DEFAULT_NATIVE_STORAGE_URL};
use crate::types::{BackoffType, DestinationSyncMode, FetchFailurePolicy, SyncMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Source Config
// ============================================================================

/// Configuration of the KYVE source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Chain REST endpoint (e.g. `https://api.kyve.network`)
    pub url_base: String,

    /// Comma-separated pool ids
    pub pool_ids: String,

    /// Comma-separated start offsets, one per pool; missing entries start at 0
    #[serde(default)]
    pub start_ids: String,

    /// Bundles per listing request
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum listing pages per sync
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Native storage provider endpoint
    #[serde(default = "default_native_storage_url")]
    pub native_storage_url: String,

    /// Decentralized-storage gateway endpoint
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// What to do when a bundle cannot be fetched
    #[serde(default)]
    pub on_fetch_error: FetchFailurePolicy,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_page_size() -> u32 {
    100
}

fn default_native_storage_url() -> String {
    DEFAULT_NATIVE_STORAGE_URL.to_string()
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

impl SourceConfig {
    /// Create a config for the given REST endpoint and pool ids
    pub fn new(url_base: impl Into<String>, pool_ids: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
            pool_ids: pool_ids.into(),
            start_ids: String::new(),
            page_size: default_page_size(),
            max_pages: None,
            native_storage_url: default_native_storage_url(),
            gateway_url: default_gateway_url(),
            on_fetch_error: FetchFailurePolicy::default(),
            http: HttpConfig::default(),
        }
    }

    /// Parse and validate from a JSON value
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone())
            .map_err(|e| Error::config(format!("Invalid source config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// JSON form, as handed to [`Connector`](crate::connector::Connector) methods
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check the configuration for values the source cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.url_base.trim().is_empty() {
            return Err(Error::missing_field("url_base"));
        }
        for (field, value) in [
            ("url_base", &self.url_base),
            ("native_storage_url", &self.native_storage_url),
            ("gateway_url", &self.gateway_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::invalid_value(field, format!("'{value}': {e}")))?;
        }

        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }
        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }

        let pools = self.pool_ids()?;
        if pools.is_empty() {
            return Err(Error::missing_field("pool_ids"));
        }
        let mut seen = HashSet::with_capacity(pools.len());
        if let Some(dup) = pools.iter().find(|pool| !seen.insert(**pool)) {
            return Err(Error::invalid_value(
                "pool_ids",
                format!("pool {dup} is listed more than once"),
            ));
        }
        let starts = self.start_ids()?;
        if starts.len() > pools.len() {
            return Err(Error::invalid_value(
                "start_ids",
                format!("{} start ids for {} pools", starts.len(), pools.len()),
            ));
        }
        Ok(())
    }

    /// Parsed pool ids
    pub fn pool_ids(&self) -> Result<Vec<u64>> {
        parse_id_list("pool_ids", &self.pool_ids)
    }

    /// Parsed start offsets
    pub fn start_ids(&self) -> Result<Vec<u64>> {
        parse_id_list("start_ids", &self.start_ids)
    }

    /// Pool ids paired with their start offsets
    pub fn pools(&self) -> Result<Vec<(u64, u64)>> {
        let starts = self.start_ids()?;
        Ok(self
            .pool_ids()?
            .into_iter()
            .enumerate()
            .map(|(i, pool)| (pool, starts.get(i).copied().unwrap_or(0)))
            .collect())
    }

    /// Pagination for a pool starting at `start_offset`
    pub fn pagination(&self, start_offset: u64) -> PaginationConfig {
        PaginationConfig::new(self.page_size)
            .with_max_pages(self.max_pages)
            .with_start_offset(start_offset)
    }

    /// Storage endpoints
    pub fn storage_endpoints(&self) -> StorageEndpoints {
        StorageEndpoints::new(&self.native_storage_url, &self.gateway_url)
    }

    /// HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.retry_backoff.backoff_type,
                Duration::from_millis(self.http.retry_backoff.initial_ms),
                Duration::from_millis(self.http.retry_backoff.max_ms),
            );

        match self.http.rate_limit.requests_per_second {
            0 => builder.no_rate_limit().build(),
            rps => builder
                .rate_limit(RateLimiterConfig::new(rps, self.http.rate_limit.burst_size.max(1)))
                .build(),
        }
    }

    /// JSON schema of the configuration, returned by `spec`
    pub fn spec_schema() -> serde_json::Value {
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "KYVE Source Spec",
            "type": "object",
            "required": ["url_base", "pool_ids"],
            "additionalProperties": true,
            "properties": {
                "url_base": {
                    "type": "string",
                    "title": "REST endpoint",
                    "description": "Chain REST endpoint the bundle listing is read from",
                    "default": "https://api.kyve.network",
                    "format": "uri"
                },
                "pool_ids": {
                    "type": "string",
                    "title": "Pool ids",
                    "description": "Comma-separated pool ids",
                    "examples": ["0", "0,1"],
                    "pattern": "^[0-9]+(\\s*,\\s*[0-9]+)*$"
                },
                "start_ids": {
                    "type": "string",
                    "title": "Start offsets",
                    "description": "Comma-separated bundle offsets to start each pool at",
                    "examples": ["0", "0,100"]
                },
                "page_size": {
                    "type": "integer",
                    "title": "Page size",
                    "minimum": 1,
                    "default": 100
                },
                "max_pages": {
                    "type": "integer",
                    "title": "Max pages",
                    "description": "Stop after this many listing pages per sync",
                    "minimum": 1
                },
                "native_storage_url": {
                    "type": "string",
                    "format": "uri",
                    "default": DEFAULT_NATIVE_STORAGE_URL
                },
                "gateway_url": {
                    "type": "string",
                    "format": "uri",
                    "default": DEFAULT_GATEWAY_URL
                },
                "on_fetch_error": {
                    "type": "string",
                    "enum": ["abort", "skip"],
                    "default": "abort"
                },
                "http": {
                    "type": "object",
                    "properties": {
                        "timeout_seconds": {"type": "integer", "default": 30},
                        "max_retries": {"type": "integer", "default": 5},
                        "retry_backoff": {"type": "object"},
                        "rate_limit": {"type": "object"}
                    }
                }
            }
        })
    }
}

fn parse_id_list(field: &str, raw: &str) -> Result<Vec<u64>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u64>()
                .map_err(|_| Error::invalid_value(field, format!("'{part}' is not a non-negative integer")))
        })
        .collect()
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit (0 disables limiting)
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default = "default_rps")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst_size: default_rps(),
        }
    }
}

fn default_rps() -> u32 {
    10
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Discovered catalog (available streams)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Available streams
    pub streams: Vec<CatalogStream>,
}

/// Stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStream {
    /// Stream name
    pub name: String,

    /// JSON schema for the stream
    #[serde(default)]
    pub json_schema: serde_json::Value,

    /// Supported sync modes
    #[serde(default)]
    pub supported_sync_modes: Vec<SyncMode>,

    /// Default cursor field
    #[serde(default)]
    pub default_cursor_field: Option<Vec<String>>,

    /// Source-defined primary key
    #[serde(default)]
    pub source_defined_primary_key: Option<Vec<Vec<String>>>,
}

/// Configured catalog (selected streams for sync)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Selected streams
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Select every stream of a catalog with the given sync mode
    pub fn from_catalog(catalog: &Catalog, sync_mode: SyncMode) -> Self {
        Self {
            streams: catalog
                .streams
                .iter()
                .map(|stream| ConfiguredStream {
                    cursor_field: stream.default_cursor_field.clone(),
                    stream: stream.clone(),
                    sync_mode,
                    destination_sync_mode: DestinationSyncMode::Append,
                    primary_key: None,
                })
                .collect(),
        }
    }

    /// Keep only the named streams
    #[must_use]
    pub fn select(mut self, names: &[String]) -> Self {
        self.streams.retain(|s| names.contains(&s.stream.name));
        self
    }

    /// Look up a configured stream by name
    pub fn get(&self, name: &str) -> Option<&ConfiguredStream> {
        self.streams.iter().find(|s| s.stream.name == name)
    }
}

/// Configured stream for sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// Stream reference
    pub stream: CatalogStream,

    /// Selected sync mode
    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Destination sync mode
    #[serde(default)]
    pub destination_sync_mode: DestinationSyncMode,

    /// Cursor field to use
    #[serde(default)]
    pub cursor_field: Option<Vec<String>>,

    /// Primary key to use
    #[serde(default)]
    pub primary_key: Option<Vec<Vec<String>>>,
}
