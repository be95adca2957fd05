//! Pool stream types

use crate::decode::Record;
use crate::pagination::PaginationConfig;
use crate::state::CursorState;
use crate::types::FetchFailurePolicy;

/// Stream name for a pool
pub fn stream_name(pool_id: u64) -> String {
    format!("pool_{pool_id}")
}

/// Configuration of one pool stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStreamConfig {
    /// Pool id
    pub pool_id: u64,
    /// Runtime tag of the pool, when known
    pub runtime: Option<String>,
    /// Page size, ceiling and start offset
    pub pagination: PaginationConfig,
    /// Policy for bundles the storage provider fails to serve
    pub on_fetch_error: FetchFailurePolicy,
}

impl PoolStreamConfig {
    /// Create a config with default pagination for a pool
    pub fn new(pool_id: u64) -> Self {
        Self {
            pool_id,
            runtime: None,
            pagination: PaginationConfig::default(),
            on_fetch_error: FetchFailurePolicy::default(),
        }
    }

    /// Set the runtime tag
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Set pagination
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set the fetch failure policy
    #[must_use]
    pub fn with_fetch_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.on_fetch_error = policy;
        self
    }

    /// Stream name
    pub fn name(&self) -> String {
        stream_name(self.pool_id)
    }
}

/// Item produced by pulling a pool stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A record extracted from a bundle
    Record(Record),
    /// Every bundle of a non-empty page has been handled and the cursor
    /// moved to the page's last bundle
    PageComplete(CursorState),
}

/// Counters for one pool stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Listing responses received
    pub pages_fetched: u64,
    /// Bundles fetched, verified and decoded
    pub bundles_processed: u64,
    /// Bundles skipped (fetch policy, malformed payload)
    pub bundles_skipped: u64,
    /// Records handed to the consumer
    pub records_emitted: u64,
}
