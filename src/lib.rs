// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # KYVE Source
//!
//! Incremental source connector for KYVE data pools. Pages through the
//! finalized bundles of a pool, fetches each bundle from its storage
//! provider, verifies its sha256 against the on-chain hash, inflates it and
//! emits one record per data item.
//!
//! ## Features
//!
//! - **Offset Pagination**: `pagination.offset`/`pagination.limit` with an optional page ceiling
//! - **Resumable Cursors**: state is the last fully-processed bundle id
//! - **Integrity Checks**: sha256 of the downloaded bytes must match the bundle hash
//! - **Storage Routing**: KYVE storage or Arweave gateway by provider id
//! - **Parquet Output**: optional Arrow/Parquet files, one per pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use kyve_source::{Connector, ConfiguredCatalog, KyveSource, SyncMode};
//!
//! #[tokio::main]
//! async fn main() -> kyve_source::Result<()> {
//!     let source = KyveSource::new();
//!     let config = serde_json::json!({
//!         "url_base": "https://api.kyve.network",
//!         "pool_ids": "0,1",
//!         "start_ids": "0,0"
//!     });
//!
//!     let catalog = source.discover(&config).await?;
//!     let catalog = ConfiguredCatalog::from_catalog(&catalog, SyncMode::Incremental);
//!
//!     let mut messages = source.read(&config, &catalog, None).await?;
//!     while let Some(msg) = messages.next().await {
//!         println!("{}", msg?.to_protocol_json());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Connector Interface                         │
//! │  spec() → ConnectorSpec  check() → Status  discover() → Catalog │
//! │  read(catalog, state) → Stream<Message>                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Pool   │  Storage  │   Paginate    │  Decode   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Bundles  │ Fetch     │ Offset        │ Gzip      │ JSON lines  │
//! │ Pool info│ sha256    │ Page ceiling  │ Items     │ Parquet     │
//! │          │ Routing   │ Resume        │ Records   │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry and rate limiting
pub mod http;

/// Offset pagination
pub mod pagination;

/// KYVE chain API (pools and finalized bundles)
pub mod pool;

/// Bundle storage fetch and integrity verification
pub mod storage;

/// Bundle decompression and record extraction
pub mod decode;

/// State management and checkpointing
pub mod state;

/// Per-pool record streams
pub mod stream;

/// Arrow/Parquet output
pub mod output;

/// Main execution engine
pub mod engine;

/// Configuration and catalogs
pub mod config;

/// Connector trait and the KYVE source
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{Catalog, ConfiguredCatalog, SourceConfig};
pub use connector::{CheckResult, Connector, ConnectorSpec, KyveSource};
pub use engine::{Message, SyncConfig, SyncEngine};
pub use state::{CursorState, StateManager};
pub use stream::{PoolStream, PoolStreamConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
