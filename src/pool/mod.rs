//! Pool API module
//!
//! Typed access to the chain REST endpoints a pool stream reads from.
//!
//! # Overview
//!
//! - [`PoolApi::list_bundles`] - one page of finalized bundles
//!   (`GET /kyve/v1/bundles/{pool_id}`)
//! - [`PoolApi::pool_info`] - pool metadata, used for the runtime tag and
//!   connection checks (`GET /kyve/query/v1beta1/pool/{pool_id}`)

mod api;
mod types;

pub use api::{PoolApi, BUNDLES_PATH, POOL_PATH};
pub use types::{Bundle, BundlePage, PageInfo, PoolInfo};
