//! Pool API response types

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor of one finalized bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Bundle id, sequential within the pool
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Id of the payload at the storage provider
    pub storage_id: String,
    /// Storage provider the payload was uploaded to
    #[serde(deserialize_with = "string_or_number")]
    pub storage_provider_id: String,
    /// Hex SHA-256 of the raw (compressed) payload
    pub data_hash: String,
}

/// Continuation info of a listing response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Opaque continuation key; absent or empty on the last page
    #[serde(default)]
    pub next_key: Option<String>,
    /// Total number of bundles, when the endpoint reports it
    #[serde(default)]
    pub total: Option<String>,
}

/// One page of the bundle listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlePage {
    /// Bundles in listing order
    #[serde(default)]
    pub finalized_bundles: Vec<Bundle>,
    /// Continuation info
    #[serde(default)]
    pub pagination: Option<PageInfo>,
}

impl BundlePage {
    /// Continuation key, if the response carries a non-empty one
    pub fn next_key(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.next_key.as_deref())
            .filter(|key| !key.is_empty())
    }

    /// Whether the page holds no bundles
    pub fn is_empty(&self) -> bool {
        self.finalized_bundles.is_empty()
    }
}

/// Pool metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool id
    pub id: String,
    /// Pool name
    pub name: Option<String>,
    /// Runtime tag (e.g. `@kyvejs/tendermint`)
    pub runtime: String,
}

#[derive(Deserialize)]
pub(crate) struct PoolResponse {
    pub pool: RawPool,
}

#[derive(Deserialize)]
pub(crate) struct RawPool {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub data: RawPoolData,
}

#[derive(Deserialize)]
pub(crate) struct RawPoolData {
    #[serde(default)]
    pub name: Option<String>,
    pub runtime: String,
}

impl From<PoolResponse> for PoolInfo {
    fn from(response: PoolResponse) -> Self {
        Self {
            id: response.pool.id,
            name: response.pool.data.name.filter(|n| !n.is_empty()),
            runtime: response.pool.data.runtime,
        }
    }
}

/// Ids are strings on the REST gateway but numbers in some fixtures
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or an unsigned integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
