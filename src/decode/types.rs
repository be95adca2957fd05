//! Decoder types
//!
//! Records carried inside bundle payloads.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single key/value item from a bundle payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Item key (block height, slot, ...)
    #[serde(deserialize_with = "deserialize_key")]
    pub key: i64,
    /// Item payload
    pub value: Value,
}

impl Record {
    /// Create a record
    pub fn new(key: i64, value: Value) -> Self {
        Self { key, value }
    }

    /// JSON form as emitted downstream
    pub fn to_json(&self) -> Value {
        serde_json::json!({ "key": self.key, "value": self.value })
    }
}

/// Records of one bundle, consumed once
pub type RecordIter = std::vec::IntoIter<Record>;

/// JSON schema of emitted records
pub fn record_schema() -> Value {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "properties": {
            "key": { "type": "integer" },
            "value": { "type": "object" }
        },
        "required": ["key", "value"]
    })
}

/// Accept the key as a JSON integer or a decimal string
fn deserialize_key<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct KeyVisitor;

    impl Visitor<'_> for KeyVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or a decimal string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("key {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("key '{v}' is not an integer")))
        }
    }

    deserializer.deserialize_any(KeyVisitor)
}
