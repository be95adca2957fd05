//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name of the field holding a stream's cursor in persisted state
pub const CURSOR_FIELD: &str = "offset";

/// Position a pool stream resumes from
///
/// Serialized untagged: a bundle id is a JSON string, a raw offset a JSON
/// number, both under the `offset` field of the stream state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorState {
    /// Raw listing offset, before any bundle has been processed
    Offset(u64),
    /// Id of the last bundle processed
    BundleId(String),
}

impl CursorState {
    /// Offset the next listing request starts at
    ///
    /// Bundle ids are the bundles' listing positions, so a bundle-id cursor
    /// resumes right after the last bundle handled.
    pub fn resume_offset(&self) -> Result<u64> {
        match self {
            Self::Offset(offset) => Ok(*offset),
            Self::BundleId(id) => {
                let last: u64 = id.parse().map_err(|e| {
                    Error::state(format!("Bundle id '{id}' is not a valid offset: {e}"))
                })?;
                last.checked_add(1)
                    .ok_or_else(|| Error::state(format!("Bundle id '{id}' is the last offset")))
            }
        }
    }

    /// The bundle id, if this is the bundle-id form
    pub fn bundle_id(&self) -> Option<&str> {
        match self {
            Self::BundleId(id) => Some(id),
            Self::Offset(_) => None,
        }
    }

    /// Check if this is the bundle-id form
    pub fn is_bundle_id(&self) -> bool {
        matches!(self, Self::BundleId(_))
    }
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(offset) => write!(f, "{offset}"),
            Self::BundleId(id) => write!(f, "{id}"),
        }
    }
}

/// Capability of a stream whose position can be saved and restored
pub trait StatefulCursor {
    /// Current cursor position
    fn state(&self) -> CursorState;

    /// Install a previously saved position
    fn set_state(&mut self, state: CursorState) -> Result<()>;
}

/// Complete state for a connector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get cursor for a stream
    pub fn get_cursor(&self, stream: &str) -> Option<&CursorState> {
        self.streams.get(stream).map(|s| &s.cursor)
    }

    /// Set cursor for a stream
    pub fn set_cursor(&mut self, stream: &str, cursor: CursorState) {
        self.streams
            .insert(stream.to_string(), StreamState::new(cursor));
    }
}

/// State for a single stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Current cursor value
    #[serde(rename = "offset")]
    pub cursor: CursorState,
}

impl StreamState {
    /// Create a stream state at the given cursor
    pub fn new(cursor: CursorState) -> Self {
        Self { cursor }
    }

    /// JSON form as persisted and emitted in state messages
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ CURSOR_FIELD: self.cursor })
    }
}
