//! State management module
//!
//! Handles cursor tracking, checkpointing, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `CursorState` - Position of a pool stream (last bundle id or raw offset)
//! - `StatefulCursor` - Capability of streams that can save and restore it
//! - `State` - Per-stream cursors as persisted between runs
//! - `StateManager` - File-based state persistence

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{CursorState, State, StatefulCursor, StreamState, CURSOR_FIELD};

#[cfg(test)]
mod manager_tests;
