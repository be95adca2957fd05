//! State manager implementation
//!
//! Holds the per-stream cursors of a sync and, when backed by a file,
//! writes them out after every change (temp file, then rename).

use super::types::{CursorState, State};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backing {
    Memory,
    File(PathBuf),
}

/// Shared cursor store; clones see the same state
#[derive(Debug, Clone)]
pub struct StateManager {
    backing: Backing,
    state: Arc<RwLock<State>>,
}

impl StateManager {
    /// File-backed manager starting empty; call [`load`](Self::load) to read the file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_backing(Backing::File(path.as_ref().to_path_buf()), State::new())
    }

    /// Manager without persistence
    pub fn in_memory() -> Self {
        Self::from_state(State::new())
    }

    /// In-memory manager holding the given state
    pub fn from_state(state: State) -> Self {
        Self::with_backing(Backing::Memory, state)
    }

    /// In-memory manager seeded from inline JSON (blank input means no state)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_state(parse_state(json)?))
    }

    /// File-backed manager, reading the file when it already exists
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            parse_state(&contents)?
        } else {
            State::new()
        };
        Ok(Self::with_backing(Backing::File(path), state))
    }

    fn with_backing(backing: Backing, state: State) -> Self {
        Self {
            backing,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(path) => Some(path),
            Backing::Memory => None,
        }
    }

    /// Whether the state lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.backing == Backing::Memory
    }

    /// Replace the in-memory state with the backing file's contents
    ///
    /// A missing file leaves the state untouched.
    pub async fn load(&self) -> Result<()> {
        let Some(path) = self.path().filter(|p| p.exists()) else {
            return Ok(());
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
        *self.state.write().await = parse_state(&contents)?;
        Ok(())
    }

    /// Write the state to the backing file (no-op in memory)
    pub async fn save(&self) -> Result<()> {
        match &self.backing {
            Backing::File(path) => self.save_to_file(path).await,
            Backing::Memory => Ok(()),
        }
    }

    /// Write the state to an arbitrary file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = self.to_json_pretty().await?;
        write_atomic(path.as_ref(), &contents).await
    }

    /// Read access to the current state
    pub async fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().await
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Compact JSON form of the state
    pub async fn to_json(&self) -> Result<String> {
        serde_json::to_string(&*self.state.read().await)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Pretty-printed JSON form of the state
    pub async fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.state.read().await)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Cursor stored for a stream
    pub async fn get_cursor(&self, stream: &str) -> Option<CursorState> {
        self.state.read().await.get_cursor(stream).cloned()
    }

    /// Store a stream's cursor
    pub async fn set_cursor(&self, stream: &str, cursor: CursorState) -> Result<()> {
        self.state.write().await.set_cursor(stream, cursor);
        self.save().await
    }

    /// Drop every stream's cursor
    pub async fn clear(&self) -> Result<()> {
        *self.state.write().await = State::new();
        self.save().await
    }

    /// Drop one stream's cursor
    pub async fn clear_stream(&self, stream: &str) -> Result<()> {
        self.state.write().await.streams.remove(stream);
        self.save().await
    }
}

fn parse_state(contents: &str) -> Result<State> {
    if contents.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(contents).map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}

async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))
}
