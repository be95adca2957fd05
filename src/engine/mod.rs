//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Drives pool streams one after another, yielding messages lazily
//! - `SyncConfig` - Configuration for sync operations
//! - Message types for output (Record, State, Log)

mod types;

pub use types::{Message, SyncConfig, SyncStats};

use crate::error::{Error, Result};
use crate::state::{StateManager, StatefulCursor, StreamState};
use crate::stream::{PoolStream, StreamEvent};
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Instant;
use tracing::{error, info};

/// Stream of sync messages
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

struct ActiveStream {
    name: String,
    stream: PoolStream,
    records: usize,
}

/// Sync engine for orchestrating data extraction
///
/// Pool streams run sequentially. Each record is handed out as soon as the
/// underlying stream yields it; the stream's cursor is persisted after each
/// page (when configured) and at the end of the stream.
pub struct SyncEngine {
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
    queue: VecDeque<PoolStream>,
    active: Option<ActiveStream>,
    outbox: VecDeque<Message>,
    failure: Option<Error>,
    started: Option<Instant>,
    finished: bool,
}

impl SyncEngine {
    /// Create a new sync engine over the given streams
    pub fn new(state: StateManager, streams: Vec<PoolStream>) -> Self {
        Self {
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
            queue: streams.into(),
            active: None,
            outbox: VecDeque::new(),
            failure: None,
            started: None,
            finished: false,
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Pull the next message
    ///
    /// Returns `Ok(None)` when every stream is done. A fatal error is
    /// preceded by an error log message and ends the sync.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(message) = self.outbox.pop_front() {
                return Ok(Some(message));
            }
            if let Some(e) = self.failure.take() {
                self.finished = true;
                return Err(e);
            }
            if self.finished {
                return Ok(None);
            }
            self.started.get_or_insert_with(Instant::now);

            let Some(active) = self.active.as_mut() else {
                match self.queue.pop_front() {
                    Some(stream) => self.start_stream(stream),
                    None => self.finish(),
                }
                continue;
            };

            if self.config.max_records > 0 && active.records >= self.config.max_records {
                self.outbox.push_back(Message::info(format!(
                    "Reached max_records ({}) for {}",
                    self.config.max_records, active.name
                )));
                self.finish_stream().await?;
                continue;
            }

            match active.stream.next_event().await {
                Ok(Some(StreamEvent::Record(record))) => {
                    active.records += 1;
                    self.stats.add_record();
                    return Ok(Some(Message::record(active.name.clone(), record)));
                }
                Ok(Some(StreamEvent::PageComplete(cursor))) => {
                    if self.config.emit_state_per_page {
                        let name = active.name.clone();
                        self.state.set_cursor(&name, cursor.clone()).await?;
                        self.outbox
                            .push_back(Message::state(name, StreamState::new(cursor).to_json()));
                    }
                }
                Ok(None) => self.finish_stream().await?,
                Err(e) => self.fail_stream(e),
            }
        }
    }

    /// Drive the sync to the end, collecting every message
    pub async fn run(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message().await? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Turn the engine into a lazy message stream
    pub fn into_stream(self) -> MessageStream {
        Box::pin(futures::stream::unfold(Some(self), |engine| async move {
            let mut engine = engine?;
            match engine.next_message().await {
                Ok(Some(message)) => Some((Ok(message), Some(engine))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }))
    }

    fn start_stream(&mut self, stream: PoolStream) {
        let name = stream.name();
        info!(stream = %name, state = %stream.state(), "Starting stream");
        self.outbox.push_back(Message::info(format!(
            "Starting sync for stream: {name}"
        )));
        self.active = Some(ActiveStream {
            name,
            stream,
            records: 0,
        });
    }

    async fn finish_stream(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        let cursor = active.stream.state();
        let stats = active.stream.stats();

        self.state.set_cursor(&active.name, cursor.clone()).await?;
        self.stats.add_stream(&stats);

        info!(
            stream = %active.name,
            records = active.records,
            pages = stats.pages_fetched,
            skipped = stats.bundles_skipped,
            cursor = %cursor,
            "Stream complete"
        );
        self.outbox.push_back(Message::state(
            active.name.clone(),
            StreamState::new(cursor).to_json(),
        ));
        self.outbox.push_back(Message::info(format!(
            "Completed sync for {}: {} records in {} pages ({} bundles skipped)",
            active.name, active.records, stats.pages_fetched, stats.bundles_skipped
        )));
        Ok(())
    }

    fn fail_stream(&mut self, e: Error) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.stats.add_error();
        error!(stream = %active.name, error = %e, "Stream failed");
        self.outbox.push_back(Message::error(format!(
            "Error syncing stream {}: {e}",
            active.name
        )));

        if self.config.fail_fast || matches!(e, Error::Integrity { .. }) {
            self.queue.clear();
            self.failure = Some(e);
        }
    }

    fn finish(&mut self) {
        let elapsed = self.started.map_or(0, |s| s.elapsed().as_millis() as u64);
        self.stats.set_duration(elapsed);
        self.outbox.push_back(Message::info(format!(
            "Sync complete: {} records from {} streams ({} failed)",
            self.stats.records_synced, self.stats.streams_synced, self.stats.errors
        )));
        self.finished = true;
    }
}
