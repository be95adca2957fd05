//! Incremental reader over one pool's finalized bundles

use super::types::{PoolStreamConfig, StreamEvent, StreamStats};
use crate::decode::{BundleDecoder, Record, RecordIter};
use crate::error::Result;
use crate::pagination::{NextPage, OffsetCursor, Paginated};
use crate::pool::{Bundle, BundlePage, PoolApi};
use crate::state::{CursorState, StatefulCursor};
use crate::storage::{ContentFetcher, IntegrityVerifier};
use crate::types::FetchFailurePolicy;
use futures::Stream;
use std::collections::HashMap;
use std::collections::VecDeque;
use tracing::{debug, info_span, warn, Instrument, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// A listing request is due (or the current page is being drained)
    Requesting,
    /// Pagination finished normally
    Done,
    /// An unrecoverable error ended the stream
    Aborted,
}

/// Pull-based record stream for one pool
///
/// Pages are requested one at a time and every bundle of a page is fully
/// processed (fetch, verify, decompress, extract) before the next one is
/// started. The cursor moves to a page's last bundle id once all of its
/// bundles have been handled, and the decision whether to request another
/// page is taken at that point.
pub struct PoolStream {
    config: PoolStreamConfig,
    api: PoolApi,
    fetcher: ContentFetcher,
    verifier: IntegrityVerifier,
    decoder: BundleDecoder,
    paginator: OffsetCursor,
    cursor: Option<String>,
    phase: Phase,
    /// Response whose bundles are being drained; bundles already moved out
    page: Option<BundlePage>,
    page_tail: Option<String>,
    pending: VecDeque<Bundle>,
    current: Option<RecordIter>,
    stats: StreamStats,
    span: Span,
}

impl PoolStream {
    /// Create a stream positioned at the configured start offset
    pub fn new(config: PoolStreamConfig, api: PoolApi, fetcher: ContentFetcher) -> Self {
        let span = info_span!(
            "pool_stream",
            pool = config.pool_id,
            runtime = config.runtime.as_deref().unwrap_or("unknown")
        );
        Self {
            paginator: OffsetCursor::new(config.pagination),
            config,
            api,
            fetcher,
            verifier: IntegrityVerifier::new(),
            decoder: BundleDecoder::new(),
            cursor: None,
            phase: Phase::Requesting,
            page: None,
            page_tail: None,
            pending: VecDeque::new(),
            current: None,
            stats: StreamStats::default(),
            span,
        }
    }

    /// Stream name (`pool_{id}`)
    pub fn name(&self) -> String {
        self.config.name()
    }

    /// Stream configuration
    pub fn config(&self) -> &PoolStreamConfig {
        &self.config
    }

    /// Counters so far
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Whether the stream has nothing more to yield
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Aborted)
    }

    /// Pull the next record or page boundary
    ///
    /// Returns `Ok(None)` once pagination is done. An error ends the
    /// stream; later calls return `Ok(None)`.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        let span = self.span.clone();
        let result = self.advance().instrument(span).await;
        if result.is_err() {
            self.phase = Phase::Aborted;
            self.pending.clear();
            self.current = None;
            self.page = None;
            self.page_tail = None;
        }
        result
    }

    /// Pull the next record, passing over page boundaries
    pub async fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            match self.next_event().await? {
                Some(StreamEvent::Record(record)) => return Ok(Some(record)),
                Some(StreamEvent::PageComplete(_)) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Lazy record stream; ends after the first error
    pub fn into_records(self) -> impl Stream<Item = Result<Record>> + Send {
        futures::stream::unfold(Some(self), |stream| async move {
            let mut stream = stream?;
            match stream.next_record().await {
                Ok(Some(record)) => Some((Ok(record), Some(stream))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn advance(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if self.phase != Phase::Requesting {
                return Ok(None);
            }

            if let Some(records) = self.current.as_mut() {
                if let Some(record) = records.next() {
                    self.stats.records_emitted += 1;
                    return Ok(Some(StreamEvent::Record(record)));
                }
                self.current = None;
            }

            if let Some(bundle) = self.pending.pop_front() {
                self.current = self.process_bundle(&bundle).await?;
                continue;
            }

            if let Some(page) = self.page.take() {
                let next = self.next_page_token(&page);
                if next.is_done() {
                    self.phase = Phase::Done;
                }
                if let Some(last) = self.page_tail.take() {
                    debug!(bundle_id = %last, "Page complete, cursor updated");
                    self.cursor = Some(last);
                    return Ok(Some(StreamEvent::PageComplete(self.state())));
                }
                continue;
            }

            self.request_page().await?;
        }
    }

    async fn request_page(&mut self) -> Result<()> {
        let params = self.next_request_params();
        debug!(offset = self.paginator.offset(), "Requesting bundle page");

        let mut page = self.api.list_bundles(self.config.pool_id, params).await?;
        self.stats.pages_fetched += 1;

        let bundles = std::mem::take(&mut page.finalized_bundles);
        debug!(bundles = bundles.len(), next_key = ?page.next_key(), "Received bundle page");

        self.page_tail = bundles.last().map(|b| b.id.clone());
        self.pending.extend(bundles);
        self.page = Some(page);
        Ok(())
    }

    /// Fetch, verify and decode one bundle
    ///
    /// `Ok(None)` means the bundle was skipped.
    async fn process_bundle(&mut self, bundle: &Bundle) -> Result<Option<RecordIter>> {
        let raw = match self
            .fetcher
            .fetch(&bundle.storage_id, &bundle.storage_provider_id)
            .await
        {
            Ok(raw) => raw,
            Err(e) => match self.config.on_fetch_error {
                FetchFailurePolicy::Abort => return Err(e),
                FetchFailurePolicy::Skip => {
                    warn!(bundle_id = %bundle.id, storage_id = %bundle.storage_id, error = %e, "Skipping bundle that could not be fetched");
                    self.stats.bundles_skipped += 1;
                    return Ok(None);
                }
            },
        };

        self.verifier.ensure(&bundle.id, &raw, &bundle.data_hash)?;

        match self.decoder.decode(&bundle.storage_id, &raw) {
            Ok(records) => {
                self.stats.bundles_processed += 1;
                Ok(Some(records))
            }
            Err(e) if e.is_recoverable() => {
                warn!(bundle_id = %bundle.id, storage_id = %bundle.storage_id, error = %e, "Skipping malformed bundle");
                self.stats.bundles_skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Paginated for PoolStream {
    type Response = BundlePage;

    fn next_request_params(&self) -> HashMap<String, String> {
        self.paginator.request_params()
    }

    fn next_page_token(&mut self, response: &BundlePage) -> NextPage {
        self.paginator.advance(response.next_key())
    }
}

impl StatefulCursor for PoolStream {
    fn state(&self) -> CursorState {
        match &self.cursor {
            Some(id) => CursorState::BundleId(id.clone()),
            None => CursorState::Offset(self.paginator.offset()),
        }
    }

    fn set_state(&mut self, state: CursorState) -> Result<()> {
        let offset = state.resume_offset()?;
        debug!(parent: &self.span, %state, offset, "Resuming from stored state");
        self.paginator.resume(offset);
        self.cursor = state.bundle_id().map(str::to_string);
        Ok(())
    }
}

impl std::fmt::Debug for PoolStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolStream")
            .field("pool_id", &self.config.pool_id)
            .field("phase", &self.phase)
            .field("cursor", &self.cursor)
            .field("offset", &self.paginator.offset())
            .field("stats", &self.stats)
            .finish()
    }
}
