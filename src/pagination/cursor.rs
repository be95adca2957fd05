//! Offset cursor for the bundle listing

use super::types::{
    NextPage, PaginationConfig, PaginationState, LIMIT_PARAM, OFFSET_PARAM, TOKEN_PARAM,
};
use std::collections::HashMap;
use tracing::debug;

/// Offset-based pagination with a continuation key and an optional ceiling
///
/// The offset only ever moves forward by one page size per response that
/// carries a non-empty continuation key. Once the offset has reached
/// `max_pages * page_size` no further page is requested, whatever the
/// response says.
#[derive(Debug, Clone)]
pub struct OffsetCursor {
    config: PaginationConfig,
    state: PaginationState,
}

impl OffsetCursor {
    /// Create a cursor positioned at the configured start offset (or 0)
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            state: PaginationState::at_offset(config.start_offset.unwrap_or(0)),
            config,
        }
    }

    /// Reposition the cursor at an offset derived from stored state
    pub fn resume(&mut self, offset: u64) {
        self.state = PaginationState::at_offset(offset);
    }

    /// Query parameters for the next request
    pub fn request_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(LIMIT_PARAM.to_string(), self.config.page_size.to_string());
        params.insert(OFFSET_PARAM.to_string(), self.state.offset.to_string());
        if let Some(token) = &self.state.next_token {
            params.insert(TOKEN_PARAM.to_string(), token.clone());
        }
        params
    }

    /// Process the continuation key of a response
    pub fn advance(&mut self, next_key: Option<&str>) -> NextPage {
        if self.state.done {
            return NextPage::Done;
        }
        self.state.pages_fetched += 1;

        if let Some(ceiling) = self.config.ceiling() {
            if self.state.offset >= ceiling {
                debug!(offset = self.state.offset, ceiling, "Page ceiling reached");
                self.state.mark_done();
                return NextPage::Done;
            }
        }

        match next_key.filter(|key| !key.is_empty()) {
            Some(key) => {
                self.state.offset += u64::from(self.config.page_size);
                self.state.next_token = Some(key.to_string());
                NextPage::Continue {
                    token: key.to_string(),
                    offset: self.state.offset,
                }
            }
            None => {
                self.state.mark_done();
                NextPage::Done
            }
        }
    }

    /// Offset of the next request
    pub fn offset(&self) -> u64 {
        self.state.offset
    }

    /// Whether pagination has finished
    pub fn is_done(&self) -> bool {
        self.state.done
    }

    /// Current pagination state
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Pagination configuration
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }
}
