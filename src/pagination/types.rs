//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by the bundle listing.

use std::collections::HashMap;

/// Query parameter carrying the page size
pub const LIMIT_PARAM: &str = "pagination.limit";

/// Query parameter carrying the offset of the first bundle in the page
pub const OFFSET_PARAM: &str = "pagination.offset";

/// Query parameter echoing the continuation token of the previous page
pub const TOKEN_PARAM: &str = "next_page_token";

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available
    Continue {
        /// Continuation token returned by the previous response
        token: String,
        /// Offset the next request starts at
        offset: u64,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }

    /// The continuation token, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Continue { token, .. } => Some(token),
            Self::Done => None,
        }
    }
}

/// Configuration for pagination behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Number of bundles per page
    pub page_size: u32,
    /// Maximum number of pages to fetch in a sync
    pub max_pages: Option<u32>,
    /// Offset to start at when there is no stored cursor
    pub start_offset: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: None,
            start_offset: None,
        }
    }
}

impl PaginationConfig {
    /// Create a config with the given page size
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Set the page ceiling
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the configured start offset
    #[must_use]
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = Some(offset);
        self
    }

    /// Offset at which pagination halts, if a ceiling is configured
    pub fn ceiling(&self) -> Option<u64> {
        self.max_pages
            .map(|pages| u64::from(pages) * u64::from(self.page_size))
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Offset of the next request
    pub offset: u64,
    /// Continuation token to send with the next request
    pub next_token: Option<String>,
    /// Responses processed so far
    pub pages_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create state starting at the given offset
    pub fn at_offset(offset: u64) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
        self.next_token = None;
    }
}

/// Capability of a stream that pages through an upstream listing
pub trait Paginated {
    /// Decoded listing response
    type Response;

    /// Query parameters for the next listing request
    fn next_request_params(&self) -> HashMap<String, String>;

    /// Inspect a response and decide whether another page follows
    fn next_page_token(&mut self, response: &Self::Response) -> NextPage;
}
