//! Pagination module
//!
//! Offset pagination over the pool bundle listing.
//!
//! # Overview
//!
//! The listing endpoint pages with `pagination.limit` / `pagination.offset`
//! and signals more data through `pagination.next_key`. [`OffsetCursor`]
//! tracks the offset across requests, enforces the optional page ceiling
//! and decides when to stop. Streams expose the behaviour through the
//! [`Paginated`] capability.

mod cursor;
mod types;

pub use cursor::OffsetCursor;
pub use types::{
    NextPage, PaginationConfig, PaginationState, Paginated, LIMIT_PARAM, OFFSET_PARAM,
    TOKEN_PARAM,
};
