//! Pool stream module
//!
//! The incremental bundle reader: pages through a pool's bundle listing,
//! fetches and verifies each bundle, and yields the records inside.
//!
//! # Overview
//!
//! [`PoolStream`] is one concrete type with two capabilities:
//! [`Paginated`](crate::pagination::Paginated) for the listing and
//! [`StatefulCursor`](crate::state::StatefulCursor) for resumable state.
//!
//! ```text
//! REQUEST(offset) -> bundles[] -> per bundle: FETCH -> VERIFY -> DECOMPRESS -> EXTRACT
//!     -> after last bundle: UPDATE_CURSOR -> next key and under ceiling? -> REQUEST | DONE
//! ```

mod pool_stream;
mod types;

pub use pool_stream::PoolStream;
pub use types::{stream_name, PoolStreamConfig, StreamEvent, StreamStats};

#[cfg(test)]
mod tests;
