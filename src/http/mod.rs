//! HTTP client module
//!
//! Provides HTTP client with retry, rate limiting, and backoff strategies.
//! Used for the pool API (bundle listings, pool metadata) and for the
//! storage providers that serve bundle payloads.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
