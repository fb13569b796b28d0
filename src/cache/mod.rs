//! In-memory response cache for backend calls.
//!
//! This module provides a transport-agnostic caching mechanism that:
//! - Fingerprints requests by endpoint and key-sorted params
//! - Expires each entry on its own TTL, proactively and on read
//! - Wraps any async call with cache-first lookup (`cached_api_request`)
//! - Runs batches in bounded windows and warms entries on a best-effort basis
//! - Invalidates by substring pattern

mod batch;
mod key;
mod prefetch;
mod request;
mod stats;
mod store;

pub use batch::{batch_api_requests, Settled, DEFAULT_BATCH_CONCURRENCY};
pub use key::generate_key;
pub use prefetch::{prefetch_data, PrefetchConfig};
pub use request::{cached_api_request, RequestOptions};
pub use stats::{get_cache_stats, invalidate_cache, CacheStats, INVALIDATE_ALL};
pub use store::{ApiCache, DEFAULT_TTL};
