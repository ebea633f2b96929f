//! Completion caching.
//!
//! This crate memoises expensive calls: concurrent requests for the same key
//! share one computation, and values can be persisted to disk so later
//! processes reuse them.

#![warn(missing_docs)]

mod cache;
mod disk;

pub use cache::{CompletionCache, CompletionCacheConfig, CompletionCacheConfigBuilder, cache_key};
