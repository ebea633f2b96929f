//! Rate limiting and retry for LLM calls.
//!
//! This crate gates outgoing calls with per-account sliding-window buckets and
//! wraps them in classification-aware retry policies.
//!
//! ## Buckets
//!
//! A [`RateLimitManager`] tracks the calls and estimated tokens admitted in
//! the trailing window. Admission records usage immediately, so concurrent
//! callers cannot overshoot the budget by checking at the same instant.
//! Managers are looked up by [`RateLimitKey`] in a [`RateLimitRegistry`].
//!
//! ## Retry
//!
//! [`RetryPolicy`] retries only errors whose [`vasari_error::RetryClass`] it
//! declares, and ships two presets: [`RetryPolicy::transient_network`] and
//! [`RetryPolicy::provider_rate_limit`].
//!
//! ## Configuration
//!
//! [`VasariConfig`] loads the bundled `vasari.toml` and merges user overrides.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod key;
mod limiter;
mod registry;
mod retry;

pub use config::{
    CacheConfig, ClientConfig, ImageConfig, ModelLimits, ProviderLimits, StructuredConfig,
    VasariConfig,
};
pub use key::RateLimitKey;
pub use limiter::{RateLimitManager, Reservation, UsageEntry};
pub use registry::RateLimitRegistry;
pub use retry::{Backoff, RetryPolicy, RetryPreset, parse_retry_after};
