//! Error types for the Vasari library.
//!
//! This crate provides the error types used throughout the Vasari workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Errors that the retry controller may act on implement [`RetryableError`],
//! which maps them onto a [`RetryClass`].
//!
//! # Examples
//!
//! ```
//! use vasari_error::{ConfigError, ConfigErrorKind, VasariResult};
//!
//! fn api_key() -> VasariResult<String> {
//!     Err(ConfigError::new(ConfigErrorKind::MissingEnv("OPENROUTER_API_KEY".to_string())))?
//! }
//!
//! match api_key() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod cache;
mod config;
mod error;
mod http;
mod image;
mod json;
mod pricing;
mod provider;
mod rate_limit;
mod retry;
mod structured;

pub use builder::{BuilderError, BuilderErrorKind};
pub use cache::{CacheError, CacheErrorKind};
pub use config::{ConfigError, ConfigErrorKind};
pub use error::{VasariError, VasariErrorKind, VasariResult};
pub use http::{HttpError, HttpErrorKind};
pub use image::{ImageError, ImageErrorKind};
pub use json::{JsonError, JsonErrorKind};
pub use pricing::{PricingError, PricingErrorKind};
pub use provider::{ProviderError, ProviderErrorKind};
pub use rate_limit::{RateLimitError, RateLimitErrorKind};
pub use retry::{RetryClass, RetryableError};
pub use structured::{StructuredError, StructuredErrorKind};
