//! Errors raised while talking to an LLM provider.

use crate::{RetryClass, RetryableError};
use std::time::Duration;

/// Provider call failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The request did not complete within the transport timeout
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// The connection could not be established or was reset
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// The provider answered with a rate-limit rejection
    #[display("Rate limited by provider: {}", message)]
    RateLimited {
        /// Message returned by the provider
        message: String,
        /// Wait hint parsed from the response, if any
        retry_after: Option<Duration>,
    },
    /// Non-success HTTP status other than a rate limit
    #[display("HTTP {} error: {}", status, body)]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
    /// An `error` object embedded in an otherwise successful response
    #[display("Error in response: {}", _0)]
    ErrorObject(String),
    /// The response body did not have the expected shape
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
}

impl ProviderErrorKind {
    /// Map this condition onto a retry class.
    pub fn retry_class(&self) -> Option<RetryClass> {
        match self {
            ProviderErrorKind::Timeout(_) => Some(RetryClass::Timeout),
            ProviderErrorKind::Connection(_) => Some(RetryClass::Connection),
            ProviderErrorKind::RateLimited { .. } => Some(RetryClass::RateLimit),
            _ => None,
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use vasari_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::Status {
///     status: 401,
///     body: "invalid key".to_string(),
/// });
/// assert!(format!("{}", err).contains("HTTP 401"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl RetryableError for ProviderError {
    fn retry_class(&self) -> Option<RetryClass> {
        self.kind.retry_class()
    }

    fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ProviderErrorKind::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
