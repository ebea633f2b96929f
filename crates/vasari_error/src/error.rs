//! Top-level error wrapper types.

use crate::{
    BuilderError, CacheError, ConfigError, HttpError, ImageError, JsonError, PricingError,
    ProviderError, RateLimitError, RetryClass, RetryableError, StructuredError,
};
use std::time::Duration;

/// Every failure the Vasari pipeline can surface.
///
/// # Examples
///
/// ```
/// use vasari_error::{HttpError, HttpErrorKind, VasariError};
///
/// let http_err = HttpError::new(HttpErrorKind::ClientBuild("no TLS backend".to_string()));
/// let err: VasariError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum VasariErrorKind {
    /// HTTP request could not be set up
    #[from(HttpError)]
    Http(HttpError),
    /// Caller-side JSON could not be read or written
    #[from(JsonError)]
    Json(JsonError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Provider call failed
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Structured response could not be resolved
    #[from(StructuredError)]
    Structured(StructuredError),
    /// Pricing lookup failed
    #[from(PricingError)]
    Pricing(PricingError),
    /// Rate limiter rejected the request
    #[from(RateLimitError)]
    RateLimit(RateLimitError),
    /// Completion cache failure
    #[from(CacheError)]
    Cache(CacheError),
    /// Image preparation failure
    #[from(ImageError)]
    Image(ImageError),
}

/// Vasari error with kind discrimination.
///
/// Cloning is cheap enough for the completion cache, which hands out shared
/// errors to every waiter on a failed load.
///
/// # Examples
///
/// ```
/// use vasari_error::{ConfigError, ConfigErrorKind, VasariResult};
///
/// fn might_fail() -> VasariResult<()> {
///     Err(ConfigError::new(ConfigErrorKind::Parse("missing field `client`".to_string())))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Vasari Error: {}", _0)]
pub struct VasariError(Box<VasariErrorKind>);

impl VasariError {
    /// Create a new error from a kind.
    pub fn new(kind: VasariErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VasariErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to VasariErrorKind
impl<T> From<T> for VasariError
where
    T: Into<VasariErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

impl RetryableError for VasariError {
    fn retry_class(&self) -> Option<RetryClass> {
        match self.kind() {
            VasariErrorKind::Provider(e) => e.retry_class(),
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self.kind() {
            VasariErrorKind::Provider(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Result type for Vasari operations.
///
/// # Examples
///
/// ```
/// use vasari_error::{JsonError, JsonErrorKind, VasariResult};
///
/// fn typed_answer() -> VasariResult<String> {
///     Err(JsonError::new(JsonErrorKind::NotStructured))?
/// }
/// ```
pub type VasariResult<T> = std::result::Result<T, VasariError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderErrorKind, RateLimitErrorKind};

    #[test]
    fn provider_timeout_is_retryable_through_wrapper() {
        let err: VasariError =
            ProviderError::new(ProviderErrorKind::Timeout("slow".to_string())).into();
        assert_eq!(err.retry_class(), Some(RetryClass::Timeout));
    }

    #[test]
    fn rate_limited_carries_hint() {
        let err: VasariError = ProviderError::new(ProviderErrorKind::RateLimited {
            message: "Please retry after 7 seconds.".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        })
        .into();
        assert_eq!(err.retry_class(), Some(RetryClass::RateLimit));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn non_provider_errors_are_terminal() {
        let err: VasariError = RateLimitError::new(RateLimitErrorKind::Starvation {
            model: "gpt-4".to_string(),
            requested: 20,
            capacity: 10,
        })
        .into();
        assert_eq!(err.retry_class(), None);
        assert_eq!(err.retry_after(), None);
    }
}
