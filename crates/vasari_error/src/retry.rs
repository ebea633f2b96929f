//! Retry classification shared by every error the retry controller inspects.

use std::time::Duration;

/// Error classes the retry controller knows how to wait out.
///
/// Anything that does not map onto one of these is terminal and propagates
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RetryClass {
    /// The provider did not answer within the transport timeout
    #[display("timeout")]
    Timeout,
    /// The connection could not be established or was dropped
    #[display("connection")]
    Connection,
    /// The provider rejected the call with a rate-limit response
    #[display("rate_limit")]
    RateLimit,
}

/// Trait for errors that support classified retry.
///
/// # Examples
///
/// ```
/// use vasari_error::{ProviderError, ProviderErrorKind, RetryClass, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Timeout("read timed out".to_string()));
/// assert_eq!(err.retry_class(), Some(RetryClass::Timeout));
///
/// let err = ProviderError::new(ProviderErrorKind::ErrorObject("bad request".to_string()));
/// assert_eq!(err.retry_class(), None);
/// ```
pub trait RetryableError {
    /// Returns the retry class of this error, or `None` if it is terminal.
    fn retry_class(&self) -> Option<RetryClass>;

    /// Provider-supplied wait hint, if the error carried one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
