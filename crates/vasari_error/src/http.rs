//! Errors from setting up HTTP requests.
//!
//! Failures of a request that was actually sent are
//! [`ProviderError`](crate::ProviderError)s so the retry controller can see
//! them. These are the ones that happen before anything leaves the process.

/// HTTP setup failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum HttpErrorKind {
    /// The `reqwest` client could not be constructed
    #[display("Failed to build HTTP client: {}", _0)]
    ClientBuild(String),
    /// The request could not be built, for example from a bad base URL
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
}

/// HTTP setup error with source location.
///
/// # Examples
///
/// ```
/// use vasari_error::{HttpError, HttpErrorKind};
///
/// let err = HttpError::new(HttpErrorKind::InvalidRequest("relative URL".to_string()));
/// assert!(err.to_string().starts_with("HTTP Error: Invalid request: relative URL"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("HTTP Error: {} at line {} in {}", kind, line, file)]
pub struct HttpError {
    /// What went wrong
    pub kind: HttpErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl HttpError {
    /// Create a new HttpError at the current location.
    #[track_caller]
    pub fn new(kind: HttpErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
