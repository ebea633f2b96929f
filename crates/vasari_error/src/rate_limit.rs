//! Error types for rate limiting operations.

/// Error kinds for rate limiting operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// A single request needs more tokens than the bucket can ever hold
    #[display(
        "Request for {} tokens can never be admitted for {} (bucket capacity {})",
        requested,
        model,
        capacity
    )]
    Starvation {
        /// Model the bucket belongs to
        model: String,
        /// Tokens the request asked for
        requested: u64,
        /// Bucket token capacity
        capacity: u64,
    },
    /// Limits that cannot admit anything (zero calls or zero window)
    #[display("Invalid rate limits: {}", _0)]
    InvalidLimits(String),
}

/// Rate limiting error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    kind: RateLimitErrorKind,
    line: u32,
    file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limiting error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RateLimitErrorKind {
        &self.kind
    }
}
