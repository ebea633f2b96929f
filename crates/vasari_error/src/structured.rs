//! Structured (schema-constrained) response errors.

/// Structured response failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StructuredErrorKind {
    /// The text could not be turned into a value matching the schema
    #[display("Response does not match schema: {}", _0)]
    Validation(String),
    /// Every repair stage, including the corrective model call, failed
    #[display("Could not repair response ({}); raw text: {}", reason, raw)]
    FixExhausted {
        /// Why the last stage failed
        reason: String,
        /// The text as returned by the model
        raw: String,
    },
    /// The schema itself could not be compiled
    #[display("Invalid JSON schema: {}", _0)]
    InvalidSchema(String),
}

/// Structured response error with location tracking.
///
/// # Examples
///
/// ```
/// use vasari_error::{StructuredError, StructuredErrorKind};
///
/// let err = StructuredError::new(StructuredErrorKind::Validation("missing field".into()));
/// assert!(format!("{}", err).contains("missing field"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Structured Response Error: {} at line {} in {}", kind, line, file)]
pub struct StructuredError {
    /// The kind of error that occurred
    pub kind: StructuredErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StructuredError {
    /// Create a new structured error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StructuredErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
