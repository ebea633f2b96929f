//! JSON errors outside response resolution.
//!
//! A model answer that will not parse is a
//! [`StructuredError`](crate::StructuredError). These cover JSON the caller
//! hands in or asks for: schema files, typed results and printed output.

/// JSON failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum JsonErrorKind {
    /// Input is not valid JSON
    #[display("Failed to decode JSON: {}", _0)]
    Decode(String),
    /// A value could not be serialized
    #[display("Failed to encode JSON: {}", _0)]
    Encode(String),
    /// A resolved value does not fit the requested Rust type
    #[display("Result does not fit the target type: {}", _0)]
    TypeMismatch(String),
    /// A typed result was requested from a plain-text answer
    #[display("Expected a structured result, got text")]
    NotStructured,
}

/// JSON error with source location.
///
/// # Examples
///
/// ```
/// use vasari_error::{JsonError, JsonErrorKind};
///
/// let err = JsonError::new(JsonErrorKind::NotStructured);
/// assert_eq!(err.kind, JsonErrorKind::NotStructured);
/// assert!(err.to_string().contains("got text"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error: {} at line {} in {}", kind, line, file)]
pub struct JsonError {
    /// What went wrong
    pub kind: JsonErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl JsonError {
    /// Create a new JsonError at the current location.
    #[track_caller]
    pub fn new(kind: JsonErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
