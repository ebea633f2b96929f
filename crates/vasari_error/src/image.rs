//! Image preparation errors.

/// Image failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ImageErrorKind {
    /// The image could not be read
    #[display("Failed to decode image: {}", _0)]
    Decode(String),
    /// The image could not be encoded
    #[display("Failed to encode image: {}", _0)]
    Encode(String),
    /// Shrinking stopped before the image fit under the size limit
    #[display(
        "Image still {} bytes at {}x{} after {} resize steps (limit {} bytes)",
        bytes,
        width,
        height,
        steps,
        limit
    )]
    CannotShrink {
        /// Width at the point shrinking stopped
        width: u32,
        /// Height at the point shrinking stopped
        height: u32,
        /// Encoded size at that point
        bytes: usize,
        /// Number of resize steps taken
        steps: u32,
        /// Configured size limit
        limit: usize,
    },
}

/// Image error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Image Error: {} at line {} in {}", kind, line, file)]
pub struct ImageError {
    /// The kind of error that occurred
    pub kind: ImageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ImageError {
    /// Create a new image error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ImageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
