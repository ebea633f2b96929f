//! Configuration loading errors.

/// Configuration failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A required environment variable, such as an API key, is unset
    #[display("{} is not set", _0)]
    MissingEnv(String),
    /// A configuration or schema file could not be read
    #[display("Cannot read {}: {}", path, reason)]
    Read {
        /// File that was requested
        path: String,
        /// Underlying failure
        reason: String,
    },
    /// The layered sources could not be merged
    #[display("Failed to build configuration: {}", _0)]
    Build(String),
    /// The merged sources do not match the settings layout
    #[display("Failed to parse configuration: {}", _0)]
    Parse(String),
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use vasari_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::new(ConfigErrorKind::MissingEnv("OPENROUTER_API_KEY".to_string()));
/// assert!(err.to_string().contains("OPENROUTER_API_KEY is not set"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// What went wrong
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
