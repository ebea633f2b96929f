//! Pricing lookup errors.

/// Pricing failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PricingErrorKind {
    /// No pricing entry for the model id
    #[display("No pricing for model: {}", _0)]
    UnknownModel(String),
    /// A price string could not be parsed as a number
    #[display("Invalid {} price '{}' for model {}", field, value, model)]
    InvalidPrice {
        /// Model id
        model: String,
        /// Which price ("prompt", "completion", ...)
        field: String,
        /// The unparseable value
        value: String,
    },
    /// The model table could not be fetched
    #[display("Failed to fetch model table: {}", _0)]
    TableFetch(String),
}

/// Pricing error with location tracking.
///
/// # Examples
///
/// ```
/// use vasari_error::{PricingError, PricingErrorKind};
///
/// let err = PricingError::new(PricingErrorKind::UnknownModel("acme/unknown".into()));
/// assert!(format!("{}", err).contains("acme/unknown"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pricing Error: {} at line {} in {}", kind, line, file)]
pub struct PricingError {
    /// The kind of error that occurred
    pub kind: PricingErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PricingError {
    /// Create a new pricing error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PricingErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
