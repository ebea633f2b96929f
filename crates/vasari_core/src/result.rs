//! Resolved completion content.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vasari_error::{JsonError, JsonErrorKind, VasariResult};

/// What a completion resolved to.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use vasari_core::StructuredResult;
///
/// #[derive(Deserialize)]
/// struct Capital { city: String }
///
/// let result = StructuredResult::Structured(json!({"city": "Tokyo"}));
/// let capital: Capital = result.deserialize().unwrap();
/// assert_eq!(capital.city, "Tokyo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StructuredResult {
    /// Unconstrained text as returned by the model
    Text(String),
    /// JSON value, validated against the caller's schema when one was given
    Structured(serde_json::Value),
}

impl StructuredResult {
    /// Borrow the text, if this is a text result.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StructuredResult::Text(text) => Some(text),
            StructuredResult::Structured(_) => None,
        }
    }

    /// Borrow the value, if this is a structured result.
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            StructuredResult::Text(_) => None,
            StructuredResult::Structured(value) => Some(value),
        }
    }

    /// Deserialize a structured result into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for text results or when the value does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> VasariResult<T> {
        match self {
            StructuredResult::Structured(value) => serde_json::from_value(value.clone())
                .map_err(|e| JsonError::new(JsonErrorKind::TypeMismatch(e.to_string())).into()),
            StructuredResult::Text(_) => Err(JsonError::new(JsonErrorKind::NotStructured).into()),
        }
    }
}
