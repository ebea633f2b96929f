//! Turning model text into the response shape the caller asked for.

use super::repair::{repair_json, strip_code_fence};
use crate::openrouter::truncate;
use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use vasari_core::{ResponseExpectation, ResponseSchema, StructuredResult};
use vasari_error::{StructuredError, StructuredErrorKind, VasariResult};

/// Corrective collaborator consulted once when local repair fails.
#[async_trait]
pub trait JsonFixer: Send + Sync {
    /// Produce a value matching `schema` from the broken text.
    async fn fix(&self, broken: &str, schema: &ResponseSchema) -> VasariResult<Value>;
}

/// Resolves raw completion text against a [`ResponseExpectation`].
///
/// For a schema the ladder is, stopping at the first success:
///
/// 1. strip Markdown code fences
/// 2. parse strictly and validate
/// 3. repair syntactically and validate
/// 4. ask the [`JsonFixer`], exactly once
///
/// If the fixer fails too, the error carries the raw text.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vasari_core::{ResponseExpectation, ResponseSchema, StructuredResult};
/// use vasari_models::StructuredResolver;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = ResponseSchema::new(
///     "Capital",
///     "A capital city",
///     json!({"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}),
/// );
/// let expectation = ResponseExpectation::Structured(schema);
///
/// let result = StructuredResolver::new()
///     .resolve("```json\n{'city': 'Tokyo',}\n```", &expectation, None)
///     .await?;
/// assert_eq!(result, StructuredResult::Structured(json!({"city": "Tokyo"})));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredResolver;

impl StructuredResolver {
    /// A resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve `raw` into the expected shape.
    ///
    /// Plain text is returned unchanged. Without a `fixer` the ladder stops
    /// after local repair.
    ///
    /// # Errors
    ///
    /// Returns a structured error when no stage produces a valid value, or
    /// when the schema itself does not compile.
    #[instrument(skip_all, fields(raw_len = raw.len(), fixer = fixer.is_some()))]
    pub async fn resolve(
        &self,
        raw: &str,
        expectation: &ResponseExpectation,
        fixer: Option<&dyn JsonFixer>,
    ) -> VasariResult<StructuredResult> {
        match expectation {
            ResponseExpectation::PlainText => Ok(StructuredResult::Text(raw.to_string())),
            ResponseExpectation::JsonObject => resolve_json_object(raw),
            ResponseExpectation::Structured(schema) => {
                resolve_structured(raw, schema, fixer).await
            }
        }
    }
}

fn resolve_json_object(raw: &str) -> VasariResult<StructuredResult> {
    let text = strip_code_fence(raw);
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(StructuredResult::Structured(value));
    }
    match repair_json(text) {
        Some(value) => {
            debug!("Repaired JSON object response");
            Ok(StructuredResult::Structured(value))
        }
        None => Err(StructuredError::new(StructuredErrorKind::Validation(format!(
            "Response is not JSON: {}",
            truncate(raw, 200)
        )))
        .into()),
    }
}

async fn resolve_structured(
    raw: &str,
    schema: &ResponseSchema,
    fixer: Option<&dyn JsonFixer>,
) -> VasariResult<StructuredResult> {
    let validator = jsonschema::validator_for(&schema.strict_schema()).map_err(|e| {
        StructuredError::new(StructuredErrorKind::InvalidSchema(format!(
            "{}: {}",
            schema.name(),
            e
        )))
    })?;

    let text = strip_code_fence(raw);

    let strict_failure = match serde_json::from_str::<Value>(text) {
        Ok(value) => match validate(&validator, &value) {
            Ok(()) => return Ok(StructuredResult::Structured(value)),
            Err(reason) => reason,
        },
        Err(e) => format!("invalid JSON: {}", e),
    };
    warn!(
        schema = %schema.name(),
        reason = %strict_failure,
        text = %truncate(text, 500),
        "Response failed validation, attempting repair"
    );

    let reason = match repair_json(text) {
        Some(value) => match validate(&validator, &value) {
            Ok(()) => {
                info!(schema = %schema.name(), "Repaired response");
                return Ok(StructuredResult::Structured(value));
            }
            Err(reason) => reason,
        },
        None => strict_failure,
    };

    let Some(fixer) = fixer else {
        return Err(StructuredError::new(StructuredErrorKind::Validation(reason)).into());
    };

    warn!(schema = %schema.name(), reason = %reason, "Repair failed, asking fixer");
    let fixed = fixer.fix(text, schema).await.map_err(|e| {
        StructuredError::new(StructuredErrorKind::FixExhausted {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
    })?;

    match validate(&validator, &fixed) {
        Ok(()) => {
            info!(schema = %schema.name(), "Fixer produced a valid response");
            Ok(StructuredResult::Structured(fixed))
        }
        Err(reason) => Err(StructuredError::new(StructuredErrorKind::FixExhausted {
            reason,
            raw: raw.to_string(),
        })
        .into()),
    }
}

fn validate(validator: &Validator, value: &Value) -> Result<(), String> {
    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
