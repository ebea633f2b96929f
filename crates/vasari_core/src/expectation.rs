//! What shape of response a caller expects.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A named JSON schema a response must conform to.
///
/// # Examples
///
/// ```
/// use schemars::JsonSchema;
/// use vasari_core::ResponseSchema;
///
/// #[derive(JsonSchema)]
/// struct Capital {
///     city: String,
/// }
///
/// let schema = ResponseSchema::for_type::<Capital>();
/// assert_eq!(schema.name(), "Capital");
///
/// let format = schema.to_response_format();
/// assert_eq!(format["type"], "json_schema");
/// assert_eq!(format["json_schema"]["strict"], true);
/// assert_eq!(format["json_schema"]["schema"]["additionalProperties"], false);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ResponseSchema {
    /// Schema name sent to the provider
    name: String,
    /// Human-readable description
    description: String,
    /// JSON schema document
    schema: Value,
}

impl ResponseSchema {
    /// Build a schema descriptor from a raw JSON schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }

    /// Derive the schema of a Rust type.
    pub fn for_type<T: JsonSchema>() -> Self {
        let name = T::schema_name().to_string();
        let schema = schemars::schema_for!(T).to_value();
        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Schema for {}", name));
        Self::new(name, description, schema)
    }

    /// The schema with the top-level object closed to properties it does not
    /// name. Responses are requested and validated against this form.
    pub fn strict_schema(&self) -> Value {
        let mut schema = self.schema.clone();
        if let Value::Object(map) = &mut schema {
            map.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        schema
    }

    /// Render the `response_format` request field for this schema.
    ///
    /// Strict mode is always on and the schema is [`strict_schema`](Self::strict_schema).
    pub fn to_response_format(&self) -> Value {
        let schema = self.strict_schema();
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "description": self.description,
                "strict": true,
                "schema": schema,
            }
        })
    }
}

/// The response shape requested from a completion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "schema", rename_all = "snake_case")]
pub enum ResponseExpectation {
    /// Free text, returned unchanged
    #[default]
    PlainText,
    /// Any syntactically valid JSON object, no schema
    JsonObject,
    /// JSON validated against the schema
    Structured(ResponseSchema),
}

impl ResponseExpectation {
    /// Structured expectation for a Rust type.
    pub fn structured<T: JsonSchema>() -> Self {
        ResponseExpectation::Structured(ResponseSchema::for_type::<T>())
    }

    /// The schema, when one is attached.
    pub fn schema(&self) -> Option<&ResponseSchema> {
        match self {
            ResponseExpectation::Structured(schema) => Some(schema),
            _ => None,
        }
    }

    /// The `response_format` request field, if the expectation needs one.
    pub fn response_format(&self) -> Option<Value> {
        match self {
            ResponseExpectation::PlainText => None,
            ResponseExpectation::JsonObject => Some(json!({"type": "json_object"})),
            ResponseExpectation::Structured(schema) => Some(schema.to_response_format()),
        }
    }
}
