//! Completion request type.

use crate::{ImageInput, ResponseExpectation};
use serde_json::{Map, Value};
use vasari_error::{BuilderError, BuilderErrorKind, VasariResult};

/// Default completion budget in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// One chat completion to execute.
///
/// # Examples
///
/// ```
/// use vasari_core::{CompletionRequest, ResponseExpectation};
///
/// let request = CompletionRequest::builder()
///     .prompt("What is the capital of Japan?")
///     .model("openai/gpt-4o")
///     .build()
///     .unwrap();
///
/// assert_eq!(*request.max_tokens(), 8192);
/// assert_eq!(*request.temperature(), 1.0);
/// assert_eq!(request.expectation(), &ResponseExpectation::PlainText);
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct CompletionRequest {
    /// Prompt text sent as the first content part
    prompt: String,
    /// Model id, e.g. `openai/gpt-4o`
    model: String,
    /// Completion token budget
    #[builder(default = "DEFAULT_MAX_TOKENS")]
    max_tokens: u32,
    /// Sampling temperature
    #[builder(default = "DEFAULT_TEMPERATURE")]
    temperature: f32,
    /// Images appended after the prompt
    #[builder(default)]
    images: Vec<ImageInput>,
    /// Expected response shape
    #[builder(default)]
    expectation: ResponseExpectation,
    /// Provider routing preferences, passed through as the `provider` field
    #[builder(default)]
    provider: Option<Map<String, Value>>,
    /// Extra request fields, merged last so they override everything else
    #[builder(default)]
    extra_params: Map<String, Value>,
}

impl CompletionRequest {
    /// Start building a request.
    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }

    /// Copy of this request with a different prompt.
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..self.clone()
        }
    }

    /// Copy of this request with different images.
    pub fn with_images(&self, images: Vec<ImageInput>) -> Self {
        Self {
            images,
            ..self.clone()
        }
    }

    /// Copy of this request targeting another model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Copy of this request expecting a different response shape.
    pub fn with_expectation(&self, expectation: ResponseExpectation) -> Self {
        Self {
            expectation,
            ..self.clone()
        }
    }

    /// Rough token count used for rate-limit admission.
    ///
    /// Four characters per prompt token, the tile estimate for each image,
    /// and the full completion budget.
    pub fn approx_tokens(&self) -> u64 {
        let prompt = (self.prompt.chars().count() as u64).div_ceil(4);
        let images: u64 = self.images.iter().map(ImageInput::approx_tokens).sum();
        prompt + images + u64::from(self.max_tokens)
    }
}

impl CompletionRequestBuilder {
    /// Append one image.
    pub fn image(&mut self, image: ImageInput) -> &mut Self {
        self.images.get_or_insert_with(Vec::new).push(image);
        self
    }

    /// Add one extra request field.
    pub fn extra_param(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.extra_params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the prompt or model is missing, the model
    /// is empty, or the temperature is outside `0.0..=2.0`.
    pub fn build(&self) -> VasariResult<CompletionRequest> {
        let request = self.build_internal().map_err(|e| {
            BuilderError::new(BuilderErrorKind::MissingField(e.to_string()))
        })?;
        if request.model.trim().is_empty() {
            return Err(BuilderError::new(BuilderErrorKind::InvalidField {
                field: "model".to_string(),
                reason: "must not be empty".to_string(),
            })
            .into());
        }
        if !(0.0..=2.0).contains(&request.temperature) {
            return Err(BuilderError::new(BuilderErrorKind::InvalidField {
                field: "temperature".to_string(),
                reason: format!("{} is outside 0.0..=2.0", request.temperature),
            })
            .into());
        }
        Ok(request)
    }
}
