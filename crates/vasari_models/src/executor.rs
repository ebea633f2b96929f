//! The completion pipeline.
//!
//! [`CompletionExecutor`] ties the pieces together for one request:
//!
//! 1. schema requests get strict `response_format`, `require_parameters` and
//!    a cached worked example appended to the prompt
//! 2. oversized images are shrunk
//! 3. the payload is posted under the retry policy, taking a rate-limit
//!    reservation before each attempt
//! 4. the response is priced and the cost published to the sinks
//! 5. the text is resolved into the expected shape, with one corrective call
//!    when local repair fails

use crate::openrouter::{ChatCompletionResponse, HttpChatTransport, truncate};
use crate::{
    ChatTransport, CostAccountant, ExampleWriter, ImageNormalizer, JsonFixer, LlmMetrics,
    PricingTable, SchemaExampleProvider, StructuredResolver, classify_error, image_content,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use vasari_cache::{CompletionCache, CompletionCacheConfig, cache_key};
use vasari_core::{
    Completion, CompletionRequest, CostRecord, ImageInput, ResponseExpectation, ResponseSchema,
    StructuredResult,
};
use vasari_error::{
    BuilderError, BuilderErrorKind, ImageError, ImageErrorKind, ProviderError, ProviderErrorKind,
    RetryClass, RetryableError, StructuredError, StructuredErrorKind, VasariResult,
};
use vasari_rate_limit::{
    RateLimitKey, RateLimitManager, RateLimitRegistry, RetryPolicy, VasariConfig,
};

/// Text appended to a schema request's prompt, followed by the example.
const EXAMPLE_PREFIX: &str = "The response must follow the following json format example:";

/// Cache namespace for whole completions.
pub const COMPLETION_NAMESPACE: &str = "completions";

/// Runs completion requests end to end.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vasari_core::CompletionRequest;
/// use vasari_models::{
///     CompletionExecutor, CostAccountant, CostAccumulator, HttpChatTransport, StaticPricingTable,
/// };
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let total = Arc::new(CostAccumulator::new());
/// let executor = CompletionExecutor::builder()
///     .transport(Arc::new(HttpChatTransport::new(
///         "https://api.openai.com/v1",
///         std::env::var("OPENAI_API_KEY")?,
///         Duration::from_secs(120),
///     )?))
///     .pricing(Arc::new(StaticPricingTable::openai()))
///     .accountant(CostAccountant::new().with_sink(total.clone()))
///     .build()?;
///
/// let request = CompletionRequest::builder()
///     .prompt("What is the capital of Japan?")
///     .model("gpt-4o")
///     .build()?;
/// let answer = executor.complete(request).await?;
/// println!("{:?}, spent ${}", answer, total.total());
/// # Ok(())
/// # }
/// ```
#[derive(derive_builder::Builder)]
#[builder(pattern = "owned", build_fn(private, name = "build_internal"))]
pub struct CompletionExecutor {
    /// Where payloads are posted
    transport: Arc<dyn ChatTransport>,
    /// Prices completions by model id
    pricing: Arc<dyn PricingTable>,
    /// Receives every cost record
    #[builder(default)]
    accountant: CostAccountant,
    /// Rate-limit buckets
    #[builder(default)]
    limits: RateLimitRegistry,
    /// Account scope of the buckets; the model part is filled in per request
    #[builder(default, setter(strip_option))]
    limit_scope: Option<RateLimitKey>,
    /// Retry policy wrapped around each call
    #[builder(default)]
    retry: RetryPolicy,
    /// Image size normalization
    #[builder(default)]
    normalizer: ImageNormalizer,
    /// Writes worked examples for schema requests
    #[builder(default, setter(strip_option))]
    examples: Option<SchemaExampleProvider>,
    /// Model for corrective calls; the request's own model when unset
    #[builder(default, setter(into, strip_option))]
    fix_model: Option<String>,
    /// Memoises whole completions
    #[builder(default, setter(strip_option))]
    cache: Option<CompletionCache<StructuredResult>>,
    #[builder(setter(skip), default)]
    resolver: StructuredResolver,
    #[builder(setter(skip), default)]
    metrics: LlmMetrics,
}

impl std::fmt::Debug for CompletionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionExecutor")
            .field("transport", &self.transport.name())
            .field("accountant", &self.accountant)
            .field("buckets", &self.limits.len())
            .field("retry", &self.retry.name())
            .field("normalizer", &self.normalizer)
            .field("examples", &self.examples.as_ref().map(|e| e.model()))
            .field("fix_model", &self.fix_model)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl CompletionExecutorBuilder {
    /// Build the executor.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the transport or pricing table is missing.
    pub fn build(self) -> VasariResult<CompletionExecutor> {
        self.build_internal()
            .map_err(|e| BuilderError::new(BuilderErrorKind::MissingField(e.to_string())).into())
    }
}

impl CompletionExecutor {
    /// Start building an executor.
    pub fn builder() -> CompletionExecutorBuilder {
        CompletionExecutorBuilder::default()
    }

    /// Executor wired from configuration.
    ///
    /// Posts to `[client].base_url` with the configured timeout and retry
    /// preset, limits calls with the `[providers.<provider>]` table, writes
    /// schema examples and fixes with the provider's structured models (see
    /// [`VasariConfig::structured_for`]), and caches under `[cache].root`
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client, a rate limit, or the cache
    /// directory cannot be set up.
    pub fn from_config(
        config: &VasariConfig,
        provider: &str,
        api_key: &str,
        organization: &str,
        pricing: Arc<dyn PricingTable>,
        accountant: CostAccountant,
    ) -> VasariResult<Self> {
        let transport = HttpChatTransport::from_config(&config.client, api_key)?;
        let request_type = config
            .provider(provider)
            .map(|limits| limits.request_type.clone())
            .unwrap_or_else(|| "completion".to_string());

        let structured = config.structured_for(provider);
        let mut cache_config = CompletionCacheConfig::default();
        if let Some(root) = &config.cache.root {
            cache_config = cache_config.with_root(Some(root.clone()));
        }

        Self::builder()
            .transport(Arc::new(transport))
            .pricing(pricing)
            .accountant(accountant)
            .limits(config.registry(provider, api_key, organization)?)
            .limit_scope(RateLimitKey::new(api_key, organization, "", request_type))
            .retry(config.client.retry.policy())
            .normalizer(ImageNormalizer::new(config.images.max_bytes))
            .examples(SchemaExampleProvider::new(&structured.example_model, &cache_config)?)
            .fix_model(structured.fix_model.clone())
            .cache(CompletionCache::new(
                &cache_config.with_namespace(COMPLETION_NAMESPACE.to_string()),
            )?)
            .build()
    }

    /// The cost accountant.
    pub fn accountant(&self) -> &CostAccountant {
        &self.accountant
    }

    /// The retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run a completion and return the resolved answer.
    ///
    /// # Errors
    ///
    /// Returns the first terminal failure: transport, rate limiter, pricing,
    /// image preparation or response resolution.
    pub async fn complete(&self, request: CompletionRequest) -> VasariResult<StructuredResult> {
        self.complete_detailed(request).await.map(Completion::into_result)
    }

    /// Run a completion and return the answer together with its cost.
    ///
    /// # Errors
    ///
    /// See [`complete`](Self::complete).
    pub async fn complete_detailed(&self, request: CompletionRequest) -> VasariResult<Completion> {
        self.run(request, true).await
    }

    /// Run a completion constrained to the schema of `T` and deserialize it.
    ///
    /// # Errors
    ///
    /// See [`complete`](Self::complete); also fails if the validated value
    /// does not deserialize into `T`.
    pub async fn complete_typed<T>(&self, request: CompletionRequest) -> VasariResult<T>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let request = request.with_expectation(ResponseExpectation::structured::<T>());
        self.complete(request).await?.deserialize()
    }

    /// Like [`complete`](Self::complete), but identical requests are answered
    /// from the completion cache.
    ///
    /// Without a configured cache this is the same as `complete`.
    ///
    /// # Errors
    ///
    /// See [`complete`](Self::complete). Failures are not cached.
    pub async fn complete_cached(
        &self,
        request: CompletionRequest,
    ) -> VasariResult<StructuredResult> {
        let Some(cache) = &self.cache else {
            debug!("No completion cache configured");
            return self.complete(request).await;
        };
        let key = request_cache_key(&request)?;
        cache.get_or_try_insert_with(key, self.complete(request)).await
    }

    fn run(
        &self,
        request: CompletionRequest,
        allow_fix: bool,
    ) -> BoxFuture<'_, VasariResult<Completion>> {
        let span = info_span!(
            "completion",
            model = %request.model(),
            images = request.images().len(),
            structured = request.expectation().schema().is_some()
        );
        Box::pin(
            async move {
                let started = Instant::now();
                let model = request.model().clone();
                match self.execute(request, allow_fix).await {
                    Ok((completion, provider)) => {
                        self.metrics.record_request(
                            &provider,
                            &model,
                            started.elapsed().as_secs_f64(),
                        );
                        Ok(completion)
                    }
                    Err(e) => {
                        self.metrics.record_error(&model, classify_error(&e));
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }

    async fn execute(
        &self,
        request: CompletionRequest,
        allow_fix: bool,
    ) -> VasariResult<(Completion, String)> {
        let prompt = self.augment_prompt(&request).await?;
        let images = self.normalize_images(request.images()).await?;
        let prepared = request.with_prompt(prompt).with_images(images);
        let payload = build_payload(&prepared)?;

        let body = self.send(&prepared, &payload).await?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            error!(error = %err, "Provider returned an error object");
            return Err(ProviderError::new(ProviderErrorKind::ErrorObject(format!(
                "{} (request: {})",
                err,
                summarize_payload(&payload)
            )))
            .into());
        }

        let response: ChatCompletionResponse = serde_json::from_value(body).map_err(|e| {
            ProviderError::new(ProviderErrorKind::MalformedResponse(format!(
                "{} (request: {})",
                e,
                summarize_payload(&payload)
            )))
        })?;

        let pricing = self.pricing.pricing(prepared.model())?;
        let record = CostRecord::new(
            prepared.model(),
            response.provider.clone(),
            response.id.clone(),
            response.usage,
            &pricing,
        );
        self.accountant.publish(&record);
        let provider = response
            .provider
            .clone()
            .unwrap_or_else(|| self.transport.name().to_string());
        info!(
            provider = %provider,
            prompt_tokens = *record.usage().prompt_tokens(),
            completion_tokens = *record.usage().completion_tokens(),
            cost = record.total_cost(),
            "Completion finished"
        );

        let content = response.first_content().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MalformedResponse(
                "response has no choices[0].message.content".to_string(),
            ))
        })?;

        let corrective = ExecutorFixer {
            executor: self,
            model: self
                .fix_model
                .clone()
                .unwrap_or_else(|| prepared.model().clone()),
        };
        let fixer: Option<&dyn JsonFixer> = if allow_fix { Some(&corrective) } else { None };
        let result = self
            .resolver
            .resolve(content, prepared.expectation(), fixer)
            .await?;

        Ok((Completion::new(result, record), provider))
    }

    /// Prompt with the schema example appended, for schema requests.
    async fn augment_prompt(&self, request: &CompletionRequest) -> VasariResult<String> {
        let mut prompt = request.prompt().clone();
        if let (ResponseExpectation::Structured(schema), Some(examples)) =
            (request.expectation(), &self.examples)
        {
            let example = examples.example_for(schema, self).await?;
            prompt.push_str(EXAMPLE_PREFIX);
            prompt.push_str(&example);
        }
        Ok(prompt)
    }

    async fn normalize_images(&self, images: &[ImageInput]) -> VasariResult<Vec<ImageInput>> {
        let mut normalized = Vec::with_capacity(images.len());
        for image in images {
            let normalizer = self.normalizer;
            let image = image.clone();
            let resized = tokio::task::spawn_blocking(move || normalizer.normalize(image))
                .await
                .map_err(|e| {
                    ImageError::new(ImageErrorKind::Encode(format!("resize task failed: {}", e)))
                })??;
            normalized.push(resized);
        }
        Ok(normalized)
    }

    /// Post under the retry policy, taking a reservation before each attempt.
    async fn send(&self, request: &CompletionRequest, payload: &Value) -> VasariResult<Value> {
        let bucket = self.bucket_for(request.model());
        let bucket = bucket.as_deref();
        let tokens = request.approx_tokens();
        let transport = self.transport.as_ref();

        self.retry
            .run(move || async move {
                let reservation = match bucket {
                    Some(bucket) => Some(bucket.acquire(tokens).await?),
                    None => None,
                };
                match transport.post_chat(payload).await {
                    Err(e) if e.retry_class() == Some(RetryClass::Connection) => {
                        if let (Some(bucket), Some(reservation)) = (bucket, reservation) {
                            warn!("Connection failed, refunding reservation");
                            bucket.release(reservation).await;
                        }
                        Err(e)
                    }
                    other => other,
                }
            })
            .await
    }

    /// Bucket for `model`, trying the full id and then the part after the
    /// last `/` (so `openai/gpt-4` uses the `gpt-4` bucket).
    fn bucket_for(&self, model: &str) -> Option<Arc<RateLimitManager>> {
        let scope = self.limit_scope.as_ref()?;
        self.limits.get(&scope.for_model(model)).or_else(|| {
            let short = model.rsplit('/').next()?;
            self.limits.get(&scope.for_model(short))
        })
    }
}

#[async_trait]
impl ExampleWriter for CompletionExecutor {
    async fn write_example(&self, prompt: &str, model: &str) -> VasariResult<String> {
        let request = CompletionRequest::builder()
            .prompt(prompt)
            .model(model)
            .build()?;
        match self.run(request, false).await?.into_result() {
            StructuredResult::Text(text) => Ok(text),
            StructuredResult::Structured(value) => Ok(value.to_string()),
        }
    }
}

/// Corrective calls through the executor's own schema pipeline.
struct ExecutorFixer<'a> {
    executor: &'a CompletionExecutor,
    model: String,
}

#[async_trait]
impl JsonFixer for ExecutorFixer<'_> {
    async fn fix(&self, broken: &str, schema: &ResponseSchema) -> VasariResult<Value> {
        let request = CompletionRequest::builder()
            .prompt(format!(
                "Please fix the following json object to match the schema:\n{}",
                broken
            ))
            .model(&self.model)
            .expectation(ResponseExpectation::Structured(schema.clone()))
            .build()?;
        // Fixing disabled: a failed fix ends here rather than recursing.
        match self.executor.run(request, false).await?.into_result() {
            StructuredResult::Structured(value) => Ok(value),
            StructuredResult::Text(_) => Err(StructuredError::new(
                StructuredErrorKind::Validation("fix call returned text".to_string()),
            )
            .into()),
        }
    }
}

/// The chat completion request body.
///
/// One user message holding the prompt and then each image. Provider routing
/// starts from `require_parameters: true` for schema requests and is
/// overlaid with the caller's preferences. Extra parameters are merged last
/// and win over everything else.
///
/// # Errors
///
/// Returns an image error if an image cannot be encoded.
pub fn build_payload(request: &CompletionRequest) -> VasariResult<Value> {
    let mut content = vec![json!({"type": "text", "text": request.prompt()})];
    for image in request.images() {
        content.push(image_content(image)?);
    }

    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(request.model()));
    payload.insert(
        "messages".to_string(),
        json!([{"role": "user", "content": content}]),
    );
    payload.insert("max_tokens".to_string(), json!(request.max_tokens()));
    payload.insert("temperature".to_string(), json!(request.temperature()));

    if let Some(format) = request.expectation().response_format() {
        payload.insert("response_format".to_string(), format);
    }

    let mut provider = Map::new();
    if request.expectation().schema().is_some() {
        provider.insert("require_parameters".to_string(), Value::Bool(true));
    }
    if let Some(routing) = request.provider() {
        provider.extend(routing.clone());
    }
    if !provider.is_empty() {
        payload.insert("provider".to_string(), Value::Object(provider));
    }

    for (key, value) in request.extra_params() {
        payload.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(payload))
}

/// Payload rendered for error messages, with image data elided.
fn summarize_payload(payload: &Value) -> String {
    let mut summary = payload.clone();
    if let Some(messages) = summary.get_mut("messages").and_then(Value::as_array_mut) {
        for message in messages {
            let Some(parts) = message.get_mut("content").and_then(Value::as_array_mut) else {
                continue;
            };
            for part in parts {
                if let Some(url) = part.pointer_mut("/image_url/url") {
                    *url = Value::String("<image elided>".to_string());
                }
            }
        }
    }
    truncate(&summary.to_string(), 2000)
}

#[derive(Serialize)]
struct RequestFingerprint<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    expectation: &'a ResponseExpectation,
    provider: &'a Option<Map<String, Value>>,
    extra_params: &'a Map<String, Value>,
    images: Vec<String>,
}

fn request_cache_key(request: &CompletionRequest) -> VasariResult<String> {
    let images = request
        .images()
        .iter()
        .map(|image| {
            let (width, height) = image.dimensions();
            let mut hasher = Sha256::new();
            hasher.update(image.image().as_bytes());
            format!("{}x{}:{}:{:x}", width, height, image.detail(), hasher.finalize())
        })
        .collect();
    cache_key(&RequestFingerprint {
        model: request.model(),
        prompt: request.prompt(),
        max_tokens: *request.max_tokens(),
        temperature: *request.temperature(),
        expectation: request.expectation(),
        provider: request.provider(),
        extra_params: request.extra_params(),
        images,
    })
}
