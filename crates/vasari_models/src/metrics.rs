//! Metrics for LLM API calls.
//!
//! OpenTelemetry instruments for request volume, failures, latency, token
//! usage and spend. Without an installed meter provider every instrument is a
//! no-op, so recording is always safe.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;
use vasari_error::{ProviderErrorKind, RetryClass, RetryableError, VasariError, VasariErrorKind};

static METRICS: OnceLock<LlmMetrics> = OnceLock::new();

/// Metrics for LLM API interactions.
///
/// Labeled with the upstream provider and model name.
#[derive(Clone)]
pub struct LlmMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Total completion requests
    pub requests: Counter<u64>,
    /// Failed completion requests
    pub errors: Counter<u64>,
    /// Completion call duration in seconds
    pub duration: Histogram<f64>,
    /// Total tokens used (prompt + completion)
    pub tokens_used: Counter<u64>,
    /// Prompt tokens used
    pub prompt_tokens: Counter<u64>,
    /// Completion tokens used
    pub completion_tokens: Counter<u64>,
    /// Spend in USD
    pub cost: Counter<f64>,
}

impl LlmMetrics {
    fn init() -> Self {
        let meter = global::meter("vasari_llm");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("llm.requests")
                .with_description("Total LLM completion requests")
                .build(),
            errors: meter
                .u64_counter("llm.errors")
                .with_description("Failed LLM completion requests")
                .build(),
            duration: meter
                .f64_histogram("llm.duration")
                .with_unit("seconds")
                .with_description("LLM completion call duration")
                .build(),
            tokens_used: meter
                .u64_counter("llm.tokens")
                .with_description("Total tokens used (prompt + completion)")
                .build(),
            prompt_tokens: meter
                .u64_counter("llm.tokens.prompt")
                .with_description("Prompt tokens used")
                .build(),
            completion_tokens: meter
                .u64_counter("llm.tokens.completion")
                .with_description("Completion tokens used")
                .build(),
            cost: meter
                .f64_counter("llm.cost")
                .with_unit("USD")
                .with_description("Spend on LLM completions")
                .build(),
        }
    }

    /// Get the global LLM metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a successful completion request.
    pub fn record_request(&self, provider: &str, model: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed completion request.
    pub fn record_error(&self, model: &str, error_type: &str) {
        let labels = &[
            KeyValue::new("model", model.to_string()),
            KeyValue::new("error_type", error_type.to_string()),
        ];
        self.errors.add(1, labels);
    }

    /// Record token usage from a response.
    pub fn record_tokens(
        &self,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    ) {
        let labels = &[KeyValue::new("model", model.to_string())];
        self.tokens_used.add(total_tokens, labels);
        self.prompt_tokens.add(prompt_tokens, labels);
        self.completion_tokens.add(completion_tokens, labels);
    }

    /// Record the cost of one completion.
    pub fn record_cost(&self, provider: &str, model: &str, usd: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.cost.add(usd, labels);
    }
}

impl Default for LlmMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}

/// Classify an error for metrics labeling.
///
/// Returns one of: "rate_limit", "timeout", "network", "auth",
/// "invalid_request", "provider", "schema", "pricing", "limiter", "unknown".
pub fn classify_error(error: &VasariError) -> &'static str {
    match error.retry_class() {
        Some(RetryClass::RateLimit) => return "rate_limit",
        Some(RetryClass::Timeout) => return "timeout",
        Some(RetryClass::Connection) => return "network",
        None => {}
    }

    match error.kind() {
        VasariErrorKind::Provider(e) => match &e.kind {
            ProviderErrorKind::Status { status: 401 | 403, .. } => "auth",
            ProviderErrorKind::Status { status: 400..=499, .. } => "invalid_request",
            _ => "provider",
        },
        VasariErrorKind::Structured(_) => "schema",
        VasariErrorKind::Pricing(_) => "pricing",
        VasariErrorKind::RateLimit(_) => "limiter",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vasari_error::{ProviderError, StructuredError, StructuredErrorKind};

    #[test]
    fn classifies_provider_failures() {
        let timeout: VasariError =
            ProviderError::new(ProviderErrorKind::Timeout("read".to_string())).into();
        assert_eq!(classify_error(&timeout), "timeout");

        let auth: VasariError = ProviderError::new(ProviderErrorKind::Status {
            status: 401,
            body: "bad key".to_string(),
        })
        .into();
        assert_eq!(classify_error(&auth), "auth");

        let bad: VasariError = ProviderError::new(ProviderErrorKind::Status {
            status: 422,
            body: "unsupported".to_string(),
        })
        .into();
        assert_eq!(classify_error(&bad), "invalid_request");
    }

    #[test]
    fn classifies_schema_failures() {
        let err: VasariError =
            StructuredError::new(StructuredErrorKind::Validation("x".to_string())).into();
        assert_eq!(classify_error(&err), "schema");
    }
}
