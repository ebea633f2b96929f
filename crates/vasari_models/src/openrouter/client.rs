//! HTTP transport for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;
use tracing::{Span, debug, error, instrument, warn};
use vasari_error::{
    HttpError, HttpErrorKind, ProviderError, ProviderErrorKind, VasariError, VasariResult,
};
use vasari_rate_limit::{ClientConfig, parse_retry_after};

/// Sends one chat completion payload and returns the decoded response body.
///
/// Implementations classify failures into [`ProviderErrorKind`] so the retry
/// controller can decide what to wait out. A body that decodes but carries an
/// `error` object is returned as-is; the caller inspects it.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a chat completion request.
    async fn post_chat(&self, payload: &Value) -> VasariResult<Value>;

    /// Name used in logs and metrics.
    fn name(&self) -> &str {
        "openrouter"
    }
}

/// `reqwest`-backed transport posting to `{base_url}/chat/completions`.
#[derive(Clone)]
pub struct HttpChatTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpChatTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpChatTransport {
    /// Create a transport.
    ///
    /// # Errors
    ///
    /// Returns an HTTP error if the client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> VasariResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(HttpErrorKind::ClientBuild(e.to_string())))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a transport from the `[client]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an HTTP error if the client cannot be constructed.
    pub fn from_config(config: &ClientConfig, api_key: impl Into<String>) -> VasariResult<Self> {
        Self::new(&config.base_url, api_key, config.timeout())
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    #[instrument(skip(self, payload), fields(model = tracing::field::Empty))]
    async fn post_chat(&self, payload: &Value) -> VasariResult<Value> {
        Span::current().record("model", payload_model(payload));
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "Posting chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Chat completion request failed");
                classify_reqwest(&e)
            })?;

        let status = response.status();
        let retry_after_header = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read chat completion body");
            classify_reqwest(&e)
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_header.or_else(|| parse_retry_after(&body));
            warn!(status = %status, retry_after = ?retry_after, "Provider rate limit");
            return Err(ProviderError::new(ProviderErrorKind::RateLimited {
                message: body,
                retry_after,
            })
            .into());
        }

        if !status.is_success() {
            error!(status = %status, body = %body, "Provider returned an error status");
            return Err(ProviderError::new(ProviderErrorKind::Status {
                status: status.as_u16(),
                body,
            })
            .into());
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Response body is not JSON");
            ProviderError::new(ProviderErrorKind::MalformedResponse(format!(
                "{}: {}",
                e,
                truncate(&body, 500)
            )))
            .into()
        })
    }
}

/// Map a `reqwest` failure onto a provider error kind.
///
/// Timeouts and dropped connections are retryable. Requests that could not
/// even be built are not.
pub(crate) fn classify_reqwest(err: &reqwest::Error) -> VasariError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout(err.to_string())).into()
    } else if err.is_builder() {
        HttpError::new(HttpErrorKind::InvalidRequest(err.to_string())).into()
    } else if err.is_decode() {
        ProviderError::new(ProviderErrorKind::MalformedResponse(err.to_string())).into()
    } else {
        ProviderError::new(ProviderErrorKind::Connection(err.to_string())).into()
    }
}

/// Model id named in a chat payload, empty when absent.
pub(crate) fn payload_model(payload: &Value) -> &str {
    payload.get("model").and_then(Value::as_str).unwrap_or("")
}

pub(crate) fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut short: String = text.chars().take(limit).collect();
    short.push_str("...");
    short
}
