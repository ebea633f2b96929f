//! OpenRouter model catalogue and its per-model pricing.

use crate::PricingTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use vasari_core::ModelPricing;
use vasari_error::{
    HttpError, HttpErrorKind, PricingError, PricingErrorKind, RetryClass, VasariError, VasariResult,
};
use vasari_rate_limit::{Backoff, RetryPolicy};

use super::client::classify_reqwest;

/// Attempts made when fetching the model catalogue.
const FETCH_ATTEMPTS: usize = 5;

/// Model architecture description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRouterArchitecture {
    /// Input/output modality, e.g. `text+image->text`
    #[serde(default)]
    pub modality: Option<String>,
    /// Tokenizer family
    #[serde(default)]
    pub tokenizer: Option<String>,
    /// Instruction format, if any
    #[serde(default)]
    pub instruct_type: Option<String>,
}

/// Prices as published: decimal strings in USD per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRouterModelPricing {
    /// Price per prompt token
    pub prompt: String,
    /// Price per completion token
    pub completion: String,
    /// Price per image
    #[serde(default)]
    pub image: Option<String>,
    /// Price per request
    #[serde(default)]
    pub request: Option<String>,
}

impl OpenRouterModelPricing {
    /// Parse the token prices.
    ///
    /// # Errors
    ///
    /// Returns a pricing error naming the field that is not a number.
    pub fn to_pricing(&self, model: &str) -> VasariResult<ModelPricing> {
        let parse = |field: &str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| {
                VasariError::from(PricingError::new(PricingErrorKind::InvalidPrice {
                    model: model.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                }))
            })
        };
        Ok(ModelPricing::new(
            parse("prompt", &self.prompt)?,
            parse("completion", &self.completion)?,
        ))
    }
}

/// The provider OpenRouter prefers for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRouterTopProvider {
    /// Context window
    #[serde(default)]
    pub context_length: Option<u64>,
    /// Completion token ceiling
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,
    /// Whether requests are moderated
    #[serde(default)]
    pub is_moderated: bool,
}

/// One entry of the model catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRouterModel {
    /// Model id, e.g. `openai/gpt-4o`
    pub id: String,
    /// Display name
    pub name: String,
    /// Unix timestamp the model was added
    #[serde(default)]
    pub created: i64,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Context window
    #[serde(default)]
    pub context_length: Option<u64>,
    /// Architecture
    #[serde(default)]
    pub architecture: Option<OpenRouterArchitecture>,
    /// Prices
    pub pricing: OpenRouterModelPricing,
    /// Preferred provider
    #[serde(default)]
    pub top_provider: Option<OpenRouterTopProvider>,
    /// Per-request limits, passed through unparsed
    #[serde(default)]
    pub per_request_limits: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The catalogue returned by `GET {base}/models`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vasari_models::{OpenRouterModelTable, PricingTable};
///
/// let table: OpenRouterModelTable = serde_json::from_value(json!({
///     "data": [{
///         "id": "openai/gpt-4o",
///         "name": "GPT-4o",
///         "pricing": {"prompt": "0.0000025", "completion": "0.00001"}
///     }]
/// }))
/// .unwrap();
///
/// let pricing = table.pricing("openai/gpt-4o").unwrap();
/// assert!((pricing.prompt() - 0.0000025).abs() < 1e-15);
/// assert!(table.pricing("acme/unknown").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModelList", into = "ModelList")]
pub struct OpenRouterModelTable {
    data: Vec<OpenRouterModel>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct ModelList {
    data: Vec<OpenRouterModel>,
}

impl From<ModelList> for OpenRouterModelTable {
    fn from(list: ModelList) -> Self {
        Self::new(list.data)
    }
}

impl From<OpenRouterModelTable> for ModelList {
    fn from(table: OpenRouterModelTable) -> Self {
        ModelList { data: table.data }
    }
}

impl OpenRouterModelTable {
    /// Index a list of models by id.
    pub fn new(data: Vec<OpenRouterModel>) -> Self {
        let index = data
            .iter()
            .enumerate()
            .map(|(i, model)| (model.id.clone(), i))
            .collect();
        Self { data, index }
    }

    /// Fetch the catalogue from `{base_url}/models`.
    ///
    /// Timeouts and connection failures are retried, up to five attempts.
    ///
    /// # Errors
    ///
    /// Returns a pricing error if the catalogue cannot be fetched or decoded.
    #[instrument(skip_all, fields(base_url = %base_url))]
    pub async fn fetch(base_url: &str, timeout: Duration) -> VasariResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(HttpErrorKind::ClientBuild(e.to_string())))?;
        let url = format!("{}/models", base_url.trim_end_matches('/'));

        let policy = RetryPolicy::new(
            "model_table",
            [RetryClass::Timeout, RetryClass::Connection],
            Backoff::Exponential {
                initial: Duration::from_secs(1),
                cap: Duration::from_secs(10),
            },
        )
        .with_max_attempts(FETCH_ATTEMPTS);

        let client = &client;
        let url = url.as_str();
        let table = policy
            .run(move || async move {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| classify_reqwest(&e))?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(VasariError::from(PricingError::new(
                        PricingErrorKind::TableFetch(format!("HTTP {}: {}", status, body)),
                    )));
                }
                response.json::<OpenRouterModelTable>().await.map_err(|e| {
                    VasariError::from(PricingError::new(PricingErrorKind::TableFetch(
                        e.to_string(),
                    )))
                })
            })
            .await?;

        info!(models = table.len(), "Fetched model table");
        Ok(table)
    }

    /// Look up a model by id.
    pub fn model(&self, id: &str) -> Option<&OpenRouterModel> {
        self.index.get(id).and_then(|&i| self.data.get(i))
    }

    /// All models.
    pub fn models(&self) -> &[OpenRouterModel] {
        &self.data
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PricingTable for OpenRouterModelTable {
    fn pricing(&self, model: &str) -> VasariResult<ModelPricing> {
        let entry = self.model(model).ok_or_else(|| {
            PricingError::new(PricingErrorKind::UnknownModel(model.to_string()))
        })?;
        entry.pricing.to_pricing(model)
    }
}
