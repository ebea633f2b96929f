//! Pricing and the cost derived from a finished completion.

use crate::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price of one model, in USD per token.
///
/// # Examples
///
/// ```
/// use vasari_core::ModelPricing;
///
/// // List prices are often quoted per thousand tokens.
/// let pricing = ModelPricing::per_thousand(0.01, 0.03);
/// assert!((pricing.prompt() - 0.00001).abs() < 1e-12);
/// assert!((pricing.completion() - 0.00003).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    prompt: f64,
    completion: f64,
}

impl ModelPricing {
    /// Create pricing from per-token prices.
    pub fn new(prompt: f64, completion: f64) -> Self {
        Self { prompt, completion }
    }

    /// Create pricing from per-thousand-token prices.
    pub fn per_thousand(prompt: f64, completion: f64) -> Self {
        Self::new(prompt / 1000.0, completion / 1000.0)
    }

    /// USD per prompt token.
    pub fn prompt(&self) -> f64 {
        self.prompt
    }

    /// USD per completion token.
    pub fn completion(&self) -> f64 {
        self.completion
    }
}

/// Prompt, completion and total cost of one completion, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, derive_getters::Getters)]
pub struct CostBreakdown {
    prompt_cost: f64,
    completion_cost: f64,
    total_cost: f64,
}

/// Compute the cost of a completion.
///
/// Cost is linear in each token count: `prompt_tokens * prompt_price` plus
/// `completion_tokens * completion_price`.
///
/// # Examples
///
/// ```
/// use vasari_core::{ModelPricing, Usage, compute_cost};
///
/// let cost = compute_cost(&Usage::new(10, 1), &ModelPricing::new(0.001, 0.002));
/// assert!((cost.prompt_cost() - 0.01).abs() < 1e-12);
/// assert!((cost.completion_cost() - 0.002).abs() < 1e-12);
/// assert!((cost.total_cost() - 0.012).abs() < 1e-12);
/// ```
pub fn compute_cost(usage: &Usage, pricing: &ModelPricing) -> CostBreakdown {
    let prompt_cost = *usage.prompt_tokens() as f64 * pricing.prompt();
    let completion_cost = *usage.completion_tokens() as f64 * pricing.completion();
    CostBreakdown {
        prompt_cost,
        completion_cost,
        total_cost: prompt_cost + completion_cost,
    }
}

/// Cost of one completion together with a summary of where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CostRecord {
    /// Model the request was sent to
    model: String,
    /// Upstream provider that served it, when reported
    provider: Option<String>,
    /// Completion id, when reported
    completion_id: Option<String>,
    /// Token usage
    usage: Usage,
    /// Derived cost
    cost: CostBreakdown,
    /// When the record was created
    recorded_at: DateTime<Utc>,
}

impl CostRecord {
    /// Price a completion.
    pub fn new(
        model: impl Into<String>,
        provider: Option<String>,
        completion_id: Option<String>,
        usage: Usage,
        pricing: &ModelPricing,
    ) -> Self {
        Self {
            model: model.into(),
            provider,
            completion_id,
            cost: compute_cost(&usage, pricing),
            usage,
            recorded_at: Utc::now(),
        }
    }

    /// Total cost in USD.
    pub fn total_cost(&self) -> f64 {
        *self.cost.total_cost()
    }
}
