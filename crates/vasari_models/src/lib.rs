//! LLM completion pipeline for Vasari.
//!
//! This crate talks to OpenRouter and other OpenAI-compatible chat completion
//! endpoints and wraps each call with the rest of the pipeline:
//!
//! - [`ChatTransport`] / [`HttpChatTransport`]: posting payloads and
//!   classifying failures for the retry controller
//! - [`PricingTable`]: [`OpenRouterModelTable`] fetched from the API, or the
//!   built-in [`StaticPricingTable`]
//! - [`CostAccountant`] and [`CostSink`]: publishing per-call cost to a
//!   running [`CostAccumulator`], a [`BroadcastCostSink`], or metrics
//! - [`ImageNormalizer`]: shrinking images that are too large to upload
//! - [`StructuredResolver`]: fence stripping, validation, repair, and one
//!   corrective call for schema-constrained responses
//! - [`CompletionExecutor`]: all of the above for one request
//!
//! # Example
//!
//! ```no_run
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::sync::Arc;
//! use vasari_core::CompletionRequest;
//! use vasari_models::{CompletionExecutor, CostAccountant, CostAccumulator, OpenRouterModelTable};
//! use vasari_rate_limit::VasariConfig;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct Capital {
//!     city: String,
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VasariConfig::load()?;
//! let table = OpenRouterModelTable::fetch(&config.client.base_url, config.client.timeout()).await?;
//! let total = Arc::new(CostAccumulator::new());
//!
//! let executor = CompletionExecutor::from_config(
//!     &config,
//!     "openrouter",
//!     &std::env::var("OPENROUTER_API_KEY")?,
//!     "",
//!     Arc::new(table),
//!     CostAccountant::new().with_sink(total.clone()),
//! )?;
//!
//! let request = CompletionRequest::builder()
//!     .prompt("What is the capital of Japan?")
//!     .model("openai/gpt-4o")
//!     .build()?;
//! let capital: Capital = executor.complete_typed(request).await?;
//! println!("{} (spent ${:.4})", capital.city, total.total());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cost;
mod executor;
mod image;
mod metrics;
mod openrouter;
mod pricing;
mod structured;

pub use cost::{BroadcastCostSink, CostAccountant, CostAccumulator, CostSink, MetricsCostSink};
pub use executor::{
    COMPLETION_NAMESPACE, CompletionExecutor, CompletionExecutorBuilder, build_payload,
};
pub use image::{ImageNormalizer, encoded_size, image_content};
pub use metrics::{LlmMetrics, classify_error};
pub use openrouter::{
    ChatChoice, ChatCompletionResponse, ChatMessage, ChatTransport, HttpChatTransport,
    OpenRouterArchitecture, OpenRouterModel, OpenRouterModelPricing, OpenRouterModelTable,
    OpenRouterTopProvider,
};
pub use pricing::{PricingTable, StaticPricingTable};
pub use structured::{
    ExampleWriter, JsonFixer, SCHEMA_EXAMPLE_NAMESPACE, SchemaExampleProvider,
    StructuredResolver, example_prompt, repair_json, strip_code_fence,
};
