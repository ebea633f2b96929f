//! Vasari - rate-limited, cost-accounted LLM completions
//!
//! Vasari sends chat completion requests to OpenRouter and other
//! OpenAI-compatible endpoints and takes care of what surrounds each call.
//!
//! # Features
//!
//! - **Rate Limiting**: sliding-window token and call budgets per account and model
//! - **Retries**: named policies for timeouts, dropped connections and provider rate limits
//! - **Cost Accounting**: every completion is priced and published to cost sinks
//! - **Structured Output**: schema-constrained requests with validation, repair
//!   and one corrective call
//! - **Images**: oversized images are shrunk before upload
//! - **Caching**: single-flight memoisation, optionally persisted to disk
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vasari::{
//!     CompletionExecutor, CompletionRequest, CostAccountant, CostAccumulator,
//!     OpenRouterModelTable, VasariConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VasariConfig::load()?;
//!     let table = OpenRouterModelTable::fetch(&config.client.base_url, config.client.timeout()).await?;
//!     let total = Arc::new(CostAccumulator::new());
//!     let executor = CompletionExecutor::from_config(
//!         &config,
//!         "openrouter",
//!         &std::env::var("OPENROUTER_API_KEY")?,
//!         "",
//!         Arc::new(table),
//!         CostAccountant::new().with_sink(total.clone()),
//!     )?;
//!
//!     let request = CompletionRequest::builder()
//!         .prompt("What is the capital of Japan?")
//!         .model("openai/gpt-4o")
//!         .build()?;
//!     println!("{:?}", executor.complete(request).await?);
//!     println!("Spent ${:.6}", total.total());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `vasari_error` - Error types
//! - `vasari_core` - Requests, results, usage and cost records
//! - `vasari_rate_limit` - Rate limiter, retry policies and configuration
//! - `vasari_cache` - Completion cache
//! - `vasari_models` - Transport, pricing, structured responses and the executor
//!
//! This crate (`vasari`) re-exports everything for convenience.

pub use vasari_cache::*;
pub use vasari_core::*;
pub use vasari_error::*;
pub use vasari_models::*;
pub use vasari_rate_limit::*;
