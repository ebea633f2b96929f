//! Core data types for the Vasari LLM completion pipeline.
//!
//! This crate provides the foundation data types shared by every Vasari crate:
//! completion requests, the expected response shape, token usage, pricing and
//! the cost record derived from a finished completion.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod completion;
mod cost;
mod expectation;
mod image;
mod request;
mod result;
mod telemetry;
mod usage;

pub use completion::Completion;
pub use cost::{CostBreakdown, CostRecord, ModelPricing, compute_cost};
pub use expectation::{ResponseExpectation, ResponseSchema};
pub use image::{ImageDetail, ImageInput};
pub use request::{CompletionRequest, CompletionRequestBuilder};
pub use result::StructuredResult;
pub use telemetry::{LogFormat, init_telemetry};
pub use usage::Usage;
