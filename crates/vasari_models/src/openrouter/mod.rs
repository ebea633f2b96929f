//! OpenRouter (and other OpenAI-compatible) endpoints.

mod client;
mod model_table;
mod response;

pub(crate) use client::truncate;
pub use client::{ChatTransport, HttpChatTransport};
pub use model_table::{
    OpenRouterArchitecture, OpenRouterModel, OpenRouterModelPricing, OpenRouterModelTable,
    OpenRouterTopProvider,
};
pub use response::{ChatChoice, ChatCompletionResponse, ChatMessage};
