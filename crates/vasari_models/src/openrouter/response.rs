//! Chat completion response body.

use serde::Deserialize;
use vasari_core::Usage;

/// The parts of a chat completion response the executor reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion id
    #[serde(default)]
    pub id: Option<String>,
    /// Upstream provider that served the request
    #[serde(default)]
    pub provider: Option<String>,
    /// Model that actually answered
    #[serde(default)]
    pub model: Option<String>,
    /// Generated choices
    pub choices: Vec<ChatChoice>,
    /// Token usage
    pub usage: Usage,
}

/// One generated choice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatChoice {
    /// The assistant message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    /// Text content; absent for some tool-call responses
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}
