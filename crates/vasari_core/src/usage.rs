//! Token usage reported by the provider.

use serde::{Deserialize, Serialize};

/// Token counts for one completion, as reported in the response `usage` object.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    derive_getters::Getters,
)]
pub struct Usage {
    /// Tokens consumed by the prompt
    prompt_tokens: u64,
    /// Tokens generated in the completion
    completion_tokens: u64,
    /// Total reported by the provider, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_tokens: Option<u64>,
}

impl Usage {
    /// Create a usage record.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: Some(prompt_tokens + completion_tokens),
        }
    }

    /// Total tokens, falling back to the sum when the provider omitted it.
    pub fn total(&self) -> u64 {
        self.total_tokens
            .unwrap_or(self.prompt_tokens + self.completion_tokens)
    }
}
