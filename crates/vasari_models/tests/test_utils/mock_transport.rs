//! Scripted chat transport for executor tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use vasari_error::{ProviderError, ProviderErrorKind, VasariResult};
use vasari_models::ChatTransport;

/// A single mock response (body or error).
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body(Value),
    Error(ProviderErrorKind),
}

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always answer with the given body
    Success(Value),
    /// Always fail with the specified error
    Error(ProviderErrorKind),
    /// Answer with each response in turn, repeating the last one
    Sequence(Vec<MockResponse>),
}

/// Chat transport that answers from a script and records every payload.
pub struct MockTransport {
    behavior: MockBehavior,
    call_count: Arc<Mutex<usize>>,
    payloads: Arc<Mutex<Vec<Value>>>,
}

impl MockTransport {
    /// Transport that always answers with `content` (10 prompt, 1 completion token).
    pub fn new_success(content: &str) -> Self {
        Self::with_behavior(MockBehavior::Success(chat_body(content, 10, 1)))
    }

    /// Transport that always fails with `error`.
    pub fn new_error(error: ProviderErrorKind) -> Self {
        Self::with_behavior(MockBehavior::Error(error))
    }

    /// Transport answering with `responses` in order.
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self::with_behavior(MockBehavior::Sequence(responses))
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(Mutex::new(0)),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of payloads posted so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every payload posted so far.
    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }

    /// Text prompt of the `index`th payload.
    pub fn prompt(&self, index: usize) -> String {
        self.payloads()[index]["messages"][0]["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn post_chat(&self, payload: &Value) -> VasariResult<Value> {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count - 1
        };
        self.payloads.lock().unwrap().push(payload.clone());

        let response = match &self.behavior {
            MockBehavior::Success(body) => MockResponse::Body(body.clone()),
            MockBehavior::Error(kind) => MockResponse::Error(kind.clone()),
            MockBehavior::Sequence(responses) => responses
                .get(call)
                .or_else(|| responses.last())
                .cloned()
                .expect("sequence must not be empty"),
        };
        match response {
            MockResponse::Body(body) => Ok(body),
            MockResponse::Error(kind) => Err(ProviderError::new(kind).into()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Chat completion body answering with `content`.
pub fn chat_body(content: &str, prompt_tokens: u64, completion_tokens: u64) -> Value {
    json!({
        "id": "gen-mock",
        "provider": "OpenAI",
        "model": "openai/gpt-4o",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt_tokens,
            "completion_tokens": completion_tokens,
            "total_tokens": prompt_tokens + completion_tokens
        }
    })
}
