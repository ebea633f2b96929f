//! Bucket identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifies one rate-limit bucket.
///
/// The API key is reduced to a SHA-256 fingerprint on construction, so keys
/// can be logged and printed without exposing the credential.
///
/// # Examples
///
/// ```
/// use vasari_rate_limit::RateLimitKey;
///
/// let key = RateLimitKey::new("sk-secret", "org-1", "gpt-4", "completion");
/// assert!(!format!("{:?}", key).contains("sk-secret"));
/// assert_eq!(key, RateLimitKey::new("sk-secret", "org-1", "gpt-4", "completion"));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_getters::Getters,
)]
pub struct RateLimitKey {
    credential_id: String,
    organization: String,
    model_name: String,
    request_type: String,
}

impl RateLimitKey {
    /// Build a key from a raw API key.
    pub fn new(
        api_key: &str,
        organization: impl Into<String>,
        model_name: impl Into<String>,
        request_type: impl Into<String>,
    ) -> Self {
        Self {
            credential_id: fingerprint(api_key),
            organization: organization.into(),
            model_name: model_name.into(),
            request_type: request_type.into(),
        }
    }

    /// Same bucket scope, different model.
    pub fn for_model(&self, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..self.clone()
        }
    }
}

fn fingerprint(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}
