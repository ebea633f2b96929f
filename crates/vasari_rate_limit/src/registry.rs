//! Buckets by key.

use crate::{ProviderLimits, RateLimitKey, RateLimitManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use vasari_error::VasariResult;

/// Shared rate-limit buckets, one per [`RateLimitKey`].
///
/// Models without a bucket are not limited.
#[derive(Debug, Clone, Default)]
pub struct RateLimitRegistry {
    managers: HashMap<RateLimitKey, Arc<RateLimitManager>>,
}

impl RateLimitRegistry {
    /// An empty registry that limits nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one bucket per configured model for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured limit is invalid.
    #[instrument(skip(limits, api_key), fields(models = limits.models.len()))]
    pub fn from_limits(
        limits: &ProviderLimits,
        api_key: &str,
        organization: &str,
    ) -> VasariResult<Self> {
        let mut registry = Self::new();
        for (model, model_limits) in &limits.models {
            let key = RateLimitKey::new(api_key, organization, model, &limits.request_type);
            let manager = RateLimitManager::new(
                model,
                model_limits.max_tokens,
                model_limits.max_calls,
                Duration::from_secs(model_limits.window_secs),
            )?;
            registry.insert(key, manager);
        }
        debug!(buckets = registry.len(), "Built rate limit registry");
        Ok(registry)
    }

    /// Add or replace a bucket.
    pub fn insert(&mut self, key: RateLimitKey, manager: RateLimitManager) {
        self.managers.insert(key, Arc::new(manager));
    }

    /// The bucket for a key, if one is configured.
    pub fn get(&self, key: &RateLimitKey) -> Option<Arc<RateLimitManager>> {
        self.managers.get(key).cloned()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no bucket is configured.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
