//! Configuration loading.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from vasari.toml)
//! - User overrides (~/.config/vasari/vasari.toml, then ./vasari.toml)
//! - Automatic merging with user values taking precedence

use crate::{RateLimitRegistry, RetryPreset};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};
use vasari_error::{ConfigError, ConfigErrorKind, VasariResult};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../vasari.toml");

/// Per-model sliding-window limits.
///
/// # Example
///
/// ```toml
/// [providers.openai.models."gpt-4"]
/// max_tokens = 10_000_000
/// max_calls = 10_000
/// window_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelLimits {
    /// Estimated tokens admitted per window
    pub max_tokens: u64,
    /// Calls admitted per window
    pub max_calls: u64,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    60
}

/// Rate limits for one provider account.
///
/// A provider whose API does not accept `vendor/model` ids names its own
/// structured-response models in `[providers.<name>.structured]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderLimits {
    /// Request type used in bucket keys
    #[serde(default = "default_request_type")]
    pub request_type: String,
    /// Limits by model id
    #[serde(default)]
    pub models: HashMap<String, ModelLimits>,
    /// Overrides the top-level `[structured]` models for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredConfig>,
}

fn default_request_type() -> String {
    "completion".to_string()
}

impl Default for ProviderLimits {
    fn default() -> Self {
        Self {
            request_type: default_request_type(),
            models: HashMap::new(),
            structured: None,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// API base URL, without the trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Transport timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry preset wrapped around each call
    #[serde(default)]
    pub retry: RetryPreset,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl ClientConfig {
    /// Transport timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            retry: RetryPreset::default(),
        }
    }
}

/// Models used by the structured-response helpers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StructuredConfig {
    /// Model that writes worked examples for a schema
    #[serde(default = "default_example_model")]
    pub example_model: String,
    /// Model that repairs responses that failed validation
    #[serde(default = "default_fix_model")]
    pub fix_model: String,
}

fn default_example_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_fix_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

impl Default for StructuredConfig {
    fn default() -> Self {
        Self {
            example_model: default_example_model(),
            fix_model: default_fix_model(),
        }
    }
}

/// On-disk cache location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory for persisted entries; memory only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Image preparation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Largest encoded image sent inline, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: usize,
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_image_bytes(),
        }
    }
}

/// Top-level Vasari configuration.
///
/// Loads configuration from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from vasari.toml)
/// 2. User override (~/.config/vasari/vasari.toml, then ./vasari.toml)
///
/// # Example
///
/// ```no_run
/// use vasari_rate_limit::VasariConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = VasariConfig::load()?;
/// let openai = config.provider("openai").unwrap();
/// println!("gpt-4 limits: {:?}", openai.models.get("gpt-4"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct VasariConfig {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Rate limits by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderLimits>,
    /// Structured-response helper models
    #[serde(default)]
    pub structured: StructuredConfig,
    /// Completion cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Image preparation
    #[serde(default)]
    pub images: ImageConfig,
}

impl VasariConfig {
    /// The bundled defaults alone, without user overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled file does not parse.
    pub fn bundled() -> VasariResult<Self> {
        Self::build(
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml)),
        )
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> VasariResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(ConfigErrorKind::Read {
                    path: path.as_ref().display().to_string(),
                    reason: e.to_string(),
                })
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())).into())
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (vasari.toml shipped with the library)
    /// 2. User config in home directory (~/.config/vasari/vasari.toml)
    /// 3. User config in current directory (./vasari.toml)
    ///
    /// User config files are optional and will be silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if any present file fails to parse.
    #[instrument]
    pub fn load() -> VasariResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/vasari/vasari.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("vasari").required(false));

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> VasariResult<Self> {
        builder
            .build()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Build(e.to_string())))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())).into())
    }

    /// Rate limits for a provider.
    #[instrument(skip(self))]
    pub fn provider(&self, name: &str) -> Option<&ProviderLimits> {
        let limits = self.providers.get(name);
        debug!(found = limits.is_some(), "Looking up provider limits");
        limits
    }

    /// Structured-response models for a provider, falling back to the
    /// top-level `[structured]` table.
    pub fn structured_for(&self, provider: &str) -> &StructuredConfig {
        self.providers
            .get(provider)
            .and_then(|limits| limits.structured.as_ref())
            .unwrap_or(&self.structured)
    }

    /// Buckets for one account of a provider.
    ///
    /// A provider without configured limits yields an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured limit is invalid.
    pub fn registry(
        &self,
        provider: &str,
        api_key: &str,
        organization: &str,
    ) -> VasariResult<RateLimitRegistry> {
        match self.provider(provider) {
            Some(limits) => RateLimitRegistry::from_limits(limits, api_key, organization),
            None => Ok(RateLimitRegistry::new()),
        }
    }
}
