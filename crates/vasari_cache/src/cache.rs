//! Single-flight completion cache.

use crate::disk::{DiskStore, hash_hex};
use derive_getters::Getters;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use vasari_error::{CacheError, CacheErrorKind, VasariError, VasariResult};

/// Configuration for a completion cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CompletionCacheConfig {
    /// Sub-directory and log label for this cache
    #[serde(default = "default_namespace")]
    #[builder(default = "default_namespace()", setter(into))]
    namespace: String,

    /// Maximum number of entries held in memory
    #[serde(default = "default_max_capacity")]
    #[builder(default = "default_max_capacity()")]
    max_capacity: u64,

    /// Directory for persisted entries; memory only when unset
    #[serde(default)]
    #[builder(default)]
    root: Option<PathBuf>,
}

fn default_namespace() -> String {
    "completions".to_string()
}

fn default_max_capacity() -> u64 {
    10_000
}

impl Default for CompletionCacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_capacity: default_max_capacity(),
            root: None,
        }
    }
}

/// Stable key for any serializable description of a call.
///
/// # Errors
///
/// Returns a cache error if the parts cannot be serialized.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vasari_cache::cache_key;
///
/// let a = cache_key(&json!({"model": "gpt-4o", "prompt": "hi"})).unwrap();
/// let b = cache_key(&json!({"prompt": "hi", "model": "gpt-4o"})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn cache_key(parts: &impl Serialize) -> VasariResult<String> {
    let bytes = serde_json::to_vec(parts)
        .map_err(|e| CacheError::new(CacheErrorKind::Serialization(e.to_string())))?;
    Ok(hash_hex(&bytes))
}

/// Get-or-compute cache.
///
/// Concurrent callers asking for the same missing key share a single
/// computation. Successful values are kept in memory and, when a root
/// directory is configured, written to disk so other processes can reuse
/// them. Failed computations are not cached.
///
/// Two processes may still compute the same key at once; the last write wins.
///
/// # Example
///
/// ```
/// use vasari_cache::{CompletionCache, CompletionCacheConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> vasari_error::VasariResult<()> {
/// let cache: CompletionCache<String> = CompletionCache::new(&CompletionCacheConfig::default())?;
/// let value = cache
///     .get_or_try_insert_with("greeting", async {
///         Ok::<_, vasari_error::VasariError>("hello".to_string())
///     })
///     .await?;
/// assert_eq!(value, "hello");
/// assert_eq!(cache.get("greeting").await.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CompletionCache<V> {
    namespace: String,
    memory: Cache<String, V>,
    disk: Option<DiskStore>,
}

impl<V> std::fmt::Debug for CompletionCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCache")
            .field("namespace", &self.namespace)
            .field("disk", &self.disk)
            .finish_non_exhaustive()
    }
}

impl<V> CompletionCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk directory cannot be created.
    pub fn new(config: &CompletionCacheConfig) -> VasariResult<Self> {
        let disk = config
            .root
            .as_deref()
            .map(|root| DiskStore::new(root, &config.namespace))
            .transpose()?;

        tracing::debug!(
            namespace = %config.namespace,
            max_capacity = config.max_capacity,
            persistent = disk.is_some(),
            "Creating completion cache"
        );

        Ok(Self {
            namespace: config.namespace.clone(),
            memory: Cache::new(config.max_capacity),
            disk,
        })
    }

    /// Namespace this cache was created with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Return the cached value for `key`, or run `init` and cache its result.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`. Every caller that was waiting on
    /// the same computation receives a copy of it.
    #[tracing::instrument(skip(self, key, init), fields(namespace = %self.namespace))]
    pub async fn get_or_try_insert_with<F>(
        &self,
        key: impl Into<String>,
        init: F,
    ) -> VasariResult<V>
    where
        F: Future<Output = VasariResult<V>>,
    {
        let key = key.into();
        let disk = self.disk.as_ref();
        let disk_key = key.clone();

        self.memory
            .try_get_with(key, async move {
                if let Some(disk) = disk {
                    match disk.load::<V>(&disk_key).await {
                        Ok(Some(value)) => return Ok(value),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring unreadable cache entry");
                        }
                    }
                }

                tracing::debug!("Cache miss, computing value");
                let value = init.await?;

                if let Some(disk) = disk {
                    if let Err(e) = disk.store(&disk_key, &value).await {
                        tracing::warn!(error = %e, "Failed to persist cache entry");
                    }
                }
                Ok::<V, VasariError>(value)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Cached value for `key`, from memory or disk.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.memory.get(key).await {
            return Some(value);
        }
        let disk = self.disk.as_ref()?;
        match disk.load::<V>(key).await {
            Ok(Some(value)) => {
                self.memory.insert(key.to_string(), value.clone()).await;
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Store a value unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written to disk.
    pub async fn insert(&self, key: impl Into<String>, value: V) -> VasariResult<()> {
        let key = key.into();
        if let Some(disk) = &self.disk {
            disk.store(&key, &value).await?;
        }
        self.memory.insert(key, value).await;
        Ok(())
    }

    /// Drop a value from memory and disk.
    pub async fn invalidate(&self, key: &str) {
        self.memory.invalidate(key).await;
        if let Some(disk) = &self.disk {
            disk.remove(key).await;
        }
    }
}
