//! Content-addressed JSON files.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use vasari_error::{CacheError, CacheErrorKind, VasariResult};

/// Stores one JSON document per key under `{root}/{namespace}/{hash[0:2]}/{hash}.json`.
#[derive(Debug, Clone)]
pub(crate) struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub(crate) fn new(root: &Path, namespace: &str) -> VasariResult<Self> {
        let dir = root.join(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;
        tracing::info!(path = %dir.display(), "Opened disk cache");
        Ok(Self { dir })
    }

    /// Path for a key. Keys are hashed so any string is a valid key.
    pub(crate) fn path_for(&self, key: &str) -> PathBuf {
        let hash = hash_hex(key.as_bytes());
        self.dir.join(&hash[0..2]).join(format!("{}.json", hash))
    }

    pub(crate) async fn load<V: DeserializeOwned>(&self, key: &str) -> VasariResult<Option<V>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            CacheError::new(CacheErrorKind::Serialization(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        tracing::debug!(path = %path.display(), "Loaded cache entry from disk");
        Ok(Some(value))
    }

    pub(crate) async fn store<V: Serialize>(&self, key: &str, value: &V) -> VasariResult<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(value).map_err(|e| {
            CacheError::new(CacheErrorKind::Serialization(e.to_string()))
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Write to temp file first, then rename so readers never see a partial entry
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            CacheError::new(CacheErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            CacheError::new(CacheErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored cache entry");
        Ok(())
    }

    pub(crate) async fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed cache entry"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache entry")
            }
        }
    }
}

pub(crate) fn hash_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
