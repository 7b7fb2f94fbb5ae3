//! Storage backends for the content cache.
//!
//! A backend is a plain string key/value store. Entry encoding, TTL and
//! error tolerance live in [`super::ContentCache`].

use std::{
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::backend";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache io error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BackendError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Persistent (or not) string storage keyed by cache key.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    async fn set(&self, key: &str, value: String) -> Result<(), BackendError>;

    async fn remove(&self, key: &str) -> Result<(), BackendError>;

    /// All stored keys with the byte length of their values.
    async fn entries(&self) -> Result<Vec<(String, usize)>, BackendError>;
}

/// In-process LRU map.
pub struct MemoryBackend {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(mutex_lock(&self.entries, SOURCE, "memory.get")
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        mutex_lock(&self.entries, SOURCE, "memory.set").put(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BackendError> {
        mutex_lock(&self.entries, SOURCE, "memory.remove").pop(key);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, usize)>, BackendError> {
        Ok(mutex_lock(&self.entries, SOURCE, "memory.entries")
            .iter()
            .map(|(key, value)| (key.clone(), value.len()))
            .collect())
    }
}

/// On-disk record. The key is kept alongside the value because file names
/// are hashes.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    key: String,
    value: String,
}

/// One JSON file per entry, named by the SHA-256 of the key.
///
/// Survives restarts, which lets `dossier cache stats` and
/// `dossier cache clear` act on the same store the server uses.
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    async fn read_record(path: &Path) -> Result<Option<StoredRecord>, BackendError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BackendError::io(path, err)),
        }
    }
}

#[async_trait]
impl CacheBackend for DirectoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key);
        let record = Self::read_record(&path).await?;
        Ok(record
            .filter(|record| record.key == key)
            .map(|record| record.value))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| BackendError::io(&self.root, err))?;

        let path = self.path_for(key);
        let record = StoredRecord {
            key: key.to_string(),
            value,
        };
        let bytes = serde_json::to_vec(&record)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| BackendError::io(&path, err))
    }

    async fn remove(&self, key: &str) -> Result<(), BackendError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BackendError::io(&path, err)),
        }
    }

    async fn entries(&self) -> Result<Vec<(String, usize)>, BackendError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(BackendError::io(&self.root, err)),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|err| BackendError::io(&self.root, err))?
        {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => entries.push((record.key, record.value.len())),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        target: "dossier::cache::backend",
                        path = %path.display(),
                        error = %err,
                        "Skipping unreadable cache record"
                    );
                }
            }
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_evicts_least_recent() {
        let backend = MemoryBackend::new(NonZeroUsize::new(2).expect("non-zero"));
        backend.set("a", "1".into()).await.expect("set a");
        backend.set("b", "2".into()).await.expect("set b");
        backend.get("a").await.expect("touch a");
        backend.set("c", "3".into()).await.expect("set c");

        assert_eq!(backend.get("b").await.expect("get b"), None);
        assert_eq!(backend.get("a").await.expect("get a").as_deref(), Some("1"));
        assert_eq!(backend.entries().await.expect("entries").len(), 2);
    }

    #[tokio::test]
    async fn directory_backend_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = DirectoryBackend::new(dir.path().join("cache"));
        first
            .set("blog-index-v1", "{\"x\":1}".into())
            .await
            .expect("set");

        let second = DirectoryBackend::new(dir.path().join("cache"));
        assert_eq!(
            second.get("blog-index-v1").await.expect("get").as_deref(),
            Some("{\"x\":1}")
        );
        assert_eq!(
            second.entries().await.expect("entries"),
            vec![("blog-index-v1".to_string(), 7)]
        );

        second.remove("blog-index-v1").await.expect("remove");
        assert_eq!(first.get("blog-index-v1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn directory_backend_missing_root_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = DirectoryBackend::new(dir.path().join("absent"));
        assert!(backend.entries().await.expect("entries").is_empty());
        assert_eq!(backend.get("k").await.expect("get"), None);
        backend.remove("k").await.expect("remove missing key");
    }

    #[tokio::test]
    async fn directory_backend_skips_corrupt_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = DirectoryBackend::new(dir.path());
        backend.set("good", "v".into()).await.expect("set");
        std::fs::write(dir.path().join("junk.json"), b"not json").expect("write junk");

        let entries = backend.entries().await.expect("entries");
        assert_eq!(entries, vec![("good".to_string(), 1)]);
    }
}
