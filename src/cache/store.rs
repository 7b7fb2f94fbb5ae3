//! TTL-aware content cache.
//!
//! Values are stored as JSON [`CacheEntry`] envelopes carrying the write time.
//! Reads treat anything older than the TTL as missing and evict it. Every
//! failure (backend I/O, undecodable entries) degrades to a miss so a broken
//! cache never blocks a page from rendering.

use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use dossier_manifest_types::CacheEntry;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    backend::{BackendError, CacheBackend, DirectoryBackend, MemoryBackend},
    config::{CacheBackendKind, CacheConfig},
    keys::{BLOG_KEY_PREFIX, BlogCacheKey},
};

const TARGET: &str = "dossier::cache::store";

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

/// Manually advanced clock for tests and tooling.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Summary of the blog entries currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    /// Sum of stored value lengths in bytes.
    pub total_size: usize,
    pub entries: Vec<String>,
}

#[derive(Clone)]
pub struct ContentCache {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
    enabled: bool,
}

impl ContentCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            ttl_millis: config.ttl_millis(),
            enabled: config.enabled,
        }
    }

    /// Build the backend selected by `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Memory => {
                Arc::new(MemoryBackend::new(config.memory_limit_non_zero()))
            }
            CacheBackendKind::Directory => {
                Arc::new(DirectoryBackend::new(config.directory.clone()))
            }
        };
        Self::new(backend, config)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch a fresh value, or `None` when absent, expired or unreadable.
    pub async fn get<T: DeserializeOwned>(&self, key: &BlogCacheKey) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let storage_key = key.storage_key();
        let raw = match self.backend.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                record_miss(key);
                return None;
            }
            Err(BackendError::Encode(err)) => {
                warn!(target: TARGET, key = %storage_key, error = %err, "Discarding corrupt cache record");
                self.evict(&storage_key).await;
                record_miss(key);
                return None;
            }
            Err(err) => {
                warn!(target: TARGET, key = %storage_key, error = %err, "Cache read failed");
                record_miss(key);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(target: TARGET, key = %storage_key, error = %err, "Discarding corrupt cache entry");
                self.evict(&storage_key).await;
                record_miss(key);
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(entry.timestamp);
        if age > self.ttl_millis {
            debug!(target: TARGET, key = %storage_key, age_ms = age, "Cache entry expired");
            counter!("dossier_cache_expired_total", "kind" => key.kind()).increment(1);
            self.evict(&storage_key).await;
            record_miss(key);
            return None;
        }

        counter!("dossier_cache_hit_total", "kind" => key.kind()).increment(1);
        Some(entry.data)
    }

    /// Store a value stamped with the current time. Failures are logged and
    /// otherwise ignored.
    pub async fn set<T: Serialize>(&self, key: &BlogCacheKey, data: &T) {
        if !self.enabled {
            return;
        }

        let storage_key = key.storage_key();
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(target: TARGET, key = %storage_key, error = %err, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(err) = self.backend.set(&storage_key, raw).await {
            warn!(target: TARGET, key = %storage_key, error = %err, "Cache write failed");
        }
    }

    /// Remove every blog entry, leaving foreign keys untouched.
    ///
    /// Returns how many entries were removed.
    pub async fn clear(&self) -> Result<usize, BackendError> {
        let keys = self.blog_entries().await?;
        for (key, _) in &keys {
            self.backend.remove(key).await?;
        }
        debug!(target: TARGET, removed = keys.len(), "Cleared blog cache");
        Ok(keys.len())
    }

    pub async fn stats(&self) -> Result<CacheStats, BackendError> {
        let entries = self.blog_entries().await?;
        Ok(CacheStats {
            total_entries: entries.len(),
            total_size: entries.iter().map(|(_, size)| size).sum(),
            entries: entries.into_iter().map(|(key, _)| key).collect(),
        })
    }

    async fn evict(&self, storage_key: &str) {
        if let Err(err) = self.backend.remove(storage_key).await {
            warn!(target: TARGET, key = %storage_key, error = %err, "Failed to evict cache entry");
        }
    }

    async fn blog_entries(&self) -> Result<Vec<(String, usize)>, BackendError> {
        let mut entries: Vec<(String, usize)> = self
            .backend
            .entries()
            .await?
            .into_iter()
            .filter(|(key, _)| key.starts_with(BLOG_KEY_PREFIX))
            .collect();
        entries.sort();
        Ok(entries)
    }
}

fn record_miss(key: &BlogCacheKey) {
    counter!("dossier_cache_miss_total", "kind" => key.kind()).increment(1);
}
