//! Cache configuration.
//!
//! Controls the content cache via the `[cache]` table of `dossier.toml`.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

const DEFAULT_TTL_SECS: u64 = 5 * 60;
const DEFAULT_MEMORY_LIMIT: usize = 512;
const DEFAULT_DIRECTORY: &str = ".dossier-cache";

/// Where cache entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Process-local LRU map; entries vanish on restart.
    Memory,
    /// One JSON file per entry under [`CacheConfig::directory`].
    Directory,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Disable to always go to the network.
    pub enabled: bool,
    pub backend: CacheBackendKind,
    /// Entries older than this are treated as missing and removed.
    pub ttl: Duration,
    /// Maximum entries held by the memory backend.
    pub memory_limit: usize,
    /// Root of the directory backend.
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            memory_limit: DEFAULT_MEMORY_LIMIT,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            ttl: settings.ttl,
            memory_limit: settings.memory_limit,
            directory: settings.directory.clone(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory limit as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// TTL in milliseconds, saturating at `i64::MAX`.
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.ttl_millis(), 300_000);
        assert_eq!(config.memory_limit, 512);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_limit_non_zero().get(), 1);
    }
}
