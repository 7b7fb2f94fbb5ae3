//! Content cache.
//!
//! Shadows every fetched manifest and post source under a versioned key with
//! a time-to-live, so repeated page views do not hit the content host.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"        # or "directory"
//! ttl_seconds = 300
//! memory_limit = 512
//! directory = ".dossier-cache"
//! ```

mod backend;
mod config;
mod keys;
mod lock;
mod store;

pub use backend::{BackendError, CacheBackend, DirectoryBackend, MemoryBackend};
pub use config::{CacheBackendKind, CacheConfig};
pub use keys::{BLOG_KEY_PREFIX, BlogCacheKey};
pub use store::{CacheStats, Clock, ContentCache, ManualClock, SystemClock};
