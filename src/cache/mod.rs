//! Cache layer
//!
//! In-memory TTL cache (moka). Values are stored as JSON so any
//! serialisable type can be cached under a string key.
//!
//! ```rust,ignore
//! use vastlywise::cache::{CacheLayer, MemoryCache};
//!
//! let cache = MemoryCache::with_ttl(Duration::from_secs(300));
//! cache.set("key", &"value").await?;
//! let value: Option<String> = cache.get("key").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic over the value type, so it is used through concrete types rather
/// than `dyn CacheLayer`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value; it expires after the cache's TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}
