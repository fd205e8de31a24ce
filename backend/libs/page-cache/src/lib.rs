//! Whole-page response cache
//!
//! Stores fully rendered HTTP responses for a fixed time window:
//! - Versioned key schema derived from a static prefix and the request URL
//! - Redis backend (`SET ... EX`) for multi-process deployments
//! - In-memory backend with per-entry expiry for single-process runs and tests
//!
//! Entries are never invalidated on write; they simply expire.

mod error;
mod keys;
mod memory;
mod redis_cache;

pub use error::{CacheError, CacheResult};
pub use keys::{PageKey, CACHE_VERSION};
pub use memory::MemoryPageCache;
pub use redis_cache::RedisPageCache;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Shared handle used by services and middleware
pub type SharedPageCache = Arc<dyn PageCache>;

/// A rendered response as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

impl CachedPage {
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }
}

/// Core page cache operations
#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    /// Fetch a live entry, `None` on miss or expiry
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>>;

    /// Store an entry for exactly `ttl`
    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()>;

    /// Backend liveness probe
    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
