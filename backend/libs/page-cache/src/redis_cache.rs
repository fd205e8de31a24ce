use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{CacheError, CacheResult, CachedPage, PageCache};

/// Redis-backed page cache
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a managed connection to `url`
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>> {
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str::<CachedPage>(&data) {
                Ok(page) => {
                    debug!(key = %key, "Page cache hit");
                    Ok(Some(page))
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupted page cache entry, dropping");
                    if let Err(e) = conn.del::<_, ()>(key).await {
                        warn!(key = %key, error = %e, "Failed to drop corrupted page cache entry");
                    }
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!(key = %key, "Page cache miss");
                Ok(None)
            }
            Err(e) => Err(CacheError::Redis(e)),
        }
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()> {
        let data = serde_json::to_string(page)?;
        // SETEX rejects zero, and a sub-second TTL still means "cache briefly"
        let seconds = ttl.as_secs().max(1);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, data, seconds).await?;

        debug!(key = %key, ttl_secs = seconds, "Page cache set");
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::InvalidData(format!(
                "unexpected PING response: {pong}"
            )))
        }
    }
}
