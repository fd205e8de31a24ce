use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::{CacheResult, CachedPage, PageCache};

/// Process-local page cache
///
/// Expired entries are dropped when their key is read again and swept on
/// every write, so distinct URLs cannot accumulate past their lifetime.
#[derive(Default)]
pub struct MemoryPageCache {
    entries: DashMap<String, (Instant, CachedPage)>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, page) = entry.value();
            if *expires_at > now {
                debug!(key = %key, "Page cache hit");
                return Ok(Some(page.clone()));
            }
        }

        self.entries
            .remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        debug!(key = %key, "Page cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        let swept = before.saturating_sub(self.entries.len());

        self.entries
            .insert(key.to_string(), (now + ttl, page.clone()));
        debug!(key = %key, ttl_secs = ttl.as_secs(), swept, "Page cache set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> CachedPage {
        CachedPage::new(200, None, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = MemoryPageCache::new();
        cache
            .set("k", &page("first"), Duration::from_secs(20))
            .await
            .unwrap();

        let hit = cache.get("k").await.unwrap();
        assert_eq!(hit, Some(page("first")));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryPageCache::new();
        cache
            .set("k", &page("first"), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_are_swept_by_other_writes() {
        let cache = MemoryPageCache::new();
        for i in 0..500 {
            cache
                .set(&format!("/?x={}", i), &page("junk"), Duration::from_millis(5))
                .await
                .unwrap();
        }
        cache
            .set("/", &page("index"), Duration::from_secs(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        for _ in 0..10 {
            assert_eq!(cache.get("/").await.unwrap(), Some(page("index")));
            cache
                .set("/?page=2", &page("second"), Duration::from_secs(20))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
