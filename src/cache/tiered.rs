//! Two-level store: a fast front tier in front of a persistent back tier.
//!
//! Reads go front first, then back; a back-tier hit is copied into the front
//! tier with its original insertion time and TTL so expiry stays consistent.
//! Writes go to both tiers, back tier first.

use async_trait::async_trait;
use tracing::debug;

use super::{CacheEntry, CacheResult, CacheStore, SharedStore};

pub struct TieredStore {
    front: SharedStore,
    back: SharedStore,
}

impl TieredStore {
    pub fn new(front: SharedStore, back: SharedStore) -> Self {
        Self { front, back }
    }
}

#[async_trait]
impl CacheStore for TieredStore {
    fn name(&self) -> &'static str {
        "tiered"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        if let Some(entry) = self.front.get(key).await? {
            return Ok(Some(entry));
        }
        let Some(entry) = self.back.get(key).await? else {
            return Ok(None);
        };
        debug!(
            front = self.front.name(),
            back = self.back.name(),
            "back-filling cache entry"
        );
        self.front.set(entry.clone()).await?;
        Ok(Some(entry))
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        self.back.set(entry.clone()).await?;
        self.front.set(entry).await
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        if self.front.has(key).await? {
            return Ok(true);
        }
        self.back.has(key).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let in_front = self.front.delete(key).await?;
        let in_back = self.back.delete(key).await?;
        Ok(in_front || in_back)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.front.clear().await?;
        self.back.clear().await
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let front = self.front.purge_expired().await?;
        let back = self.back.purge_expired().await?;
        Ok(front.max(back))
    }

    /// The back tier holds every entry the front tier does
    async fn len(&self) -> CacheResult<usize> {
        self.back.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, SqliteStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn tiers() -> (Arc<MemoryStore>, Arc<SqliteStore>, TieredStore) {
        let front = Arc::new(MemoryStore::new());
        let back = Arc::new(SqliteStore::open_in_memory().unwrap());
        let tiered = TieredStore::new(front.clone(), back.clone());
        (front, back, tiered)
    }

    #[tokio::test]
    async fn test_writes_reach_both_tiers() {
        let (front, back, tiered) = tiers();
        tiered.set(CacheEntry::new("k", b"v".to_vec(), None)).await.unwrap();

        assert!(front.has("k").await.unwrap());
        assert!(back.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_through_backfills_front() {
        let (front, back, tiered) = tiers();
        let entry = CacheEntry::new("cold", b"v".to_vec(), Some(Duration::from_secs(600)));
        let inserted_at = entry.inserted_at;
        back.set(entry).await.unwrap();
        assert!(!front.has("cold").await.unwrap());

        let hit = tiered.get("cold").await.unwrap().unwrap();
        assert_eq!(hit.value, b"v");

        let copied = front.get("cold").await.unwrap().unwrap();
        assert_eq!(copied.ttl, Some(Duration::from_secs(600)));
        // SQLite stores millisecond precision
        assert_eq!(
            copied.inserted_at.timestamp_millis(),
            inserted_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_delete_and_clear_cover_both_tiers() {
        let (front, back, tiered) = tiers();
        tiered.set(CacheEntry::new("a", vec![1], None)).await.unwrap();
        tiered.set(CacheEntry::new("b", vec![2], None)).await.unwrap();

        assert!(tiered.delete("a").await.unwrap());
        assert!(!front.has("a").await.unwrap());
        assert!(!back.has("a").await.unwrap());

        tiered.clear().await.unwrap();
        assert_eq!(tiered.len().await.unwrap(), 0);
        assert_eq!(front.len().await.unwrap(), 0);
    }
}
