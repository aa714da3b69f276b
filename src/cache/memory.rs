//! In-process cache store backed by `DashMap`.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{CacheEntry, CacheResult, CacheStore};

/// Sharded concurrent map. Each `set` is a single atomic insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let now = Utc::now();
        // Removal happens only if the entry is still expired under the shard lock
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        let now = Utc::now();
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            return Ok(false);
        }
        Ok(self.entries.contains_key(key))
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store
            .set(CacheEntry::new("a", b"1".to_vec(), None))
            .await
            .unwrap();

        let entry = store.get("a").await.unwrap().unwrap();
        assert_eq!(entry.value, b"1");
        assert!(store.has("a").await.unwrap());

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let store = MemoryStore::new();
        store.set(CacheEntry::new("k", b"old".to_vec(), None)).await.unwrap();
        store.set(CacheEntry::new("k", b"new".to_vec(), None)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap().value, b"new");
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_lazily() {
        let store = MemoryStore::new();
        let mut entry = CacheEntry::new("gone", b"v".to_vec(), Some(Duration::from_secs(1)));
        entry.inserted_at -= chrono::Duration::seconds(5);
        store.set(entry).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert!(!store.has("gone").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_and_clear() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let mut entry = CacheEntry::new(format!("old-{i}"), vec![i], Some(Duration::from_secs(1)));
            entry.inserted_at -= chrono::Duration::seconds(10);
            store.set(entry).await.unwrap();
        }
        store.set(CacheEntry::new("fresh", vec![9], None)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 3);
        assert_eq!(store.len().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set(CacheEntry::new(format!("k{}", i % 4), vec![i], None))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.len().await.unwrap(), 4);
    }
}
