//! Content-Addressable Cache
//!
//! Memoizes parse and enhancement results under keys derived from the
//! content that produced them (see [`key`]).
//!
//! ## Sections
//!
//! - `CacheStore`: backend contract (memory, SQLite, tiered)
//! - `CacheEntry`: stored bytes plus insertion time and optional TTL
//! - `Cache`: facade used by the rest of the crate. Backend failures never
//!   leave it: reads degrade to a miss, writes to a no-op, both logged.
//!
//! Expired entries are never returned. Eviction is lazy on `get`/`has`, plus
//! an explicit `purge_expired` sweep that can run on a background interval.

pub mod key;
pub mod memory;
pub mod sqlite;
pub mod tiered;

pub use key::{CacheKey, canonicalize};
pub use memory::MemoryStore;
pub use sqlite::{PoolConfig, SqliteStore};
pub use tiered::TieredStore;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::CacheError;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

pub type SharedStore = Arc<dyn CacheStore>;

// =============================================================================
// Entry
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            value,
            inserted_at: Utc::now(),
            ttl,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl?).ok()?;
        self.inserted_at.checked_add_signed(ttl)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// =============================================================================
// Store Contract
// =============================================================================

/// Persistence backend for cache entries.
///
/// Implementations must make `set` atomic with respect to `get`: a reader
/// sees either the previous entry or the new one, never a partial write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch a live entry. Expired entries are evicted and reported absent.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn set(&self, entry: CacheEntry) -> CacheResult<()>;

    async fn has(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    async fn clear(&self) -> CacheResult<()>;

    /// Drop every expired entry, returning how many were removed
    async fn purge_expired(&self) -> CacheResult<usize>;

    /// Number of stored entries, expired ones included until purged
    async fn len(&self) -> CacheResult<usize>;
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Cache facade over a [`CacheStore`].
///
/// Cheap to clone; clones share the store and the counters.
#[derive(Clone)]
pub struct Cache {
    store: SharedStore,
    default_ttl: Option<Duration>,
    counters: Arc<CacheCounters>,
}

impl Cache {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            default_ttl: None,
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// In-memory cache, mostly for tests and one-shot CLI runs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// TTL applied when `set` is called without one
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.store.get(key.as_str()).await {
            Ok(Some(entry)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache hit");
                Some(entry.value)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.degraded("get", key, &e);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) {
        let entry = CacheEntry::new(key.as_str(), value, ttl.or(self.default_ttl));
        match self.store.set(entry).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.degraded("set", key, &e),
        }
    }

    pub async fn has(&self, key: &CacheKey) -> bool {
        match self.store.has(key.as_str()).await {
            Ok(present) => present,
            Err(e) => {
                self.degraded("has", key, &e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        match self.store.delete(key.as_str()).await {
            Ok(existed) => existed,
            Err(e) => {
                self.degraded("delete", key, &e);
                false
            }
        }
    }

    /// Remove every entry. Returns false when the backend failed.
    pub async fn clear(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => true,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.store.name(), error = %e, "cache clear failed");
                false
            }
        }
    }

    pub async fn purge_expired(&self) -> usize {
        match self.store.purge_expired().await {
            Ok(purged) => {
                if purged > 0 {
                    debug!(backend = self.store.name(), purged, "purged expired cache entries");
                }
                purged
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.store.name(), error = %e, "cache purge failed");
                0
            }
        }
    }

    /// Entry count, or 0 when the backend cannot answer
    pub async fn len(&self) -> usize {
        match self.store.len().await {
            Ok(n) => n,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.store.name(), error = %e, "cache size query failed");
                0
            }
        }
    }

    /// Read and decode a JSON value. Undecodable bytes count as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                self.degraded("decode", key, &CacheError::Serialization(e));
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => self.degraded("encode", key, &CacheError::Serialization(e)),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    /// Run `purge_expired` every `interval` until the handle is aborted
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.purge_expired().await;
            }
        })
    }

    fn degraded(&self, operation: &str, key: &CacheKey, error: &CacheError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        warn!(
            backend = self.store.name(),
            operation,
            key = %key,
            error = %error,
            "cache backend failure, continuing without cache"
        );
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.store.name())
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A backend that fails every call
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<CacheEntry>> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }

        async fn set(&self, _entry: CacheEntry) -> CacheResult<()> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }

        async fn clear(&self) -> CacheResult<()> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }

        async fn purge_expired(&self) -> CacheResult<usize> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }

        async fn len(&self) -> CacheResult<usize> {
            Err(CacheError::Backend("disk unplugged".to_string()))
        }
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::derive("openapi", name.as_bytes(), None)
    }

    #[test]
    fn test_entry_expiry() {
        let mut entry = CacheEntry::new("k", vec![1], Some(Duration::from_secs(10)));
        let now = entry.inserted_at;
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(10)));

        entry.ttl = None;
        assert!(!entry.is_expired_at(now + chrono::Duration::days(365)));
    }

    #[tokio::test]
    async fn test_facade_roundtrip_and_stats() {
        let cache = Cache::in_memory();
        let k = key("a");

        assert_eq!(cache.get(&k).await, None);
        cache.set(&k, b"value".to_vec(), None).await;
        assert_eq!(cache.get(&k).await, Some(b"value".to_vec()));
        assert!(cache.has(&k).await);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.errors, 0);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

        assert!(cache.delete(&k).await);
        assert!(!cache.has(&k).await);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = Cache::in_memory();
        let k = key("json");
        cache
            .set_json(&k, &serde_json::json!({"ok": true}), None)
            .await;
        let value: Option<serde_json::Value> = cache.get_json(&k).await;
        assert_eq!(value, Some(serde_json::json!({"ok": true})));

        cache.set(&k, b"not json".to_vec(), None).await;
        let value: Option<serde_json::Value> = cache.get_json(&k).await;
        assert_eq!(value, None);
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_backend_failures_degrade() {
        let cache = Cache::new(Arc::new(BrokenStore));
        let k = key("x");

        cache.set(&k, b"v".to_vec(), None).await;
        assert_eq!(cache.get(&k).await, None);
        assert!(!cache.has(&k).await);
        assert!(!cache.delete(&k).await);
        assert!(!cache.clear().await);
        assert_eq!(cache.purge_expired().await, 0);

        let stats = cache.stats();
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.errors, 6);
    }

    #[tokio::test]
    async fn test_default_ttl_applies() {
        let cache = Cache::in_memory().with_default_ttl(Some(Duration::from_millis(20)));
        let k = key("ttl");
        cache.set(&k, b"v".to_vec(), None).await;
        assert!(cache.has(&k).await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get(&k).await, None);
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::new(store.clone());
        cache
            .set(&key("short"), b"v".to_vec(), Some(Duration::from_millis(10)))
            .await;
        cache.set(&key("long"), b"v".to_vec(), None).await;

        let sweeper = cache.spawn_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        sweeper.abort();

        assert_eq!(store.len().await.unwrap(), 1);
    }
}
