//! Persistent cache store on SQLite with connection pooling.
//!
//! - Connection pooling via r2d2 so concurrent lookups do not serialize
//! - WAL mode so readers never block the writer
//! - Every write is one `INSERT OR REPLACE`, so a reader sees the old row or
//!   the new row and nothing in between
//! - Blocking calls run on tokio's blocking pool

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use super::{CacheEntry, CacheResult, CacheStore};
use crate::constants::cache as cache_constants;
use crate::types::CacheError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key         TEXT PRIMARY KEY,
    value       BLOB NOT NULL,
    inserted_at INTEGER NOT NULL,
    ttl_ms      INTEGER,
    expires_at  INTEGER
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
"#;

/// Connection pool configuration
///
/// Pool size is dynamically calculated based on CPU cores.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    /// Minimum pool size regardless of CPU count
    const MIN_POOL_SIZE: u32 = 2;
    /// Maximum pool size regardless of CPU count
    const MAX_POOL_SIZE: u32 = 16;

    /// Formula: clamp(cores, MIN, MAX). Cache lookups are short, one
    /// connection per core is plenty.
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        cores.clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: cache_constants::POOL_CONNECTION_TIMEOUT_SECS,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// SQLite-backed [`CacheStore`]
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (creating if needed) the cache database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> CacheResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Backend(format!("Failed to create cache directory: {}", e)))?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)
            .map_err(|e| CacheError::Pool(format!("Failed to create connection pool: {}", e)))?;

        let store = Self { pool };
        store.initialize()?;
        Ok(store)
    }

    /// In-memory database, one connection so every caller sees the same data
    pub fn open_in_memory() -> CacheResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| CacheError::Pool(format!("Failed to create in-memory pool: {}", e)))?;

        let store = Self { pool };
        store.initialize()?;
        Ok(store)
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;
            PRAGMA busy_timeout = {};
            PRAGMA wal_autocheckpoint = 1000;
            "#,
            cache_constants::BUSY_TIMEOUT_MS
        ))?;
        Ok(())
    }

    fn initialize(&self) -> CacheResult<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| CacheError::Pool(format!("Failed to acquire database connection: {}", e)))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` with a pooled connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> CacheResult<T>
    where
        F: FnOnce(&Connection) -> CacheResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| {
                CacheError::Pool(format!("Failed to acquire database connection: {}", e))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))?
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let now = to_millis(Utc::now());
            let evicted = conn.execute(
                "DELETE FROM cache_entries WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
                params![key, now],
            )?;
            if evicted > 0 {
                return Ok(None);
            }

            let row = conn
                .query_row(
                    "SELECT value, inserted_at, ttl_ms FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<i64>>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(|(value, inserted_at, ttl_ms)| CacheEntry {
                key: key.clone(),
                value,
                inserted_at: from_millis(inserted_at),
                ttl: ttl_ms.map(|ms| Duration::from_millis(ms.max(0) as u64)),
            }))
        })
        .await
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        self.with_conn(move |conn| {
            let ttl_ms = entry.ttl.map(|ttl| ttl.as_millis().min(i64::MAX as u128) as i64);
            let expires_at = entry.expires_at().map(to_millis);
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, inserted_at, ttl_ms, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.key,
                    entry.value,
                    to_millis(entry.inserted_at),
                    ttl_ms,
                    expires_at
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let now = to_millis(Utc::now());
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM cache_entries
                     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                conn.execute(
                    "DELETE FROM cache_entries WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
                    params![key, now],
                )?;
            }
            Ok(found.is_some())
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> CacheResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries", [])?;
            Ok(())
        })
        .await
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        self.with_conn(|conn| {
            let now = to_millis(Utc::now());
            let purged = conn.execute(
                "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )?;
            Ok(purged)
        })
        .await
    }

    async fn len(&self) -> CacheResult<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }
}
