//! Configuration Types
//!
//! All configuration structures with sensible defaults, plus the adapters
//! that turn each section into the runtime options its component takes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::{BatchOptions, FailureStrategy};
use crate::cache::{Cache, MemoryStore, SharedStore, SqliteStore, TieredStore};
use crate::constants::{batch as batch_constants, cache as cache_constants, paths};
use crate::diff::DiffOptions;
use crate::types::{DocGenError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub diff: DiffConfig,

    /// Free-form parser configuration keyed by type tag
    pub parsers: BTreeMap<String, Value>,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DocGenError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_concurrency == 0 {
            return Err(DocGenError::Config(
                "batch.max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(DocGenError::Config(
                "cache.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        for (tag, value) in &self.parsers {
            if !value.is_object() {
                return Err(DocGenError::Config(format!(
                    "parsers.{} must be a table",
                    tag
                )));
            }
        }

        Ok(())
    }

    /// Parser configuration for `tag`, if any was configured
    pub fn parser_config(&self, tag: &str) -> Option<&Value> {
        self.parsers.get(tag)
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sqlite,
    /// Memory in front of SQLite
    #[default]
    Tiered,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Memory => write!(f, "memory"),
            CacheBackend::Sqlite => write!(f, "sqlite"),
            CacheBackend::Tiered => write!(f, "tiered"),
        }
    }
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "sqlite" => Ok(CacheBackend::Sqlite),
            "tiered" => Ok(CacheBackend::Tiered),
            _ => Err(format!(
                "Unknown cache backend: {}. Valid values: memory, sqlite, tiered",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// SQLite database file (sqlite and tiered backends)
    pub path: PathBuf,

    /// TTL applied when a write does not carry its own; 0 disables expiry
    pub default_ttl_secs: u64,

    /// How often the background sweeper purges expired entries
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: PathBuf::from(paths::PROJECT_DIR).join(cache_constants::DB_FILE_NAME),
            default_ttl_secs: cache_constants::DEFAULT_TTL_SECS,
            sweep_interval_secs: cache_constants::SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_secs > 0).then(|| Duration::from_secs(self.default_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Open the configured backend behind the degrading facade
    pub fn open(&self) -> Result<Cache> {
        let store: SharedStore = match self.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Sqlite => Arc::new(SqliteStore::open(&self.path)?),
            CacheBackend::Tiered => Arc::new(TieredStore::new(
                Arc::new(MemoryStore::new()),
                Arc::new(SqliteStore::open(&self.path)?),
            )),
        };
        Ok(Cache::new(store).with_default_ttl(self.default_ttl()))
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub failure_strategy: FailureStrategy,

    /// Per-item deadline; 0 disables it
    pub item_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: batch_constants::DEFAULT_MAX_CONCURRENCY,
            failure_strategy: FailureStrategy::default(),
            item_timeout_secs: batch_constants::DEFAULT_ITEM_TIMEOUT_SECS,
        }
    }
}

impl BatchConfig {
    pub fn options(&self) -> BatchOptions {
        let timeout =
            (self.item_timeout_secs > 0).then(|| Duration::from_secs(self.item_timeout_secs));
        BatchOptions::new(self.max_concurrency, self.failure_strategy).with_item_timeout(timeout)
    }
}

// =============================================================================
// Diff Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub ignore_descriptions: bool,
    pub include_schemas: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignore_descriptions: false,
            include_schemas: true,
        }
    }
}

impl DiffConfig {
    pub fn options(&self) -> DiffOptions {
        DiffOptions {
            ignore_descriptions: self.ignore_descriptions,
            include_schemas: self.include_schemas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Tiered);
        assert!(config.diff.include_schemas);
        assert_eq!(config.batch.options().max_concurrency, 4);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.batch.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(DocGenError::Config(_))));

        let mut config = Config::default();
        config.cache.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.parsers.insert("openapi".into(), json!("nope"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_durations_disable() {
        let mut config = Config::default();
        config.cache.default_ttl_secs = 0;
        config.batch.item_timeout_secs = 0;
        assert_eq!(config.cache.default_ttl(), None);
        assert_eq!(config.batch.options().item_timeout, None);

        config.batch.item_timeout_secs = 30;
        assert_eq!(
            config.batch.options().item_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("SQLite".parse::<CacheBackend>().unwrap(), CacheBackend::Sqlite);
        assert!("redis".parse::<CacheBackend>().is_err());
    }

    #[tokio::test]
    async fn test_open_each_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        for backend in [CacheBackend::Memory, CacheBackend::Sqlite, CacheBackend::Tiered] {
            let config = CacheConfig {
                backend,
                path: dir.path().join(format!("{}.db", backend)),
                ..CacheConfig::default()
            };
            let cache = config.open().unwrap();
            let key = crate::cache::CacheKey::from_raw("k");
            cache.set(&key, b"v".to_vec(), None).await;
            assert_eq!(cache.get(&key).await, Some(b"v".to_vec()));
        }
    }
}
