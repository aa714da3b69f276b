//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Cache layer constants
pub mod cache {
    /// Default lifetime of a cached entry (7 days)
    pub const DEFAULT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

    /// Interval between background sweeps of expired entries
    pub const SWEEP_INTERVAL_SECS: u64 = 300;

    /// Timeout for acquiring a pooled SQLite connection
    pub const POOL_CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// SQLite busy timeout applied to every connection
    pub const BUSY_TIMEOUT_MS: u64 = 5000;

    /// File name of the persistent cache inside the project directory
    pub const DB_FILE_NAME: &str = "cache.db";
}

/// Batch orchestrator constants
pub mod batch {
    /// Items in flight when the caller does not say otherwise
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

    /// Per-item timeout applied by the CLI and config defaults (seconds)
    pub const DEFAULT_ITEM_TIMEOUT_SECS: u64 = 120;
}

/// AI collaborator constants
pub mod ai {
    /// Upper bound on the JSON payload embedded into a prompt (characters)
    pub const MAX_PAYLOAD_CHARS: usize = 12_000;

    /// Confidence reported when a provider omits one
    pub const DEFAULT_CONFIDENCE: f32 = 0.5;
}

/// Parser constants
pub mod parser {
    /// Group name for endpoints without tags
    pub const DEFAULT_GROUP: &str = "default";

    /// Preferred media type for request and response bodies
    pub const JSON_MEDIA_TYPE: &str = "application/json";
}

/// Project layout constants
pub mod paths {
    /// Per-project state directory
    pub const PROJECT_DIR: &str = ".apidocgen";

    /// Config file name inside the project and global config directories
    pub const CONFIG_FILE: &str = "config.toml";

    /// Application name used for the global config directory
    pub const APP_NAME: &str = "apidocgen";

    /// Prefix of environment variable overrides
    pub const ENV_PREFIX: &str = "APIDOCGEN_";
}
