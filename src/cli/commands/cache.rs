//! Cache Command
//!
//! Maintenance of the parse and enhancement cache.
//!
//! Usage:
//!   apidocgen cache clear
//!   apidocgen cache purge

use crate::cli::util::CommandContext;
use crate::types::{DocGenError, Result};

/// Remove every entry from the configured cache
pub async fn clear(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.open_cache()?;
    let before = cache.len().await;

    if !cache.clear().await {
        return Err(DocGenError::Config(format!(
            "Failed to clear {} cache at {}",
            cache.backend(),
            ctx.config.cache.path.display()
        )));
    }

    println!("✓ Cleared {} cache ({} entries)", cache.backend(), before);
    Ok(())
}

/// Drop only the expired entries
pub async fn purge(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.open_cache()?;
    let removed = cache.purge_expired().await;
    println!("✓ Purged {} expired entries", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::{CacheBackend, Config};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clear_empties_persistent_cache() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.backend = CacheBackend::Sqlite;
        config.cache.path = dir.path().join("cache.db");
        let ctx = CommandContext { config };

        let cache = ctx.open_cache().unwrap();
        cache.set(&CacheKey::from_raw("a"), b"1".to_vec(), None).await;
        assert_eq!(cache.len().await, 1);

        clear(&ctx).await.unwrap();
        assert_eq!(ctx.open_cache().unwrap().len().await, 0);
    }
}
