//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/apidocgen/config.toml)
//! 3. Project config (.apidocgen/config.toml)
//! 4. Environment variables (APIDOCGEN_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::constants::paths;
use crate::types::{DocGenError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Self::base();

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::finish(figment.merge(Self::env()))
    }

    /// Load configuration from a specific file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(DocGenError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::finish(Self::base().merge(Toml::file(path)).merge(Self::env()))
    }

    /// Render the effective configuration as TOML
    pub fn render(config: &Config) -> Result<String> {
        toml::to_string_pretty(config).map_err(|e| DocGenError::Config(e.to_string()))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/apidocgen/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join(paths::APP_NAME))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(paths::CONFIG_FILE))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(paths::PROJECT_DIR).join(paths::CONFIG_FILE)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// `APIDOCGEN_BATCH__MAX_CONCURRENCY` -> `batch.max_concurrency`
    fn env() -> Env {
        Env::prefixed(paths::ENV_PREFIX).split("__").lowercase(true)
    }

    fn finish(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| DocGenError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::FailureStrategy;
    use crate::config::CacheBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file_layers_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[cache]
backend = "memory"

[batch]
failure_strategy = "abort"

[parsers.openapi]
projectName = "Pets"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.batch.failure_strategy, FailureStrategy::Abort);
        assert_eq!(config.batch.max_concurrency, 4);
        assert_eq!(
            config.parser_config("openapi").unwrap()["projectName"],
            "Pets"
        );
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[batch]\nmax_concurrency = 0\n").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(DocGenError::Config(_))
        ));

        assert!(ConfigLoader::load_from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("APIDOCGEN_BATCH__MAX_CONCURRENCY", "9");
            jail.set_env("APIDOCGEN_DIFF__IGNORE_DESCRIPTIONS", "true");
            let config = ConfigLoader::finish(ConfigLoader::base().merge(ConfigLoader::env()))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.batch.max_concurrency, 9);
            assert!(config.diff.ignore_descriptions);
            Ok(())
        });
    }

    #[test]
    fn test_render_round_trips() {
        let config = Config::default();
        let rendered = ConfigLoader::render(&config).unwrap();
        assert!(rendered.contains("[cache]"));
        let back: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(back, config);
    }
}
