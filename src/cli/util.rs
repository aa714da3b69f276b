//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::config::{Config, ConfigLoader};
use crate::parser::{ParseRequest, ParserRegistry, SourceDescriptor};
use crate::pipeline::Pipeline;
use crate::types::{DocGenError, Result};

/// Command execution context
///
/// Holds the resolved configuration. Commands open the cache and the
/// pipeline through it so every command sees the same settings.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Load the layered configuration, or a single file when one is given
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config })
    }

    pub fn open_cache(&self) -> Result<Cache> {
        debug!(
            "Opening {} cache at {}",
            self.config.cache.backend,
            self.config.cache.path.display()
        );
        self.config.cache.open()
    }

    /// Registry with every built-in parser behind the configured cache
    pub fn pipeline(&self) -> Result<Pipeline> {
        let registry = ParserRegistry::with_defaults()?;
        let cache = self.open_cache()?;
        Ok(Pipeline::new(Arc::new(registry), cache))
    }

    /// Build a parse request for `path`.
    ///
    /// An unreadable file still yields a request; the registry reports it
    /// as an unavailable source. `override_config` replaces the configured
    /// `parsers.<tag>` table.
    pub fn request(&self, type_tag: &str, path: &Path, override_config: Option<&Value>) -> ParseRequest {
        let source = match fs::read(path) {
            Ok(bytes) => SourceDescriptor::loaded(path, bytes),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                SourceDescriptor::file(path)
            }
        };

        let request = ParseRequest::new(type_tag, source);
        match override_config.or_else(|| self.config.parser_config(type_tag)) {
            Some(config) => request.with_config(config.clone()),
            None => request,
        }
    }
}

/// Parse a `--parser-config` argument as a JSON object
pub fn parse_json_arg(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(DocGenError::Config(
            "parser config must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Write `content` to `output`, or stdout when absent
pub fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
            eprintln!("✓ Wrote {}", path.display());
        }
        None => println!("{}", content.trim_end()),
    }
    Ok(())
}

pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(rendered)
}
