//! Config Command
//!
//! Usage:
//!   apidocgen config show [-f json]
//!   apidocgen config path

use crate::cli::util::{CommandContext, to_json};
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective configuration (merged from all sources)
pub fn show(ctx: &CommandContext, format: &str) -> Result<()> {
    let rendered = if format == "json" {
        to_json(&ctx.config, false)?
    } else {
        ConfigLoader::render(&ctx.config)?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Show configuration file paths
pub fn path() -> Result<()> {
    println!("Configuration paths:");
    println!();

    match ConfigLoader::global_config_path() {
        Some(global) => {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        }
        None => println!("  Global:  (not available)"),
    }

    let project = ConfigLoader::project_config_path();
    let exists = if project.exists() { "✓" } else { "✗" };
    println!("  Project: {} {}", exists, project.display());
    Ok(())
}
