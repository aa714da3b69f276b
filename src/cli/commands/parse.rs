//! Parse Command
//!
//! Normalizes one or more sources into canonical ASTs.
//!
//! Usage:
//!   apidocgen parse --type openapi api.yaml [more.yaml ...] [-o out.json]

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use crate::cli::util::{CommandContext, emit, to_json};
use crate::types::Result;

pub struct ParseArgs {
    pub type_tag: String,
    pub files: Vec<PathBuf>,
    pub parser_config: Option<Value>,
    pub output: Option<PathBuf>,
    pub compact: bool,
}

/// Returns whether every input parsed successfully
pub async fn run(ctx: &CommandContext, args: ParseArgs) -> Result<bool> {
    let pipeline = ctx.pipeline()?;
    let requests: Vec<_> = args
        .files
        .iter()
        .map(|path| ctx.request(&args.type_tag, path, args.parser_config.as_ref()))
        .collect();

    let results = pipeline.parse_many(&requests).await;
    let failed = results.iter().filter(|r| !r.is_success()).count();

    for result in results.iter().filter(|r| !r.is_success()) {
        for error in &result.errors {
            eprintln!(
                "✗ {}: {}",
                result.origin.as_deref().unwrap_or("<inline>"),
                error.message
            );
        }
    }

    let rendered = match results.as_slice() {
        [single] => to_json(single, args.compact)?,
        many => to_json(&many, args.compact)?,
    };
    emit(&rendered, args.output.as_deref())?;

    let stats = pipeline.cache().stats();
    info!(
        "Parse: {} inputs, {} failed (cache: {} hits, {} misses)",
        results.len(),
        failed,
        stats.hits,
        stats.misses
    );

    Ok(failed == 0)
}
