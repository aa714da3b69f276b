//! Diff Command
//!
//! Parses two versions of an API and reports what changed between them.
//!
//! Usage:
//!   apidocgen diff old.yaml new.yaml --type openapi [--format json]
//!   apidocgen diff v1.js v2.yaml --type express --new-type openapi

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::info;

use crate::cli::util::{CommandContext, emit, to_json};
use crate::ast::CanonicalAst;
use crate::diff::{DiffOptions, diff, render_markdown};
use crate::parser::ParseResult;
use crate::pipeline::Pipeline;
use crate::types::{DocGenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid format '{}'. Valid values: markdown, json",
                s
            )),
        }
    }
}

pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    pub type_tag: String,
    /// Type of the new side when it differs from the old one
    pub new_type_tag: Option<String>,
    pub parser_config: Option<Value>,
    pub format: ReportFormat,
    pub ignore_descriptions: bool,
    pub no_schemas: bool,
    pub output: Option<PathBuf>,
}

/// Returns whether the new version is incompatible with the old one:
/// any breaking change or any removal
pub async fn run(ctx: &CommandContext, args: DiffArgs) -> Result<bool> {
    let pipeline = ctx.pipeline()?;
    let new_type = args.new_type_tag.as_deref().unwrap_or(&args.type_tag);

    let old = load_ast(&pipeline, ctx, &args.type_tag, &args.old, args.parser_config.as_ref()).await?;
    let new = load_ast(&pipeline, ctx, new_type, &args.new, args.parser_config.as_ref()).await?;

    let configured = ctx.config.diff.options();
    let options = DiffOptions {
        ignore_descriptions: configured.ignore_descriptions || args.ignore_descriptions,
        include_schemas: configured.include_schemas && !args.no_schemas,
    };

    let result = diff(&old, &new, &options)?;
    info!(
        "Diff: {} changes ({} breaking)",
        result.summary.total_changes, result.summary.breaking_changes
    );

    let rendered = match args.format {
        ReportFormat::Markdown => render_markdown(&result),
        ReportFormat::Json => to_json(&result, false)?,
    };
    emit(&rendered, args.output.as_deref())?;

    Ok(result.has_breaking_changes() || result.summary.removals > 0)
}

async fn load_ast(
    pipeline: &Pipeline,
    ctx: &CommandContext,
    type_tag: &str,
    path: &Path,
    parser_config: Option<&Value>,
) -> Result<CanonicalAst> {
    let result = pipeline
        .parse(&ctx.request(type_tag, path, parser_config))
        .await;
    into_ast(result, path)
}

fn into_ast(result: ParseResult, path: &Path) -> Result<CanonicalAst> {
    match result.ast {
        Some(ast) if result.errors.is_empty() => Ok(ast),
        _ => {
            let reasons: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
            Err(DocGenError::parse(
                result.source_type,
                format!("{}: {}", path.display(), reasons.join("; ")),
            ))
        }
    }
}
