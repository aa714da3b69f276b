use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apidocgen::cli::CommandContext;
use apidocgen::cli::commands::diff::{DiffArgs, ReportFormat};
use apidocgen::cli::commands::parse::ParseArgs;

/// Exit status when a diff finds incompatible changes under --fail-on-breaking
const EXIT_INCOMPATIBLE: u8 = 2;

#[derive(Parser)]
#[command(name = "apidocgen")]
#[command(
    version,
    about = "Normalize API descriptions into a canonical AST and diff versions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load this config file instead of the global/project chain
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse sources into the canonical AST (JSON)
    Parse {
        #[arg(long = "type", short = 't', help = "Source type tag (openapi, swagger, express, jsdoc, python, go, graphql)")]
        type_tag: String,
        #[arg(required = true, help = "Source files")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Parser configuration as a JSON object")]
        parser_config: Option<String>,
        #[arg(long, short, help = "Write the result here instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Single-line JSON")]
        compact: bool,
    },

    /// Compare two versions of an API
    Diff {
        old: PathBuf,
        new: PathBuf,
        #[arg(long = "type", short = 't', help = "Source type tag of both versions")]
        type_tag: String,
        #[arg(long, help = "Source type tag of the new version, if different")]
        new_type: Option<String>,
        #[arg(long, help = "Parser configuration as a JSON object")]
        parser_config: Option<String>,
        #[arg(short = 'f', long, default_value = "markdown", help = "Output format: markdown, json")]
        format: ReportFormat,
        #[arg(long, help = "Ignore summary and description changes")]
        ignore_descriptions: bool,
        #[arg(long, help = "Skip schema comparison")]
        no_schemas: bool,
        #[arg(long, help = "Exit with status 2 on breaking changes or removals")]
        fail_on_breaking: bool,
        #[arg(long, short, help = "Write the report here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// List registered source types and parser capabilities
    Parsers {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached entry
    Clear,
    /// Remove expired entries only
    Purge,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Commands that need no configuration
    match &cli.command {
        Commands::Config {
            action: ConfigAction::Path,
        } => {
            apidocgen::cli::commands::config::path()?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Parsers { format } => {
            apidocgen::cli::commands::parsers::run(format)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let ctx = CommandContext::load(cli.config.as_deref())?;

    let code = match cli.command {
        Commands::Parse {
            type_tag,
            files,
            parser_config,
            output,
            compact,
        } => {
            let parser_config = parser_config
                .as_deref()
                .map(apidocgen::cli::parse_json_arg)
                .transpose()?;
            let ok = apidocgen::cli::commands::parse::run(
                &ctx,
                ParseArgs {
                    type_tag,
                    files,
                    parser_config,
                    output,
                    compact,
                },
            )
            .await?;
            if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Commands::Diff {
            old,
            new,
            type_tag,
            new_type,
            parser_config,
            format,
            ignore_descriptions,
            no_schemas,
            fail_on_breaking,
            output,
        } => {
            let parser_config = parser_config
                .as_deref()
                .map(apidocgen::cli::parse_json_arg)
                .transpose()?;
            let incompatible = apidocgen::cli::commands::diff::run(
                &ctx,
                DiffArgs {
                    old,
                    new,
                    type_tag,
                    new_type_tag: new_type,
                    parser_config,
                    format,
                    ignore_descriptions,
                    no_schemas,
                    output,
                },
            )
            .await?;
            if incompatible && fail_on_breaking {
                ExitCode::from(EXIT_INCOMPATIBLE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::Cache { action } => {
            match action {
                CacheAction::Clear => apidocgen::cli::commands::cache::clear(&ctx).await?,
                CacheAction::Purge => apidocgen::cli::commands::cache::purge(&ctx).await?,
            }
            ExitCode::SUCCESS
        }
        Commands::Config { action } => {
            if let ConfigAction::Show { format } = action {
                apidocgen::cli::commands::config::show(&ctx, &format)?;
            }
            ExitCode::SUCCESS
        }
        Commands::Parsers { .. } => ExitCode::SUCCESS,
    };

    Ok(code)
}
