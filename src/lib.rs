//! apidocgen - API Description Normalizer
//!
//! Turns heterogeneous API descriptions (OpenAPI and Swagger documents,
//! Express routes, JSDoc annotations, Python and Go handlers, GraphQL SDL)
//! into one canonical AST, caches the results, enriches endpoints through
//! an AI collaborator in bounded batches, and diffs two versions with
//! breaking-change classification.
//!
//! ## Quick Start
//!
//! ```ignore
//! use apidocgen::{Cache, ParseRequest, ParserRegistry, Pipeline, SourceDescriptor};
//!
//! let registry = Arc::new(ParserRegistry::with_defaults()?);
//! let pipeline = Pipeline::new(registry, Cache::in_memory());
//! let result = pipeline
//!     .parse(&ParseRequest::new("openapi", SourceDescriptor::loaded("api.yaml", bytes)))
//!     .await;
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: source parsers and the type-tag registry
//! - [`ast`]: the canonical AST
//! - [`cache`]: memory, SQLite and tiered result caches
//! - [`batch`]: bounded-concurrency AI batches
//! - [`ai`]: collaborator and provider seams
//! - [`diff`]: version comparison and Markdown reports
//! - [`pipeline`]: cached parsing and AST enhancement
//! - [`config`]: layered configuration

pub mod ai;
pub mod ast;
pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod diff;
pub mod parser;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{AiServiceError, DiffError, DocGenError, ErrorCategory, Result};

pub use ast::{CanonicalAst, Endpoint, HttpMethod, Schema};
pub use parser::{ParseRequest, ParseResult, ParserRegistry, SourceDescriptor, SourceType};
pub use pipeline::{Enhancement, Pipeline};

pub use cache::{Cache, CacheKey, CacheStore, MemoryStore, SqliteStore, TieredStore};

pub use ai::{AiCollaborator, AiRequest, AiResponse, ItemKind, LlmProvider, ProviderCollaborator};
pub use batch::{Batch, BatchItem, BatchOptions, BatchOrchestrator, BatchResult, FailureStrategy};

pub use diff::{DiffChange, DiffOptions, DiffResult, diff, render_markdown};
