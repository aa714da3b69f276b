//! Source Parsers
//!
//! One parser per supported source type, all emitting the canonical AST.
//!
//! ## Parser Factory
//!
//! Use `create_parser` for a single source type, or `ParserRegistry::with_defaults`
//! for the full tag → parser table:
//!
//! ```rust,ignore
//! use apidocgen::parser::{ParseRequest, ParserRegistry, SourceDescriptor};
//!
//! let registry = ParserRegistry::with_defaults()?;
//! let request = ParseRequest::new("openapi", SourceDescriptor::inline(spec_bytes));
//! let result = registry.parse(&request);
//! ```
//!
//! Parsers are pure: given the same content and configuration they return a
//! structurally identical `ParseOutput`, which is what makes results cacheable.

pub mod go;
pub mod graphql;
pub mod javascript;
pub mod openapi;
pub mod python;
pub mod registry;
pub mod resolve;
pub mod treesitter;

pub use go::GoParser;
pub use graphql::GraphQlParser;
pub use javascript::{ExpressParser, JsDocParser};
pub use openapi::OpenApiParser;
pub use python::PythonParser;
pub use registry::{ParseRequest, ParseResult, ParseStatus, ParserRegistry, SourceDescriptor};
pub use resolve::find_broken_references;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::{CanonicalAst, Endpoint, TypeRef};
use crate::types::{Result, json_string};

/// Shared parser for thread-safe access
pub type SharedParser = Arc<dyn SourceParser>;

// =============================================================================
// Source Types
// =============================================================================

/// Closed set of supported source types. Adding a type means adding a variant
/// here and a parser module, never touching the registry's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    OpenApi,
    Swagger,
    Express,
    JsDoc,
    Python,
    Go,
    GraphQl,
}

impl SourceType {
    pub const ALL: [SourceType; 7] = [
        SourceType::OpenApi,
        SourceType::Swagger,
        SourceType::Express,
        SourceType::JsDoc,
        SourceType::Python,
        SourceType::Go,
        SourceType::GraphQl,
    ];

    /// Registry tag for this source type
    pub fn tag(&self) -> &'static str {
        match self {
            Self::OpenApi => "openapi",
            Self::Swagger => "swagger",
            Self::Express => "express",
            Self::JsDoc => "jsdoc",
            Self::Python => "python",
            Self::Go => "go",
            Self::GraphQl => "graphql",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// Parse Input / Output
// =============================================================================

/// Configuration keys understood by every parser
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserConfig {
    pub project_name: Option<String>,
    pub project_version: Option<String>,
    /// Tag applied to endpoints that declare none
    pub default_tag: Option<String>,
    /// Full configuration object as supplied
    pub raw: Value,
}

impl ParserConfig {
    pub fn from_value(value: Option<&Value>) -> Self {
        let raw = value.cloned().unwrap_or(Value::Null);
        Self {
            project_name: json_string(&raw, "projectName"),
            project_version: json_string(&raw, "projectVersion"),
            default_tag: json_string(&raw, "defaultTag"),
            raw,
        }
    }

    /// Apply configured defaults to a freshly extracted endpoint
    pub fn finish_endpoint(&self, mut endpoint: Endpoint) -> Endpoint {
        if endpoint.tags.is_empty()
            && let Some(tag) = &self.default_tag
        {
            endpoint.tags.push(tag.clone());
        }
        endpoint
    }
}

/// Input handed to a parser: decoded content plus configuration
pub struct ParseInput<'a> {
    pub content: &'a str,
    /// File path or other origin label, for messages only
    pub origin: Option<&'a str>,
    pub config: &'a ParserConfig,
}

impl<'a> ParseInput<'a> {
    pub fn new(content: &'a str, config: &'a ParserConfig) -> Self {
        Self {
            content,
            origin: None,
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnsupportedSourceType,
    SourceUnavailable,
    ParseError,
    UnresolvedReference,
    DuplicateEndpoint,
    DuplicateSchema,
    Ambiguous,
}

/// A structural problem found while parsing. Errors fail the parse; warnings don't.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl ParseIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(IssueKind::ParseError, message)
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Value returned by a parser: a draft AST plus everything noticed on the way
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub ast: Option<CanonicalAst>,
    pub warnings: Vec<ParseIssue>,
    pub errors: Vec<ParseIssue>,
    /// Names the parser could not resolve itself (shared parameters,
    /// responses). Schema references are checked by the registry instead.
    pub broken_references: Vec<String>,
}

impl ParseOutput {
    pub fn success(ast: CanonicalAst, warnings: Vec<ParseIssue>) -> Self {
        Self {
            ast: Some(ast),
            warnings,
            errors: Vec::new(),
            broken_references: Vec::new(),
        }
    }

    pub fn failure(error: ParseIssue) -> Self {
        Self {
            ast: None,
            warnings: Vec::new(),
            errors: vec![error],
            broken_references: Vec::new(),
        }
    }

    pub fn with_broken_references(mut self, names: Vec<String>) -> Self {
        self.broken_references = names;
        self
    }
}

/// What a parser can extract, for capability discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParserCapabilities {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub extracts_schemas: bool,
}

// =============================================================================
// Parser Trait
// =============================================================================

pub trait SourceParser: Send + Sync {
    fn source_type(&self) -> SourceType;

    fn capabilities(&self) -> ParserCapabilities;

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput;

    /// Syntax-level check without keeping an AST
    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        self.parse(input).errors
    }
}

/// Create a parser for the given source type.
pub fn create_parser(source_type: SourceType) -> Result<Box<dyn SourceParser>> {
    match source_type {
        SourceType::OpenApi => Ok(Box::new(OpenApiParser::new(SourceType::OpenApi))),
        SourceType::Swagger => Ok(Box::new(OpenApiParser::new(SourceType::Swagger))),
        SourceType::Express => Ok(Box::new(ExpressParser::new()?)),
        SourceType::JsDoc => Ok(Box::new(JsDocParser::new()?)),
        SourceType::Python => Ok(Box::new(PythonParser::new()?)),
        SourceType::Go => Ok(Box::new(GoParser::new()?)),
        SourceType::GraphQl => Ok(Box::new(GraphQlParser::new())),
    }
}

/// Create a shared parser for concurrent access.
pub fn create_shared_parser(source_type: SourceType) -> Result<SharedParser> {
    let parser = create_parser(source_type)?;
    Ok(Arc::from(parser))
}

// =============================================================================
// Type Name Normalization
// =============================================================================

/// Map a language-specific scalar type name onto the canonical primitive names.
pub fn normalize_primitive(raw: &str) -> Option<&'static str> {
    let primitive = match raw.trim() {
        "string" | "str" | "String" | "text" | "ID" | "uuid" | "date" | "datetime"
        | "date-time" | "Date" | "time.Time" => "string",
        "integer" | "int" | "Int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8"
        | "uint16" | "uint32" | "uint64" | "long" | "BigInt" => "integer",
        "number" | "float" | "Float" | "float32" | "float64" | "double" | "decimal"
        | "Decimal" | "Number" => "number",
        "boolean" | "bool" | "Boolean" => "boolean",
        "object" | "Object" | "dict" | "Dict" | "map" | "JSON" => "object",
        "any" | "Any" | "*" | "interface{}" | "unknown" => "any",
        "file" | "File" | "bytes" | "[]byte" | "Upload" => "binary",
        "null" | "None" | "void" => "null",
        _ => return None,
    };
    Some(primitive)
}

/// Primitive if recognized, otherwise a named schema reference
pub fn type_ref_for(raw: &str) -> TypeRef {
    let raw = raw.trim();
    match normalize_primitive(raw) {
        Some(primitive) => TypeRef::primitive(primitive),
        None if raw.is_empty() => TypeRef::any(),
        None => TypeRef::named(raw),
    }
}

/// Convert `:id` / `<int:id>` style route segments into `{id}` templates
pub fn normalize_route_path(path: &str) -> String {
    let trimmed = path.trim();
    let normalized: Vec<String> = trimmed
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{}}}", name.trim_end_matches('?'))
            } else if segment.starts_with('<') && segment.ends_with('>') {
                let inner = &segment[1..segment.len() - 1];
                let name = inner.rsplit(':').next().unwrap_or(inner);
                format!("{{{}}}", name)
            } else {
                segment.to_string()
            }
        })
        .collect();
    let joined = normalized.join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// 1-based line number of a byte offset
pub(crate) fn line_of(content: &str, offset: usize) -> u32 {
    content[..offset.min(content.len())].matches('\n').count() as u32 + 1
}
