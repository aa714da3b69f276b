use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    IssueKind, ParseInput, ParseIssue, ParserCapabilities, ParserConfig, SharedParser,
    SourceParser, SourceType, create_shared_parser, find_broken_references,
};
use crate::ast::CanonicalAst;
use crate::types::Result;

/// Where the source of a parse request comes from.
///
/// The registry only consumes bytes; turning a path into bytes is the
/// caller's job (see `SourceDescriptor::loaded`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Inline { content: Vec<u8> },
    File { path: PathBuf, content: Option<Vec<u8>> },
}

impl SourceDescriptor {
    pub fn inline(content: impl Into<Vec<u8>>) -> Self {
        Self::Inline {
            content: content.into(),
        }
    }

    /// A file whose bytes have not been loaded yet
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            content: None,
        }
    }

    /// A file together with the bytes the source collaborator loaded for it
    pub fn loaded(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self::File {
            path: path.into(),
            content: Some(content.into()),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Inline { content } => Some(content),
            Self::File { content, .. } => content.as_deref(),
        }
    }

    pub fn origin(&self) -> Option<String> {
        match self {
            Self::Inline { .. } => None,
            Self::File { path, .. } => Some(path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub type_tag: String,
    pub source: SourceDescriptor,
    pub config: Option<Value>,
}

impl ParseRequest {
    pub fn new(type_tag: impl Into<String>, source: SourceDescriptor) -> Self {
        Self {
            type_tag: type_tag.into(),
            source,
            config: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub status: ParseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<CanonicalAst>,
    #[serde(default)]
    pub warnings: Vec<ParseIssue>,
    #[serde(default)]
    pub errors: Vec<ParseIssue>,
    #[serde(default)]
    pub broken_dependencies: Vec<String>,
    pub duration_ms: u64,
}

impl ParseResult {
    fn failed(request: &ParseRequest, error: ParseIssue, started: Instant) -> Self {
        Self {
            source_type: request.type_tag.clone(),
            origin: request.source.origin(),
            status: ParseStatus::Failed,
            ast: None,
            warnings: Vec::new(),
            errors: vec![error],
            broken_dependencies: Vec::new(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ParseStatus::Success
    }
}

/// Maps source-type tags to parser implementations.
///
/// Dispatch is by exact tag match. Unknown tags produce a failed result,
/// never an `Err`, so a mixed batch of inputs keeps going.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, SharedParser>,
}

impl ParserRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in parser registered under its tag
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        for source_type in SourceType::ALL {
            registry.register_shared(source_type.tag(), create_shared_parser(source_type)?);
        }
        Ok(registry)
    }

    /// Register a parser for a type tag, replacing any previous one
    pub fn register(&mut self, type_tag: impl Into<String>, parser: impl SourceParser + 'static) {
        self.register_shared(type_tag, Arc::new(parser));
    }

    pub fn register_shared(&mut self, type_tag: impl Into<String>, parser: SharedParser) {
        let type_tag = type_tag.into();
        if self.parsers.insert(type_tag.clone(), parser).is_some() {
            debug!("Replaced parser for '{}'", type_tag);
        }
    }

    pub fn supported_types(&self) -> BTreeSet<String> {
        self.parsers.keys().cloned().collect()
    }

    pub fn capabilities(&self) -> BTreeMap<String, ParserCapabilities> {
        self.parsers
            .iter()
            .map(|(tag, parser)| (tag.clone(), parser.capabilities()))
            .collect()
    }

    pub fn is_supported(&self, type_tag: &str) -> bool {
        self.parsers.contains_key(type_tag)
    }

    /// Parse one request. Always returns a result; failures are data.
    pub fn parse(&self, request: &ParseRequest) -> ParseResult {
        let started = Instant::now();

        let Some(parser) = self.parsers.get(&request.type_tag) else {
            warn!("No parser registered for '{}'", request.type_tag);
            return ParseResult::failed(
                request,
                ParseIssue::new(
                    IssueKind::UnsupportedSourceType,
                    format!("Unsupported source type: {}", request.type_tag),
                ),
                started,
            );
        };

        let content = match decode_source(&request.source) {
            Ok(content) => content,
            Err(issue) => return ParseResult::failed(request, issue, started),
        };

        let config = ParserConfig::from_value(request.config.as_ref());
        let origin = request.source.origin();
        let input = ParseInput {
            content,
            origin: origin.as_deref(),
            config: &config,
        };

        let output = parser.parse(&input);
        let duration_ms = started.elapsed().as_millis() as u64;

        let ast = match output.ast {
            Some(ast) if output.errors.is_empty() => ast,
            _ => {
                let mut errors = output.errors;
                if errors.is_empty() {
                    errors.push(ParseIssue::parse_error("Parser produced no AST"));
                }
                info!(
                    "Parse failed for '{}' ({} errors)",
                    request.type_tag,
                    errors.len()
                );
                return ParseResult {
                    source_type: request.type_tag.clone(),
                    origin,
                    status: ParseStatus::Failed,
                    ast: None,
                    warnings: output.warnings,
                    errors,
                    broken_dependencies: Vec::new(),
                    duration_ms,
                };
            }
        };

        let (ast, broken_dependencies, warnings) =
            finish_ast(ast, output.warnings, output.broken_references);

        debug!(
            "Parsed '{}': {} endpoints, {} schemas, {} broken references in {}ms",
            request.type_tag,
            ast.endpoints().len(),
            ast.schemas().len(),
            broken_dependencies.len(),
            duration_ms
        );

        ParseResult {
            source_type: request.type_tag.clone(),
            origin,
            status: ParseStatus::Success,
            ast: Some(ast),
            warnings,
            errors: Vec::new(),
            broken_dependencies,
            duration_ms,
        }
    }

    /// Parse a mixed list of inputs; one failure never affects the others
    pub fn parse_many(&self, requests: &[ParseRequest]) -> Vec<ParseResult> {
        let results: Vec<ParseResult> = requests.iter().map(|r| self.parse(r)).collect();
        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Parsed {} inputs ({} succeeded, {} failed)",
            results.len(),
            results.len() - failed,
            failed
        );
        results
    }

    /// Syntax-level validation without building a result
    pub fn validate(&self, request: &ParseRequest) -> Vec<ParseIssue> {
        let Some(parser) = self.parsers.get(&request.type_tag) else {
            return vec![ParseIssue::new(
                IssueKind::UnsupportedSourceType,
                format!("Unsupported source type: {}", request.type_tag),
            )];
        };
        let content = match decode_source(&request.source) {
            Ok(content) => content,
            Err(issue) => return vec![issue],
        };
        let config = ParserConfig::from_value(request.config.as_ref());
        parser.validate(&ParseInput::new(content, &config))
    }
}

fn decode_source(source: &SourceDescriptor) -> std::result::Result<&str, ParseIssue> {
    let bytes = source.bytes().ok_or_else(|| {
        ParseIssue::new(
            IssueKind::SourceUnavailable,
            format!(
                "Source content not loaded: {}",
                source.origin().unwrap_or_default()
            ),
        )
    })?;
    std::str::from_utf8(bytes)
        .map_err(|e| ParseIssue::parse_error(format!("Source is not valid UTF-8: {}", e)))
}

/// Resolution pass and metadata stamping on a successful draft.
/// `reported` names were already warned about by the parser.
fn finish_ast(
    mut ast: CanonicalAst,
    mut warnings: Vec<ParseIssue>,
    reported: Vec<String>,
) -> (CanonicalAst, Vec<String>, Vec<ParseIssue>) {
    let mut broken = find_broken_references(&ast);
    for name in &broken {
        warnings.push(ParseIssue::new(
            IssueKind::UnresolvedReference,
            format!("Reference to undefined schema '{}'", name),
        ));
    }
    broken.extend(reported);
    broken.sort();
    broken.dedup();
    ast.mark_unresolved(!broken.is_empty());
    ast.stamp(Utc::now());
    (ast, broken, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, Endpoint, HttpMethod, Response, TypeRef};
    use crate::parser::ParseOutput;

    /// Emits one endpoint per non-empty line ("METHOD /path [-> Schema]")
    struct LineParser;

    impl SourceParser for LineParser {
        fn source_type(&self) -> SourceType {
            SourceType::OpenApi
        }

        fn capabilities(&self) -> ParserCapabilities {
            ParserCapabilities {
                name: "Lines",
                extensions: &["txt"],
                extracts_schemas: false,
            }
        }

        fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
            let mut builder = AstBuilder::new("lines");
            for (i, line) in input.content.lines().enumerate() {
                let mut parts = line.split_whitespace();
                let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let Ok(method) = method.parse::<HttpMethod>() else {
                    return ParseOutput::failure(
                        ParseIssue::parse_error(format!("bad method {}", method))
                            .at_line(i as u32 + 1),
                    );
                };
                let mut endpoint = Endpoint::new(method, path);
                if let (Some("->"), Some(schema)) = (parts.next(), parts.next()) {
                    endpoint
                        .responses
                        .push(Response::new("200").with_schema(Some(TypeRef::named(schema))));
                }
                builder.endpoint(endpoint);
            }
            ParseOutput::success(builder.build(), Vec::new())
        }
    }

    fn registry() -> ParserRegistry {
        let mut registry = ParserRegistry::new();
        registry.register("lines", LineParser);
        registry
    }

    #[test]
    fn test_unsupported_type_is_failed_result() {
        let result = registry().parse(&ParseRequest::new(
            "raml",
            SourceDescriptor::inline("GET /x"),
        ));
        assert_eq!(result.status, ParseStatus::Failed);
        assert_eq!(result.errors[0].kind, IssueKind::UnsupportedSourceType);
        assert!(result.ast.is_none());
    }

    #[test]
    fn test_unloaded_file_is_failed_result() {
        let result = registry().parse(&ParseRequest::new(
            "lines",
            SourceDescriptor::file("api.txt"),
        ));
        assert_eq!(result.status, ParseStatus::Failed);
        assert_eq!(result.errors[0].kind, IssueKind::SourceUnavailable);
        assert_eq!(result.origin.as_deref(), Some("api.txt"));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let result = registry().parse(&ParseRequest::new(
            "lines",
            SourceDescriptor::inline(vec![0xff, 0xfe, 0x00]),
        ));
        assert_eq!(result.errors[0].kind, IssueKind::ParseError);
    }

    #[test]
    fn test_broken_reference_is_warning_not_failure() {
        let result = registry().parse(&ParseRequest::new(
            "lines",
            SourceDescriptor::inline("GET /users -> User"),
        ));
        assert_eq!(result.status, ParseStatus::Success);
        assert_eq!(result.broken_dependencies, vec!["User"]);
        assert_eq!(result.warnings[0].kind, IssueKind::UnresolvedReference);

        let ast = result.ast.unwrap();
        assert!(ast.is_unresolved());
        assert!(ast.metadata().parsed_at.is_some());
    }

    #[test]
    fn test_openapi_dangling_schema_ref_is_reported() {
        let registry = ParserRegistry::with_defaults().unwrap();
        let result = registry.parse(&ParseRequest::new(
            "openapi",
            SourceDescriptor::inline(
                r##"
openapi: 3.0.0
info: {title: Ghosts, version: "1"}
paths:
  /ghosts:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {$ref: "#/components/schemas/Ghost"}
"##,
            ),
        ));
        assert_eq!(result.status, ParseStatus::Success);
        assert_eq!(result.broken_dependencies, vec!["Ghost"]);
        assert!(result.warnings.iter().any(|w| w.kind == IssueKind::UnresolvedReference));
        assert!(result.ast.unwrap().is_unresolved());
    }

    #[test]
    fn test_openapi_dangling_shared_parameter_is_reported() {
        let registry = ParserRegistry::with_defaults().unwrap();
        let result = registry.parse(&ParseRequest::new(
            "openapi",
            SourceDescriptor::inline(
                r##"
openapi: 3.0.0
info: {title: Ghosts, version: "1"}
paths:
  /ghosts/{id}:
    parameters:
      - $ref: "#/components/parameters/GhostId"
    get:
      responses:
        "200": {description: ok}
"##,
            ),
        ));
        assert_eq!(result.status, ParseStatus::Success);
        assert_eq!(result.broken_dependencies, vec!["GhostId"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("#/components/parameters/GhostId"));

        let ast = result.ast.unwrap();
        assert!(ast.is_unresolved());
        assert!(ast.endpoint(HttpMethod::Get, "/ghosts/{id}").unwrap().parameters.is_empty());
    }

    #[test]
    fn test_parser_errors_fail_the_result() {
        let result = registry().parse(&ParseRequest::new(
            "lines",
            SourceDescriptor::inline("GET /a\nFETCH /b"),
        ));
        assert_eq!(result.status, ParseStatus::Failed);
        assert_eq!(result.errors[0].line, Some(2));
        assert!(result.ast.is_none());
    }

    #[test]
    fn test_parse_many_isolates_failures() {
        let requests = vec![
            ParseRequest::new("lines", SourceDescriptor::inline("GET /a")),
            ParseRequest::new("lines", SourceDescriptor::inline("FETCH /b")),
            ParseRequest::new("unknown", SourceDescriptor::inline("GET /c")),
            ParseRequest::new("lines", SourceDescriptor::inline("POST /d")),
        ];
        let results = registry().parse_many(&requests);
        let ok: Vec<bool> = results.iter().map(ParseResult::is_success).collect();
        assert_eq!(ok, vec![true, false, false, true]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let request = ParseRequest::new("lines", SourceDescriptor::inline("GET /a\nPOST /b -> B"));
        let registry = registry();
        let first = registry.parse(&request).ast.unwrap();
        let second = registry.parse(&request).ast.unwrap();
        assert!(first.structurally_eq(&second));
    }

    #[test]
    fn test_default_registry_supports_all_tags() {
        let registry = ParserRegistry::with_defaults().unwrap();
        let supported = registry.supported_types();
        for source_type in SourceType::ALL {
            assert!(supported.contains(source_type.tag()));
        }
        assert_eq!(registry.capabilities().len(), SourceType::ALL.len());
    }

    #[test]
    fn test_validate_unknown_tag() {
        let issues = registry().validate(&ParseRequest::new(
            "raml",
            SourceDescriptor::inline(""),
        ));
        assert_eq!(issues[0].kind, IssueKind::UnsupportedSourceType);
    }
}
