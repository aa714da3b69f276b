//! Python parser: FastAPI / Flask route handlers and pydantic models
//!
//! ## Routes
//!
//! Functions decorated with `@<router>.<verb>("/path", ...)` (FastAPI) or
//! `@<app>.route("/path", methods=[...])` (Flask). `APIRouter(prefix=...)` and
//! `Blueprint(url_prefix=...)` assignments prefix the routes of that binding.
//!
//! ## Docstrings
//!
//! Google style: leading paragraph is the summary, following paragraphs the
//! description, `Args:` documents parameters and `Returns:` the success response.
//!
//! ## Models
//!
//! Classes deriving from `BaseModel` (directly or through another model in the
//! same file) become schemas; `Enum` subclasses become enum schemas.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use super::treesitter::{
    create_ts_parser, first_error_line, get_node_text, named_children, node_line, query_matches,
};
use super::{
    IssueKind, ParseInput, ParseIssue, ParseOutput, ParserCapabilities, SourceParser, SourceType,
    normalize_route_path, type_ref_for,
};
use crate::ast::{
    AstBuilder, Endpoint, HttpMethod, Parameter, ParameterLocation, PropertySchema, RequestBody,
    Response, Schema, TypeRef, path_parameters,
};
use crate::types::Result;

pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Result<Self> {
        // Validate that the language is available
        let _ = create_ts_parser(tree_sitter_python::LANGUAGE, "python")?;
        Ok(Self)
    }

    fn syntax_tree(&self, content: &str) -> std::result::Result<tree_sitter::Tree, ParseIssue> {
        let mut parser = create_ts_parser(tree_sitter_python::LANGUAGE, "python")
            .map_err(|e| ParseIssue::parse_error(e.to_string()))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseIssue::parse_error("Failed to parse Python source"))?;
        if let Some(line) = first_error_line(tree.root_node()) {
            return Err(ParseIssue::parse_error("Python syntax error").at_line(line));
        }
        Ok(tree)
    }
}

impl SourceParser for PythonParser {
    fn source_type(&self) -> SourceType {
        SourceType::Python
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: "Python (FastAPI/Flask)",
            extensions: &["py"],
            extracts_schemas: true,
        }
    }

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
        let tree = match self.syntax_tree(input.content) {
            Ok(tree) => tree,
            Err(issue) => return ParseOutput::failure(issue),
        };
        let root = tree.root_node();
        let src = input.content.as_bytes();

        let mut builder = AstBuilder::new(SourceType::Python.tag()).project(
            input.config.project_name.clone(),
            input.config.project_version.clone(),
        );
        let mut warnings = Vec::new();

        for schema in extract_models(root, src) {
            let name = schema.name.clone();
            if !builder.schema(schema) {
                warnings.push(ParseIssue::new(
                    IssueKind::DuplicateSchema,
                    format!("Duplicate model '{}'", name),
                ));
            }
        }

        let prefixes = router_prefixes(root, src);
        for (endpoint, line) in extract_routes(root, src, &prefixes, &mut warnings) {
            let endpoint = input.config.finish_endpoint(endpoint);
            let locator = endpoint.locator();
            if !builder.endpoint(endpoint) {
                warnings.push(
                    ParseIssue::new(
                        IssueKind::DuplicateEndpoint,
                        format!("Duplicate endpoint {}", locator),
                    )
                    .at_line(line),
                );
            }
        }

        ParseOutput::success(builder.build(), warnings)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        self.syntax_tree(input.content).err().into_iter().collect()
    }
}

// =============================================================================
// Literals and Types
// =============================================================================

/// Value of a plain string literal, quotes and prefixes removed
fn string_literal(node: Node, src: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let text = get_node_text(node, src);
    let text = text.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return Some(inner.to_string());
        }
    }
    None
}

/// Split on `sep` outside of brackets
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Generic `Name[args]` split
fn generic_parts(s: &str) -> Option<(&str, &str)> {
    let open = s.find('[')?;
    let inner = s[open + 1..].strip_suffix(']')?;
    Some((s[..open].trim(), inner))
}

/// Map a Python annotation onto a TypeRef, reporting whether it admits `None`
fn py_type_ref(annotation: &str) -> (TypeRef, bool) {
    let annotation = annotation.trim().trim_matches(|c: char| c == '"' || c == '\'');

    let members = split_top_level(annotation, '|');
    if members.len() > 1 {
        let non_null: Vec<&str> = members.into_iter().filter(|m| *m != "None").collect();
        return match non_null.as_slice() {
            [single] => (py_type_ref(single).0, true),
            _ => (TypeRef::any(), true),
        };
    }

    if let Some((head, inner)) = generic_parts(annotation) {
        let head = head.rsplit('.').next().unwrap_or(head);
        let args = split_top_level(inner, ',');
        return match head {
            "Optional" => (py_type_ref(inner).0, true),
            "Union" => {
                let optional = args.contains(&"None");
                let non_null: Vec<&str> = args.into_iter().filter(|a| *a != "None").collect();
                match non_null.as_slice() {
                    [single] => (py_type_ref(single).0, optional),
                    _ => (TypeRef::any(), optional),
                }
            }
            "Annotated" => py_type_ref(args.first().copied().unwrap_or_default()),
            "List" | "list" | "Sequence" | "Set" | "set" | "FrozenSet" | "frozenset"
            | "Iterable" => (TypeRef::array(py_type_ref(inner).0), false),
            "Dict" | "dict" | "Mapping" => (TypeRef::primitive("object"), false),
            "Tuple" | "tuple" => (TypeRef::array(TypeRef::any()), false),
            _ => (type_ref_for(head), false),
        };
    }

    let name = annotation.rsplit('.').next().unwrap_or(annotation);
    match name {
        "List" | "list" => (TypeRef::array(TypeRef::any()), false),
        "UploadFile" => (TypeRef::primitive("binary"), false),
        _ => (type_ref_for(name), false),
    }
}

fn is_named(type_ref: &TypeRef) -> bool {
    type_ref.referenced_name().is_some()
}

// =============================================================================
// Calls
// =============================================================================

/// A call expression broken into callee text, positional and keyword arguments
struct CallParts<'tree> {
    callee: String,
    positional: Vec<Node<'tree>>,
    keywords: HashMap<String, Node<'tree>>,
}

impl<'tree> CallParts<'tree> {
    fn parse(node: Node<'tree>, src: &[u8]) -> Option<Self> {
        if node.kind() != "call" {
            return None;
        }
        let callee = get_node_text(node.child_by_field_name("function")?, src).to_string();
        let mut positional = Vec::new();
        let mut keywords = HashMap::new();
        if let Some(args) = node.child_by_field_name("arguments") {
            for arg in named_children(args) {
                if arg.kind() == "keyword_argument" {
                    if let (Some(name), Some(value)) = (
                        arg.child_by_field_name("name"),
                        arg.child_by_field_name("value"),
                    ) {
                        keywords.insert(get_node_text(name, src).to_string(), value);
                    }
                } else if arg.kind() != "comment" {
                    positional.push(arg);
                }
            }
        }
        Some(Self {
            callee,
            positional,
            keywords,
        })
    }

    fn keyword_string(&self, name: &str, src: &[u8]) -> Option<String> {
        self.keywords.get(name).and_then(|n| string_literal(*n, src))
    }

    fn keyword_text<'s>(&self, name: &str, src: &'s [u8]) -> Option<&'s str> {
        self.keywords.get(name).map(|n| get_node_text(*n, src))
    }

    fn keyword_strings(&self, name: &str, src: &[u8]) -> Vec<String> {
        self.keywords
            .get(name)
            .map(|list| {
                named_children(*list)
                    .into_iter()
                    .filter_map(|item| string_literal(item, src))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last segment of the callee (`fastapi.Query` -> `Query`)
    fn short_callee(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    /// Default-value calls like `Query(...)` are required when their default is `...` or absent
    fn default_is_required(&self, src: &[u8]) -> bool {
        let default = self
            .keywords
            .get("default")
            .or_else(|| self.positional.first())
            .map(|n| get_node_text(*n, src));
        matches!(default, None | Some("..."))
    }
}

// =============================================================================
// Docstrings
// =============================================================================

#[derive(Debug, Default, PartialEq)]
struct Docstring {
    summary: Option<String>,
    description: Option<String>,
    args: HashMap<String, String>,
    returns: Option<String>,
}

fn docstring_of(body: Option<Node>, src: &[u8]) -> Option<String> {
    let first = named_children(body?).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(first).into_iter().next()?;
    string_literal(expr, src)
}

fn parse_docstring(raw: &str) -> Docstring {
    let lines = dedent(raw);
    let mut doc = Docstring::default();
    let mut paragraphs: Vec<String> = vec![String::new()];
    let mut section: Option<&str> = None;
    let mut current_arg: Option<String> = None;
    let mut returns: Vec<String> = Vec::new();

    for line in &lines {
        let trimmed = line.trim();
        let header = trimmed.strip_suffix(':').filter(|_| !line.starts_with(' '));
        if let Some(header) = header
            && matches!(
                header,
                "Args" | "Arguments" | "Parameters" | "Returns" | "Return" | "Raises" | "Yields"
                    | "Example" | "Examples" | "Note" | "Notes"
            )
        {
            section = Some(match header {
                "Arguments" | "Parameters" => "Args",
                "Return" => "Returns",
                other => other,
            });
            current_arg = None;
            continue;
        }

        match section {
            None => {
                if trimmed.is_empty() {
                    paragraphs.push(String::new());
                } else if let Some(last) = paragraphs.last_mut() {
                    if !last.is_empty() {
                        last.push(' ');
                    }
                    last.push_str(trimmed);
                }
            }
            Some("Args") => {
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.split_once(':') {
                    Some((head, desc)) if !head.contains(' ') || head.contains('(') => {
                        let name = head.split('(').next().unwrap_or(head).trim().to_string();
                        doc.args.insert(name.clone(), desc.trim().to_string());
                        current_arg = Some(name);
                    }
                    _ => {
                        if let Some(arg) = &current_arg
                            && let Some(desc) = doc.args.get_mut(arg)
                        {
                            desc.push(' ');
                            desc.push_str(trimmed);
                        }
                    }
                }
            }
            Some("Returns") => {
                if !trimmed.is_empty() {
                    returns.push(trimmed.to_string());
                }
            }
            Some(_) => {}
        }
    }

    let mut paragraphs = paragraphs.into_iter().filter(|p| !p.is_empty());
    doc.summary = paragraphs.next();
    let rest: Vec<String> = paragraphs.collect();
    doc.description = (!rest.is_empty()).then(|| rest.join("\n\n"));

    let returns = returns.join(" ");
    // "User: the user" -> "the user"
    let returns = match returns.split_once(':') {
        Some((head, desc)) if !head.trim().contains(' ') => desc.trim().to_string(),
        _ => returns,
    };
    doc.returns = (!returns.is_empty()).then_some(returns);
    doc
}

/// Remove the common indentation of every line after the first
fn dedent(raw: &str) -> Vec<String> {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim().to_string()
            } else {
                l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end().to_string()
            }
        })
        .collect()
}

// =============================================================================
// Models
// =============================================================================

fn extract_models(root: Node, src: &[u8]) -> Vec<Schema> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut models: HashSet<String> = HashSet::new();
    let mut enums: HashSet<String> = HashSet::new();
    let mut schemas = Vec::new();

    for m in query_matches(&language, "(class_definition) @class", root, src) {
        let Some(class) = m.get("class") else {
            continue;
        };
        let Some(name) = class.child_by_field_name("name").map(|n| get_node_text(n, src)) else {
            continue;
        };
        let bases: Vec<String> = class
            .child_by_field_name("superclasses")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .map(|b| get_node_text(b, src).rsplit('.').next().unwrap_or("").to_string())
                    .collect()
            })
            .unwrap_or_default();

        let is_enum = bases
            .iter()
            .any(|b| matches!(b.as_str(), "Enum" | "StrEnum" | "IntEnum") || enums.contains(b));
        let is_model = bases.iter().any(|b| b == "BaseModel" || models.contains(b));
        if !is_enum && !is_model {
            continue;
        }

        let body = class.child_by_field_name("body");
        let description = docstring_of(body, src).map(|d| parse_docstring(&d)).and_then(|d| {
            match (d.summary, d.description) {
                (Some(s), Some(rest)) => Some(format!("{}\n\n{}", s, rest)),
                (s, _) => s,
            }
        });
        let mut schema = Schema::new(name).with_description(description);

        for (field, annotation, default) in class_fields(body, src) {
            if is_enum {
                let value = default.and_then(|d| string_literal(d, src)).unwrap_or(field);
                schema.enum_values.push(value);
                continue;
            }
            let Some(annotation) = annotation else {
                continue;
            };
            let (type_ref, nullable) = py_type_ref(annotation);
            let field_call = default.and_then(|d| CallParts::parse(d, src));
            let required = !nullable
                && match (&field_call, default) {
                    (Some(call), _) if call.short_callee() == "Field" => {
                        call.default_is_required(src)
                    }
                    (_, Some(_)) => false,
                    (_, None) => true,
                };
            let description = field_call.and_then(|c| c.keyword_string("description", src));
            schema.properties.insert(
                field,
                PropertySchema::new(type_ref, required).with_description(description),
            );
        }

        if is_enum {
            enums.insert(name.to_string());
        } else {
            models.insert(name.to_string());
        }
        schemas.push(schema);
    }
    schemas
}

/// `(name, annotation, default)` for each class-level assignment
fn class_fields<'tree>(
    body: Option<Node<'tree>>,
    src: &'tree [u8],
) -> Vec<(String, Option<&'tree str>, Option<Node<'tree>>)> {
    let Some(body) = body else {
        return Vec::new();
    };
    named_children(body)
        .into_iter()
        .filter(|stmt| stmt.kind() == "expression_statement")
        .filter_map(|stmt| named_children(stmt).into_iter().next())
        .filter(|expr| expr.kind() == "assignment")
        .filter_map(|assignment| {
            let left = assignment.child_by_field_name("left")?;
            if left.kind() != "identifier" {
                return None;
            }
            let name = get_node_text(left, src).to_string();
            if name.starts_with('_') || name == "model_config" {
                return None;
            }
            let annotation = assignment
                .child_by_field_name("type")
                .map(|t| get_node_text(t, src));
            Some((name, annotation, assignment.child_by_field_name("right")))
        })
        .collect()
}

// =============================================================================
// Routes
// =============================================================================

/// `router = APIRouter(prefix="/users")` -> {"router": "/users"}
fn router_prefixes(root: Node, src: &[u8]) -> HashMap<String, String> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let query = "(module (expression_statement (assignment left: (identifier) @name right: (call) @call)))";
    let mut prefixes = HashMap::new();
    for m in query_matches(&language, query, root, src) {
        let (Some(name), Some(call)) = (m.get("name"), m.get("call")) else {
            continue;
        };
        let Some(call) = CallParts::parse(call, src) else {
            continue;
        };
        let prefix = match call.short_callee() {
            "APIRouter" => call.keyword_string("prefix", src),
            "Blueprint" => call.keyword_string("url_prefix", src),
            _ => None,
        };
        if let Some(prefix) = prefix {
            prefixes.insert(get_node_text(name, src).to_string(), prefix);
        }
    }
    prefixes
}

fn join_prefix(prefix: Option<&String>, path: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/')),
        None => path.to_string(),
    }
}

/// Route methods declared by one decorator
fn decorator_route<'tree>(
    decorator: Node<'tree>,
    src: &[u8],
    prefixes: &HashMap<String, String>,
) -> Option<(Vec<HttpMethod>, String, CallParts<'tree>)> {
    let expr = named_children(decorator).into_iter().next()?;
    let call = CallParts::parse(expr, src)?;
    let (receiver, verb) = call.callee.rsplit_once('.')?;
    let raw_path = call
        .positional
        .first()
        .and_then(|p| string_literal(*p, src))
        .or_else(|| call.keyword_string("path", src))
        .or_else(|| call.keyword_string("rule", src))?;

    let methods = match verb {
        "route" | "api_route" => {
            let declared = call.keyword_strings("methods", src);
            if declared.is_empty() {
                vec![HttpMethod::Get]
            } else {
                declared.iter().filter_map(|m| m.parse().ok()).collect()
            }
        }
        verb => {
            let method: HttpMethod = verb.parse().ok()?;
            if !HttpMethod::HTTP.contains(&method) {
                return None;
            }
            vec![method]
        }
    };

    let path = normalize_route_path(&join_prefix(prefixes.get(receiver), &raw_path));
    Some((methods, path, call))
}

fn extract_routes(
    root: Node,
    src: &[u8],
    prefixes: &HashMap<String, String>,
    warnings: &mut Vec<ParseIssue>,
) -> Vec<(Endpoint, u32)> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut endpoints = Vec::new();

    for m in query_matches(&language, "(decorated_definition) @def", root, src) {
        let Some(def) = m.get("def") else {
            continue;
        };
        let Some(function) = def
            .child_by_field_name("definition")
            .filter(|d| d.kind() == "function_definition")
        else {
            continue;
        };

        for decorator in named_children(def)
            .into_iter()
            .filter(|n| n.kind() == "decorator")
        {
            let Some((methods, path, call)) = decorator_route(decorator, src, prefixes) else {
                continue;
            };
            if methods.is_empty() {
                warnings.push(
                    ParseIssue::new(IssueKind::Ambiguous, format!("No usable methods for {}", path))
                        .at_line(node_line(decorator)),
                );
                continue;
            }
            for method in methods {
                let endpoint = build_endpoint(method, &path, function, &call, src);
                endpoints.push((endpoint, node_line(decorator)));
            }
        }
    }
    endpoints
}

fn build_endpoint(
    method: HttpMethod,
    path: &str,
    function: Node,
    route: &CallParts<'_>,
    src: &[u8],
) -> Endpoint {
    let mut endpoint = Endpoint::new(method, path);
    let doc = docstring_of(function.child_by_field_name("body"), src)
        .map(|d| parse_docstring(&d))
        .unwrap_or_default();

    endpoint.summary = route
        .keyword_string("summary", src)
        .or_else(|| doc.summary.clone());
    endpoint.description = route
        .keyword_string("description", src)
        .or_else(|| doc.description.clone());
    endpoint.operation_id = route
        .keyword_string("operation_id", src)
        .or_else(|| {
            function
                .child_by_field_name("name")
                .map(|n| get_node_text(n, src).to_string())
        });
    endpoint.tags = route.keyword_strings("tags", src);
    endpoint.deprecated = route.keyword_text("deprecated", src) == Some("True");

    let path_params = path_parameters(path);
    if let Some(params) = function.child_by_field_name("parameters") {
        for param in named_children(params) {
            apply_parameter(&mut endpoint, param, &path_params, &doc, src);
        }
    }
    for name in &path_params {
        if endpoint.parameter(name, ParameterLocation::Path).is_none() {
            endpoint.parameters.push(
                Parameter::new(name, ParameterLocation::Path, TypeRef::primitive("string"))
                    .with_description(doc.args.get(name).cloned()),
            );
        }
    }

    let status = route
        .keyword_text("status_code", src)
        .map(|s| s.rsplit('_').find(|p| p.chars().all(|c| c.is_ascii_digit())).unwrap_or(s))
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("200");
    let schema = route
        .keyword_text("response_model", src)
        .or_else(|| {
            function
                .child_by_field_name("return_type")
                .map(|t| get_node_text(t, src))
        })
        .map(|t| py_type_ref(t).0)
        .filter(|t| *t != TypeRef::primitive("null"));
    endpoint.responses.push(
        Response::new(status)
            .with_description(doc.returns.clone())
            .with_schema(schema),
    );

    endpoint
}

fn apply_parameter(
    endpoint: &mut Endpoint,
    param: Node,
    path_params: &[String],
    doc: &Docstring,
    src: &[u8],
) {
    let (name_node, annotation, default) = match param.kind() {
        "identifier" => (Some(param), None, None),
        "typed_parameter" => (
            named_children(param).into_iter().find(|n| n.kind() == "identifier"),
            param.child_by_field_name("type"),
            None,
        ),
        "default_parameter" | "typed_default_parameter" => (
            param.child_by_field_name("name"),
            param.child_by_field_name("type"),
            param.child_by_field_name("value"),
        ),
        _ => return,
    };
    let Some(name) = name_node.map(|n| get_node_text(n, src)) else {
        return;
    };
    if matches!(name, "self" | "cls") {
        return;
    }

    let (type_ref, nullable) = annotation
        .map(|a| py_type_ref(get_node_text(a, src)))
        .unwrap_or((TypeRef::any(), false));
    let marker = default.and_then(|d| CallParts::parse(d, src));

    let (location, mut required) = match marker.as_ref().map(CallParts::short_callee) {
        Some("Depends" | "Security") => return,
        Some("Path") => (Some(ParameterLocation::Path), true),
        Some("Query") => (Some(ParameterLocation::Query), false),
        Some("Header") => (Some(ParameterLocation::Header), false),
        Some("Cookie") => (Some(ParameterLocation::Cookie), false),
        Some("Body" | "Form" | "File") => (None, false),
        _ => {
            if path_params.iter().any(|p| p == name) {
                (Some(ParameterLocation::Path), true)
            } else if annotation.is_none() && default.is_none() {
                // Untyped framework arguments (request, db handles)
                return;
            } else if is_named(&type_ref) && default.is_none() {
                (None, true)
            } else {
                (Some(ParameterLocation::Query), default.is_none())
            }
        }
    };
    if let Some(marker) = &marker
        && matches!(
            marker.short_callee(),
            "Query" | "Header" | "Cookie" | "Body" | "Form" | "File"
        )
    {
        required = marker.default_is_required(src);
    }
    required &= !nullable;

    let description = marker
        .as_ref()
        .and_then(|m| m.keyword_string("description", src))
        .or_else(|| doc.args.get(name).cloned());
    let wire_name = marker
        .as_ref()
        .and_then(|m| m.keyword_string("alias", src))
        .unwrap_or_else(|| match location {
            Some(ParameterLocation::Header) => name.replace('_', "-"),
            _ => name.to_string(),
        });

    match location {
        Some(location) => endpoint.parameters.push(
            Parameter::new(wire_name, location, type_ref)
                .required(required)
                .with_description(description),
        ),
        None if endpoint.request_body.is_none() => {
            let mut body = RequestBody::json(type_ref, required);
            body.description = description;
            endpoint.request_body = Some(body);
        }
        None => endpoint.parameters.push(
            Parameter::new(wire_name, ParameterLocation::Body, type_ref)
                .required(required)
                .with_description(description),
        ),
    }
}
