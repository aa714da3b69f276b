//! Go parser: swag-style handler annotations and JSON structs
//!
//! Handlers are functions or methods whose doc comment carries an `@Router`
//! line. Supported annotations: `@Summary`, `@Description`, `@Tags`, `@ID`,
//! `@Accept`, `@Param`, `@Success`, `@Failure`, `@Response`, `@Router`,
//! `@Deprecated`. General API info comes from `@title`, `@version` and
//! `@BasePath` anywhere in the file.
//!
//! Struct type declarations become schemas, with property names taken from
//! the `json` struct tag.

use tree_sitter::Node;

use super::treesitter::{
    create_ts_parser, first_error_line, get_node_text, named_children, node_line,
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

pub struct GoParser;

impl GoParser {
    pub fn new() -> Result<Self> {
        // Validate that the language is available
        let _ = create_ts_parser(tree_sitter_go::LANGUAGE, "go")?;
        Ok(Self)
    }

    fn syntax_tree(&self, content: &str) -> std::result::Result<tree_sitter::Tree, ParseIssue> {
        let mut parser = create_ts_parser(tree_sitter_go::LANGUAGE, "go")
            .map_err(|e| ParseIssue::parse_error(e.to_string()))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseIssue::parse_error("Failed to parse Go source"))?;
        if let Some(line) = first_error_line(tree.root_node()) {
            return Err(ParseIssue::parse_error("Go syntax error").at_line(line));
        }
        Ok(tree)
    }
}

impl SourceParser for GoParser {
    fn source_type(&self) -> SourceType {
        SourceType::Go
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: "Go (swag annotations)",
            extensions: &["go"],
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

        let info = general_info(root, src);
        let mut builder = AstBuilder::new(SourceType::Go.tag()).project(info.title, info.version);
        builder.set_project(
            input.config.project_name.clone(),
            input.config.project_version.clone(),
        );
        if let Some(package) = named_children(root)
            .into_iter()
            .find(|n| n.kind() == "package_clause")
            .and_then(|p| named_children(p).into_iter().next())
        {
            builder.extra(
                "package",
                serde_json::Value::String(get_node_text(package, src).to_string()),
            );
        }

        let mut warnings = Vec::new();
        let mut comments: Vec<Node> = Vec::new();

        for node in named_children(root) {
            if node.kind() == "comment" {
                // A blank line breaks a comment run
                if comments
                    .last()
                    .is_some_and(|last| last.end_position().row + 1 < node.start_position().row)
                {
                    comments.clear();
                }
                comments.push(node);
                continue;
            }

            let attached = comments
                .last()
                .is_some_and(|last| last.end_position().row + 1 >= node.start_position().row);
            let doc: Vec<String> = if attached {
                comments.iter().map(|c| comment_text(*c, src)).collect()
            } else {
                Vec::new()
            };
            comments.clear();

            match node.kind() {
                "function_declaration" | "method_declaration" => {
                    let line = node_line(node);
                    let endpoints = handler_endpoints(&doc, info.base_path.as_deref(), line, &mut warnings);
                    for endpoint in endpoints {
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
                }
                "type_declaration" => {
                    for schema in struct_schemas(node, &doc, src) {
                        let name = schema.name.clone();
                        if !builder.schema(schema) {
                            warnings.push(
                                ParseIssue::new(
                                    IssueKind::DuplicateSchema,
                                    format!("Duplicate type '{}'", name),
                                )
                                .at_line(node_line(node)),
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        ParseOutput::success(builder.build(), warnings)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        self.syntax_tree(input.content).err().into_iter().collect()
    }
}

// =============================================================================
// Comments
// =============================================================================

fn comment_text(node: Node, src: &[u8]) -> String {
    let text = get_node_text(node, src);
    if let Some(line) = text.strip_prefix("//") {
        return line.trim().to_string();
    }
    text.trim_start_matches("/*")
        .trim_end_matches("*/")
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split `@Name rest` annotation lines
fn annotation(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('@')?;
    let (name, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Some((name, body.trim()))
}

#[derive(Debug, Default)]
struct GeneralInfo {
    title: Option<String>,
    version: Option<String>,
    base_path: Option<String>,
}

fn general_info(root: Node, src: &[u8]) -> GeneralInfo {
    let mut info = GeneralInfo::default();
    for node in named_children(root).into_iter().filter(|n| n.kind() == "comment") {
        let text = comment_text(node, src);
        for line in text.lines() {
            match annotation(line.trim()) {
                Some(("title", body)) if !body.is_empty() => info.title = Some(body.to_string()),
                Some(("version", body)) if !body.is_empty() => {
                    info.version = Some(body.to_string())
                }
                Some(("BasePath", body)) if !body.is_empty() => {
                    info.base_path = Some(body.trim_end_matches('/').to_string())
                }
                _ => {}
            }
        }
    }
    info
}

// =============================================================================
// Types
// =============================================================================

/// Map a Go type expression onto a TypeRef. Pointers are reported as optional.
fn go_type_ref(raw: &str) -> (TypeRef, bool) {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('*') {
        return (go_type_ref(inner).0, true);
    }
    if let Some(inner) = raw.strip_prefix("[]") {
        if inner == "byte" {
            return (TypeRef::primitive("binary"), false);
        }
        return (TypeRef::array(go_type_ref(inner).0), false);
    }
    if raw.starts_with('[')
        && let Some(close) = raw.find(']')
    {
        return (TypeRef::array(go_type_ref(&raw[close + 1..]).0), false);
    }
    if raw.starts_with("map[") {
        return (TypeRef::primitive("object"), false);
    }
    if raw == "time.Time" {
        return (TypeRef::primitive("string"), false);
    }
    if raw == "any" || raw.starts_with("interface") {
        return (TypeRef::any(), false);
    }
    let name = raw.rsplit('.').next().unwrap_or(raw);
    (type_ref_for(name), false)
}

/// Value of one key in a struct tag (`json:"id,omitempty"`)
fn struct_tag_value<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let tag = tag.trim_matches('`');
    let needle = format!("{}:\"", key);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

fn struct_schemas(declaration: Node, doc: &[String], src: &[u8]) -> Vec<Schema> {
    let description = (!doc.is_empty()).then(|| doc.join(" "));
    named_children(declaration)
        .into_iter()
        .filter(|spec| spec.kind() == "type_spec")
        .filter_map(|spec| {
            let name = get_node_text(spec.child_by_field_name("name")?, src);
            let body = spec.child_by_field_name("type")?;
            if body.kind() != "struct_type" {
                return None;
            }
            let mut schema = Schema::new(name).with_description(description.clone());
            if let Some(fields) = named_children(body)
                .into_iter()
                .find(|n| n.kind() == "field_declaration_list")
            {
                add_struct_fields(&mut schema, fields, src);
            }
            Some(schema)
        })
        .collect()
}

fn add_struct_fields(schema: &mut Schema, fields: Node, src: &[u8]) {
    let mut pending_doc: Vec<String> = Vec::new();
    let mut last_field: Option<(String, usize)> = None;

    for child in named_children(fields) {
        if child.kind() == "comment" {
            let text = comment_text(child, src);
            // Trailing comment on the same line documents the previous field
            if let Some((name, row)) = &last_field
                && *row == child.start_position().row
            {
                if let Some(property) = schema.properties.get_mut(name)
                    && property.description.is_none()
                {
                    property.description = Some(text);
                }
                continue;
            }
            pending_doc.push(text);
            continue;
        }
        if child.kind() != "field_declaration" {
            pending_doc.clear();
            continue;
        }

        let Some(type_node) = child.child_by_field_name("type") else {
            continue;
        };
        let tag = child
            .child_by_field_name("tag")
            .map(|t| get_node_text(t, src))
            .unwrap_or_default();
        let (type_ref, pointer) = go_type_ref(get_node_text(type_node, src));

        let mut cursor = child.walk();
        let names: Vec<&str> = child
            .children_by_field_name("name", &mut cursor)
            .map(|n| get_node_text(n, src))
            .collect();
        let description = (!pending_doc.is_empty()).then(|| pending_doc.join(" "));
        pending_doc.clear();

        for field_name in names {
            // Unexported fields are not serialized
            if !field_name.starts_with(|c: char| c.is_ascii_uppercase()) {
                continue;
            }
            let json = struct_tag_value(tag, "json");
            let mut parts = json.unwrap_or_default().split(',');
            let wire_name = match parts.next() {
                Some("-") => continue,
                Some(name) if !name.is_empty() => name.to_string(),
                _ => field_name.to_string(),
            };
            let omitempty = parts.any(|p| p == "omitempty");
            let validated = ["binding", "validate"]
                .iter()
                .filter_map(|key| struct_tag_value(tag, key))
                .any(|rules| rules.split(',').any(|r| r == "required"));
            let required = validated || (!omitempty && !pointer);

            schema.properties.insert(
                wire_name.clone(),
                PropertySchema::new(type_ref.clone(), required)
                    .with_description(description.clone()),
            );
            last_field = Some((wire_name, child.end_position().row));
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn handler_endpoints(
    doc: &[String],
    base_path: Option<&str>,
    line: u32,
    warnings: &mut Vec<ParseIssue>,
) -> Vec<Endpoint> {
    let lines: Vec<&str> = doc.iter().flat_map(|d| d.lines()).map(str::trim).collect();
    let routes: Vec<&str> = lines
        .iter()
        .filter_map(|l| match annotation(l) {
            Some(("Router", body)) => Some(body),
            _ => None,
        })
        .collect();
    if routes.is_empty() {
        return Vec::new();
    }

    let mut endpoints = Vec::new();
    for route in routes {
        let Some((path, methods)) = parse_router(route, base_path) else {
            warnings.push(
                ParseIssue::new(IssueKind::Ambiguous, format!("Malformed @Router '{}'", route))
                    .at_line(line),
            );
            continue;
        };
        for method in methods {
            let mut endpoint = Endpoint::new(method, path.clone());
            apply_annotations(&mut endpoint, &lines, line, warnings);
            endpoints.push(endpoint);
        }
    }
    endpoints
}

/// `/users/{id} [get]` -> ("/users/{id}", [GET])
fn parse_router(body: &str, base_path: Option<&str>) -> Option<(String, Vec<HttpMethod>)> {
    let (path, rest) = body.split_once(char::is_whitespace)?;
    let methods: Vec<HttpMethod> = rest
        .trim()
        .strip_prefix('[')?
        .strip_suffix(']')?
        .split(',')
        .filter_map(|m| m.trim().parse().ok())
        .filter(|m| HttpMethod::HTTP.contains(m))
        .collect();
    if methods.is_empty() {
        return None;
    }
    let full = match base_path {
        Some(base) => format!("{}/{}", base, path.trim_start_matches('/')),
        None => path.to_string(),
    };
    Some((normalize_route_path(&full), methods))
}

fn apply_annotations(
    endpoint: &mut Endpoint,
    lines: &[&str],
    line: u32,
    warnings: &mut Vec<ParseIssue>,
) {
    let mut plain: Vec<&str> = Vec::new();
    let mut content_type: Option<String> = None;

    for &text in lines {
        let Some((name, body)) = annotation(text) else {
            // "GetUser godoc" marker lines carry no text
            if !text.is_empty() && !text.ends_with("godoc") {
                plain.push(text);
            }
            continue;
        };
        match name.to_ascii_lowercase().as_str() {
            "summary" => endpoint.summary = Some(body.to_string()),
            "description" => {
                let joined = match endpoint.description.take() {
                    Some(existing) => format!("{}\n{}", existing, body),
                    None => body.to_string(),
                };
                endpoint.description = Some(joined);
            }
            "tags" => endpoint.tags.extend(
                body.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            ),
            "id" => endpoint.operation_id = Some(body.to_string()),
            "deprecated" => endpoint.deprecated = true,
            "accept" => content_type = Some(mime_type(body)),
            "param" => match parse_param(body) {
                Some(ParamLine::Body { schema, required, description }) => {
                    let mut request = RequestBody::json(schema, required);
                    if let Some(content_type) = &content_type {
                        request.content_type = content_type.clone();
                    }
                    request.description = description;
                    endpoint.request_body = Some(request);
                }
                Some(ParamLine::Param(parameter)) => endpoint.parameters.push(parameter),
                None => warnings.push(
                    ParseIssue::new(IssueKind::Ambiguous, format!("Malformed @Param '{}'", body))
                        .at_line(line),
                ),
            },
            "success" | "failure" | "response" => match parse_response(body) {
                Some(response) => endpoint.responses.push(response),
                None => warnings.push(
                    ParseIssue::new(
                        IssueKind::Ambiguous,
                        format!("Malformed @{} '{}'", name, body),
                    )
                    .at_line(line),
                ),
            },
            _ => {}
        }
    }

    if endpoint.summary.is_none() {
        endpoint.summary = plain.first().map(|s| s.to_string());
    }
    for name in path_parameters(&endpoint.path) {
        if endpoint.parameter(&name, ParameterLocation::Path).is_none() {
            endpoint.parameters.push(Parameter::new(
                name,
                ParameterLocation::Path,
                TypeRef::primitive("string"),
            ));
        }
    }
}

fn mime_type(short: &str) -> String {
    match short.split(',').next().unwrap_or(short).trim() {
        "json" => "application/json".to_string(),
        "xml" => "application/xml".to_string(),
        "mpfd" => "multipart/form-data".to_string(),
        "x-www-form-urlencoded" => "application/x-www-form-urlencoded".to_string(),
        "plain" => "text/plain".to_string(),
        other => other.to_string(),
    }
}

enum ParamLine {
    Body {
        schema: TypeRef,
        required: bool,
        description: Option<String>,
    },
    Param(Parameter),
}

/// Text of the first double-quoted segment
fn quoted(text: &str) -> Option<String> {
    let start = text.find('"')? + 1;
    let len = text[start..].find('"')?;
    let value = &text[start..start + len];
    (!value.is_empty()).then(|| value.to_string())
}

/// `name in type required "description"`
fn parse_param(body: &str) -> Option<ParamLine> {
    let mut tokens = body.split_whitespace();
    let name = tokens.next()?;
    let location = tokens.next()?;
    let raw_type = tokens.next()?;
    let required = tokens.next()?.eq_ignore_ascii_case("true");
    let description = quoted(body);
    let (schema, _) = go_type_ref(raw_type);

    if location == "body" {
        return Some(ParamLine::Body {
            schema,
            required,
            description,
        });
    }
    let location: ParameterLocation = location.parse().ok()?;
    Some(ParamLine::Param(
        Parameter::new(name, location, schema)
            .required(required)
            .with_description(description),
    ))
}

/// `200 {object} models.User "ok"` or `204 "No Content"`
fn parse_response(body: &str) -> Option<Response> {
    let mut tokens = body.split_whitespace();
    let status = tokens.next()?;
    if status != "default" && !status.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let description = quoted(body);

    let schema = match tokens.next() {
        Some(kind) if kind.starts_with('{') => {
            let raw_type = tokens.next().filter(|t| !t.starts_with('"'));
            match (kind, raw_type) {
                ("{array}", Some(t)) => Some(TypeRef::array(go_type_ref(t).0)),
                (_, Some(t)) => Some(go_type_ref(t).0),
                ("{string}", None) => Some(TypeRef::primitive("string")),
                _ => None,
            }
        }
        _ => None,
    };

    Some(
        Response::new(status)
            .with_description(description)
            .with_schema(schema),
    )
}
