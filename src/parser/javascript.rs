//! JavaScript parsers: Express route declarations and standalone JSDoc annotations
//!
//! Both read `/** ... */` blocks with the same tag vocabulary:
//!
//! | Tag | Effect |
//! |-----|--------|
//! | `@route METHOD /path` | declares an endpoint (JSDoc parser only) |
//! | `@summary`, `@description` | endpoint text (leading free text is the default) |
//! | `@param {type} [name] - desc` | parameter; `query.`/`header.`/`cookie.` prefixes pick the location |
//! | `@body {Type} desc` | JSON request body |
//! | `@returns {Type} 200 - desc` | response (also `@return`, `@response`) |
//! | `@tags a, b` / `@deprecated` / `@operationId id` | endpoint metadata |
//! | `@typedef {Object} Name` + `@property {type} [name] - desc` | schema |

use regex::Regex;

use super::{
    IssueKind, ParseInput, ParseIssue, ParseOutput, ParserCapabilities, SourceParser, SourceType,
    line_of, normalize_route_path, type_ref_for,
};
use crate::ast::{
    AstBuilder, Endpoint, HttpMethod, Parameter, ParameterLocation, PropertySchema, RequestBody,
    Response, Schema, TypeRef, path_parameters,
};
use crate::types::{DocGenError, Result};

// =============================================================================
// Doc Blocks
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct DocTag {
    name: String,
    body: String,
}

/// One `/** ... */` comment, stripped of its comment syntax
#[derive(Debug, Clone)]
struct DocBlock {
    /// Byte offsets of the comment in the source
    start: usize,
    end: usize,
    text: String,
    tags: Vec<DocTag>,
}

impl DocBlock {
    fn tag(&self, name: &str) -> Option<&DocTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    fn tags_named<'a>(&'a self, names: &'a [&str]) -> impl Iterator<Item = &'a DocTag> {
        self.tags.iter().filter(move |t| names.contains(&t.name.as_str()))
    }
}

struct DocScanner {
    block: Regex,
}

impl DocScanner {
    fn new(parser_name: &str) -> Result<Self> {
        let block = Regex::new(r"(?s)/\*\*(.*?)\*/")
            .map_err(|e| DocGenError::parse(parser_name, format!("Invalid pattern: {}", e)))?;
        Ok(Self { block })
    }

    fn blocks(&self, content: &str) -> Vec<DocBlock> {
        self.block
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let inner = caps.get(1)?.as_str();
                Some(split_block(whole.start(), whole.end(), inner))
            })
            .collect()
    }
}

fn split_block(start: usize, end: usize, inner: &str) -> DocBlock {
    let mut text_lines: Vec<&str> = Vec::new();
    let mut tags: Vec<DocTag> = Vec::new();

    for raw in inner.lines() {
        let line = raw.trim().trim_start_matches('*').trim();
        if let Some(rest) = line.strip_prefix('@') {
            let (name, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            tags.push(DocTag {
                name: name.to_string(),
                body: body.trim().to_string(),
            });
        } else if let Some(last) = tags.last_mut() {
            if !line.is_empty() {
                if !last.body.is_empty() {
                    last.body.push(' ');
                }
                last.body.push_str(line);
            }
        } else {
            text_lines.push(line);
        }
    }

    DocBlock {
        start,
        end,
        text: text_lines.join("\n").trim().to_string(),
        tags,
    }
}

/// Split a `{type} rest` tag body into the braced type and the remainder
fn split_type(body: &str) -> (Option<&str>, &str) {
    let body = body.trim();
    if let Some(rest) = body.strip_prefix('{')
        && let Some(close) = rest.find('}')
    {
        return (Some(rest[..close].trim()), rest[close + 1..].trim());
    }
    (None, body)
}

/// Split `name - description` (the dash is optional)
fn split_name(rest: &str) -> (&str, Option<String>) {
    let rest = rest.trim();
    let (name, desc) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let desc = desc.trim().trim_start_matches('-').trim();
    (name, (!desc.is_empty()).then(|| desc.to_string()))
}

/// Map a JSDoc type expression onto a TypeRef.
/// Returns the type and whether the expression marks the value optional.
fn js_type_ref(raw: &str) -> (TypeRef, bool) {
    let mut raw = raw.trim();
    let mut optional = false;
    if let Some(inner) = raw.strip_suffix('=') {
        raw = inner;
        optional = true;
    }
    if let Some(inner) = raw.strip_prefix('?') {
        raw = inner;
        optional = true;
    }
    (parse_js_type(raw), optional)
}

fn parse_js_type(raw: &str) -> TypeRef {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_suffix("[]") {
        return TypeRef::array(parse_js_type(inner));
    }
    for prefix in ["Array.<", "Array<"] {
        if let Some(inner) = raw.strip_prefix(prefix).and_then(|r| r.strip_suffix('>')) {
            return TypeRef::array(parse_js_type(inner));
        }
    }
    if raw.contains('|') {
        // Unions collapse to their single non-null member, else any
        let members: Vec<&str> = raw
            .split('|')
            .map(str::trim)
            .filter(|m| !matches!(*m, "null" | "undefined"))
            .collect();
        return match members.as_slice() {
            [single] => parse_js_type(single),
            _ => TypeRef::any(),
        };
    }
    type_ref_for(raw)
}

// =============================================================================
// Tag Interpretation
// =============================================================================

fn apply_block(endpoint: &mut Endpoint, block: &DocBlock) {
    let mut paragraphs = block.text.splitn(2, "\n\n");
    let lead = paragraphs.next().unwrap_or_default().replace('\n', " ");
    let rest = paragraphs.next().map(|p| p.trim().to_string());

    endpoint.summary = block
        .tag("summary")
        .map(|t| t.body.clone())
        .or_else(|| (!lead.is_empty()).then_some(lead));
    endpoint.description = block
        .tag("description")
        .map(|t| t.body.clone())
        .or(rest)
        .filter(|d| !d.is_empty());
    endpoint.operation_id = block.tag("operationId").map(|t| t.body.clone());
    endpoint.deprecated = block.tag("deprecated").is_some();

    for tag in block.tags_named(&["tags", "tag"]) {
        endpoint.tags.extend(
            tag.body
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
        );
    }

    let path_params = path_parameters(&endpoint.path);
    for tag in block.tags_named(&["param", "arg", "argument"]) {
        if let Some(parameter) = doc_parameter(&tag.body, &path_params) {
            endpoint.parameters.push(parameter);
        }
    }

    if let Some(tag) = block.tag("body") {
        let (raw_type, rest) = split_type(&tag.body);
        let (schema, optional) = raw_type.map(js_type_ref).unwrap_or((TypeRef::any(), false));
        let mut body = RequestBody::json(schema, !optional);
        body.description = (!rest.is_empty()).then(|| rest.to_string());
        endpoint.request_body = Some(body);
    }

    for tag in block.tags_named(&["returns", "return", "response"]) {
        endpoint.responses.push(doc_response(&tag.body));
    }
}

fn doc_parameter(body: &str, path_params: &[String]) -> Option<Parameter> {
    let (raw_type, rest) = split_type(body);
    let (name, description) = split_name(rest);

    let (mut schema, mut optional) = raw_type.map(js_type_ref).unwrap_or((TypeRef::any(), false));
    let mut name = name;
    if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        // [name=default]
        name = inner.split('=').next().unwrap_or(inner);
        optional = true;
    }
    if name.is_empty() {
        return None;
    }

    let (location, name) = match name.split_once('.') {
        Some((prefix, field)) => match prefix.parse::<ParameterLocation>() {
            Ok(location) => (location, field),
            Err(_) => return None,
        },
        None if path_params.iter().any(|p| p == name) => (ParameterLocation::Path, name),
        None => (ParameterLocation::Query, name),
    };
    if location == ParameterLocation::Body {
        schema = TypeRef::any();
    }

    Some(
        Parameter::new(name, location, schema)
            .required(!optional)
            .with_description(description),
    )
}

fn doc_response(body: &str) -> Response {
    let (raw_type, rest) = split_type(body);
    let (first, description) = split_name(rest);
    let (status, description) = if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
        (first.to_string(), description)
    } else {
        let text = rest.trim().trim_start_matches('-').trim();
        ("200".to_string(), (!text.is_empty()).then(|| text.to_string()))
    };
    let schema = raw_type.map(|t| js_type_ref(t).0);
    Response::new(status)
        .with_description(description)
        .with_schema(schema)
}

/// Schemas declared with `@typedef` blocks
fn typedef_schema(block: &DocBlock) -> Option<Schema> {
    let tag = block.tag("typedef")?;
    let (_, rest) = split_type(&tag.body);
    let name = rest.split_whitespace().next()?;

    let description = (!block.text.is_empty()).then(|| block.text.clone());
    let mut schema = Schema::new(name).with_description(description);
    for prop in block.tags_named(&["property", "prop"]) {
        let (raw_type, rest) = split_type(&prop.body);
        let (prop_name, description) = split_name(rest);
        let (type_ref, mut optional) = raw_type.map(js_type_ref).unwrap_or((TypeRef::any(), false));
        let mut prop_name = prop_name;
        if let Some(inner) = prop_name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
            prop_name = inner.split('=').next().unwrap_or(inner);
            optional = true;
        }
        if prop_name.is_empty() {
            continue;
        }
        schema.properties.insert(
            prop_name.to_string(),
            PropertySchema::new(type_ref, !optional).with_description(description),
        );
    }
    Some(schema)
}

/// Path placeholders without a documented parameter become required string params
fn fill_path_parameters(endpoint: &mut Endpoint) {
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

fn finish(
    builder: &mut AstBuilder,
    warnings: &mut Vec<ParseIssue>,
    input: &ParseInput<'_>,
    mut endpoint: Endpoint,
    line: u32,
) {
    fill_path_parameters(&mut endpoint);
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

fn add_typedefs(
    builder: &mut AstBuilder,
    warnings: &mut Vec<ParseIssue>,
    content: &str,
    blocks: &[DocBlock],
) {
    for block in blocks {
        if let Some(schema) = typedef_schema(block) {
            let name = schema.name.clone();
            if !builder.schema(schema) {
                warnings.push(
                    ParseIssue::new(
                        IssueKind::DuplicateSchema,
                        format!("Duplicate typedef '{}'", name),
                    )
                    .at_line(line_of(content, block.start)),
                );
            }
        }
    }
}

fn new_builder(source_type: SourceType, input: &ParseInput<'_>) -> AstBuilder {
    AstBuilder::new(source_type.tag()).project(
        input.config.project_name.clone(),
        input.config.project_version.clone(),
    )
}

// =============================================================================
// Express Parser
// =============================================================================

pub struct ExpressParser {
    docs: DocScanner,
    route: Regex,
}

impl ExpressParser {
    pub fn new() -> Result<Self> {
        let route = Regex::new(
            r#"\b([A-Za-z_$][\w$]*)\.(get|post|put|patch|delete|head|options|all)\s*\(\s*['"`]([^'"`]*)['"`]"#,
        )
        .map_err(|e| DocGenError::parse("express", format!("Invalid pattern: {}", e)))?;
        Ok(Self {
            docs: DocScanner::new("express")?,
            route,
        })
    }
}

impl SourceParser for ExpressParser {
    fn source_type(&self) -> SourceType {
        SourceType::Express
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: "Express",
            extensions: &["js", "mjs", "cjs", "ts"],
            extracts_schemas: true,
        }
    }

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
        let content = input.content;
        let blocks = self.docs.blocks(content);
        let mut builder = new_builder(SourceType::Express, input);
        let mut warnings = Vec::new();

        for caps in self.route.captures_iter(content) {
            let (Some(whole), Some(receiver), Some(verb), Some(raw_path)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            if !is_router_receiver(receiver.as_str()) {
                continue;
            }
            let line = line_of(content, whole.start());
            if verb.as_str() == "all" {
                warnings.push(
                    ParseIssue::new(
                        IssueKind::Ambiguous,
                        format!("Skipped '{}.all' route {}", receiver.as_str(), raw_path.as_str()),
                    )
                    .at_line(line),
                );
                continue;
            }
            let Ok(method) = verb.as_str().parse::<HttpMethod>() else {
                continue;
            };

            let mut endpoint = Endpoint::new(method, normalize_route_path(raw_path.as_str()));
            if let Some(block) = preceding_block(&blocks, content, whole.start()) {
                apply_block(&mut endpoint, block);
            }
            finish(&mut builder, &mut warnings, input, endpoint, line);
        }

        add_typedefs(&mut builder, &mut warnings, content, &blocks);
        ParseOutput::success(builder.build(), warnings)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        unterminated_comment(input.content).into_iter().collect()
    }
}

/// `app`, `router`, `api`, or any `fooRouter` binding
fn is_router_receiver(name: &str) -> bool {
    matches!(name, "app" | "router" | "api" | "server") || name.ends_with("Router")
}

/// The doc block ending right before `offset`, separated only by whitespace
fn preceding_block<'a>(blocks: &'a [DocBlock], content: &str, offset: usize) -> Option<&'a DocBlock> {
    blocks
        .iter()
        .rev()
        .find(|b| b.end <= offset)
        .filter(|b| content[b.end..offset].trim().is_empty())
}

fn unterminated_comment(content: &str) -> Option<ParseIssue> {
    let open = content.rfind("/**")?;
    if content[open..].contains("*/") {
        return None;
    }
    Some(
        ParseIssue::parse_error("Unterminated block comment")
            .at_line(line_of(content, open)),
    )
}

// =============================================================================
// JSDoc Parser
// =============================================================================

pub struct JsDocParser {
    docs: DocScanner,
}

impl JsDocParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            docs: DocScanner::new("jsdoc")?,
        })
    }
}

impl SourceParser for JsDocParser {
    fn source_type(&self) -> SourceType {
        SourceType::JsDoc
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: "JSDoc",
            extensions: &["js", "mjs", "cjs", "ts", "jsx", "tsx"],
            extracts_schemas: true,
        }
    }

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
        if let Some(issue) = unterminated_comment(input.content) {
            return ParseOutput::failure(issue);
        }

        let content = input.content;
        let blocks = self.docs.blocks(content);
        let mut builder = new_builder(SourceType::JsDoc, input);
        let mut warnings = Vec::new();

        for block in &blocks {
            let Some(route) = block.tag("route") else {
                continue;
            };
            let line = line_of(content, block.start);
            let (verb, raw_path) = route
                .body
                .split_once(char::is_whitespace)
                .map(|(v, p)| (v, p.trim()))
                .unwrap_or((route.body.as_str(), ""));
            let Ok(method) = verb.parse::<HttpMethod>() else {
                warnings.push(
                    ParseIssue::new(
                        IssueKind::Ambiguous,
                        format!("Unrecognized @route method '{}'", verb),
                    )
                    .at_line(line),
                );
                continue;
            };
            if raw_path.is_empty() {
                warnings.push(
                    ParseIssue::new(IssueKind::Ambiguous, "@route without a path").at_line(line),
                );
                continue;
            }

            let mut endpoint = Endpoint::new(method, normalize_route_path(raw_path));
            apply_block(&mut endpoint, block);
            finish(&mut builder, &mut warnings, input, endpoint, line);
        }

        add_typedefs(&mut builder, &mut warnings, content, &blocks);
        ParseOutput::success(builder.build(), warnings)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        unterminated_comment(input.content).into_iter().collect()
    }
}
