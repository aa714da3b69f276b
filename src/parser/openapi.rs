//! OpenAPI 3.x / Swagger 2.0 parser
//!
//! Walks the document as a `serde_json::Value` (YAML is read through the same
//! model). Local `$ref`s to schemas become named references; `$ref`s to shared
//! parameters, request bodies and responses are inlined. A shared `$ref` that
//! does not resolve is reported as a broken reference, never dropped quietly.

use serde_json::{Map, Value};

use super::{
    IssueKind, ParseInput, ParseIssue, ParseOutput, ParserCapabilities, SourceParser, SourceType,
    normalize_primitive,
};
use crate::ast::{
    AstBuilder, Endpoint, HttpMethod, Parameter, ParameterLocation, PropertySchema, RequestBody,
    Response, Schema, TypeRef,
};
use crate::constants::parser::JSON_MEDIA_TYPE;
use crate::types::{json_bool, json_string, json_string_array};

pub struct OpenApiParser {
    source_type: SourceType,
}

impl OpenApiParser {
    /// One implementation serves both the `openapi` and `swagger` tags
    pub fn new(source_type: SourceType) -> Self {
        Self { source_type }
    }
}

impl SourceParser for OpenApiParser {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: match self.source_type {
                SourceType::Swagger => "Swagger 2.0",
                _ => "OpenAPI 3.x",
            },
            extensions: &["json", "yaml", "yml"],
            extracts_schemas: true,
        }
    }

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
        let doc = match load_document(input.content) {
            Ok(doc) => doc,
            Err(issue) => return ParseOutput::failure(issue),
        };
        let version = match spec_version(&doc) {
            Ok(version) => version,
            Err(issue) => return ParseOutput::failure(issue),
        };

        let mut warnings = Vec::new();
        let mut dangling = Vec::new();
        let info = doc.get("info").cloned().unwrap_or(Value::Null);
        let mut builder = AstBuilder::new(self.source_type.tag()).project(
            json_string(&info, "title"),
            info.get("version").and_then(version_text),
        );
        builder.set_project(
            input.config.project_name.clone(),
            input.config.project_version.clone(),
        );
        builder.extra("specVersion", Value::String(version.label()));
        if let Some(servers) = server_urls(&doc, version) {
            builder.extra("servers", servers);
        }

        for (name, raw) in schema_definitions(&doc, version) {
            builder.schema(build_schema(name, raw));
        }

        let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
            warnings.push(ParseIssue::new(
                IssueKind::Ambiguous,
                "Document has no 'paths' object",
            ));
            return ParseOutput::success(builder.build(), warnings);
        };

        for (path, item) in paths {
            if path.is_empty() {
                warnings.push(ParseIssue::new(IssueKind::Ambiguous, "Skipped empty path key"));
                continue;
            }
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared_params = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for (key, operation) in item {
                let Some(method) = operation_method(key) else {
                    continue;
                };
                let endpoint = build_endpoint(
                    &doc,
                    version,
                    method,
                    path,
                    operation,
                    &shared_params,
                    &mut dangling,
                );
                let endpoint = input.config.finish_endpoint(endpoint);
                let locator = endpoint.locator();
                if !builder.endpoint(endpoint) {
                    warnings.push(ParseIssue::new(
                        IssueKind::DuplicateEndpoint,
                        format!("Duplicate endpoint {}", locator),
                    ));
                }
            }
        }

        finish(builder, warnings, dangling)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        match load_document(input.content).and_then(|doc| spec_version(&doc)) {
            Ok(_) => Vec::new(),
            Err(issue) => vec![issue],
        }
    }
}

// =============================================================================
// Document Loading
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecVersion {
    Swagger2,
    OpenApi3,
}

impl SpecVersion {
    fn label(&self) -> String {
        match self {
            Self::Swagger2 => "2.0".to_string(),
            Self::OpenApi3 => "3.x".to_string(),
        }
    }
}

fn load_document(content: &str) -> Result<Value, ParseIssue> {
    if content.trim_start().starts_with('{') {
        return serde_json::from_str(content).map_err(|e| {
            ParseIssue::parse_error(format!("Invalid JSON: {}", e)).at_line(e.line() as u32)
        });
    }
    serde_yaml::from_str::<Value>(content).map_err(|e| {
        let issue = ParseIssue::parse_error(format!("Invalid YAML: {}", e));
        match e.location() {
            Some(location) => issue.at_line(location.line() as u32),
            None => issue,
        }
    })
}

fn spec_version(doc: &Value) -> Result<SpecVersion, ParseIssue> {
    if !doc.is_object() {
        return Err(ParseIssue::parse_error("Document root is not an object"));
    }
    if let Some(version) = doc.get("openapi").and_then(version_text) {
        if version.starts_with('3') {
            return Ok(SpecVersion::OpenApi3);
        }
        return Err(ParseIssue::parse_error(format!(
            "Unsupported OpenAPI version: {}",
            version
        )));
    }
    if let Some(version) = doc.get("swagger").and_then(version_text) {
        if version.starts_with('2') {
            return Ok(SpecVersion::Swagger2);
        }
        return Err(ParseIssue::parse_error(format!(
            "Unsupported Swagger version: {}",
            version
        )));
    }
    Err(ParseIssue::parse_error(
        "Missing 'openapi' or 'swagger' version field",
    ))
}

// YAML reads an unquoted `2.0` as a number
fn version_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn server_urls(doc: &Value, version: SpecVersion) -> Option<Value> {
    match version {
        SpecVersion::OpenApi3 => {
            let urls: Vec<Value> = doc
                .get("servers")?
                .as_array()?
                .iter()
                .filter_map(|s| s.get("url").cloned())
                .collect();
            (!urls.is_empty()).then_some(Value::Array(urls))
        }
        SpecVersion::Swagger2 => {
            let host = json_string(doc, "host")?;
            let base = json_string(doc, "basePath").unwrap_or_default();
            Some(Value::Array(vec![Value::String(format!("{}{}", host, base))]))
        }
    }
}

fn operation_method(key: &str) -> Option<HttpMethod> {
    let method: HttpMethod = key.parse().ok()?;
    HttpMethod::HTTP.contains(&method).then_some(method)
}

/// Follow a local `$ref` (JSON pointer into the same document).
/// A reference that does not resolve is pushed onto `dangling`.
fn resolve_local<'a>(
    doc: &'a Value,
    value: &'a Value,
    dangling: &mut Vec<String>,
) -> Option<&'a Value> {
    let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
        return Some(value);
    };
    let target = reference
        .strip_prefix('#')
        .and_then(|pointer| doc.pointer(pointer));
    if target.is_none() {
        dangling.push(reference.to_string());
    }
    target
}

fn finish(
    builder: AstBuilder,
    mut warnings: Vec<ParseIssue>,
    mut dangling: Vec<String>,
) -> ParseOutput {
    dangling.sort();
    dangling.dedup();
    for reference in &dangling {
        warnings.push(ParseIssue::new(
            IssueKind::UnresolvedReference,
            format!("Unresolved reference '{}'", reference),
        ));
    }
    let names = dangling.iter().map(|r| ref_name(r).to_string()).collect();
    ParseOutput::success(builder.build(), warnings).with_broken_references(names)
}

// =============================================================================
// Schemas
// =============================================================================

fn schema_definitions(doc: &Value, version: SpecVersion) -> Vec<(&str, &Value)> {
    let container = match version {
        SpecVersion::OpenApi3 => doc.pointer("/components/schemas"),
        SpecVersion::Swagger2 => doc.get("definitions"),
    };
    container
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

fn build_schema(name: &str, raw: &Value) -> Schema {
    let mut schema = Schema::new(name).with_description(json_string(raw, "description"));
    let required = json_string_array(raw, "required");

    let mut properties = Map::new();
    collect_properties(raw, &mut properties);
    for (prop_name, prop) in &properties {
        let property = PropertySchema::new(schema_type_ref(prop), required.contains(prop_name))
            .with_description(json_string(prop, "description"));
        schema.properties.insert(prop_name.clone(), property);
    }

    // allOf composition contributes required lists too
    if let Some(parts) = raw.get("allOf").and_then(Value::as_array) {
        for part in parts {
            for name in json_string_array(part, "required") {
                if let Some(property) = schema.properties.get_mut(&name) {
                    property.required = true;
                }
            }
        }
    }

    if let Some(values) = raw.get("enum").and_then(Value::as_array) {
        schema.enum_values = values.iter().map(enum_value_text).collect();
    }
    schema
}

fn collect_properties(raw: &Value, into: &mut Map<String, Value>) {
    if let Some(props) = raw.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            into.insert(name.clone(), prop.clone());
        }
    }
    if let Some(parts) = raw.get("allOf").and_then(Value::as_array) {
        for part in parts {
            collect_properties(part, into);
        }
    }
}

fn enum_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Name of the schema a `$ref` points at (`#/components/schemas/User` -> `User`)
fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn schema_type_ref(schema: &Value) -> TypeRef {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        return TypeRef::named(ref_name(reference));
    }

    for combinator in ["allOf", "oneOf", "anyOf"] {
        if let Some([single]) = schema.get(combinator).and_then(Value::as_array).map(Vec::as_slice) {
            return schema_type_ref(single);
        }
    }

    match json_string(schema, "type").as_deref() {
        Some("array") => {
            let items = schema.get("items").map(schema_type_ref).unwrap_or_else(TypeRef::any);
            TypeRef::array(items)
        }
        Some("string") if json_string(schema, "format").as_deref() == Some("binary") => {
            TypeRef::primitive("binary")
        }
        Some("file") => TypeRef::primitive("binary"),
        Some(raw) => TypeRef::primitive(normalize_primitive(raw).unwrap_or("any")),
        None if schema.get("properties").is_some() => TypeRef::primitive("object"),
        None => TypeRef::any(),
    }
}

// =============================================================================
// Endpoints
// =============================================================================

fn build_endpoint(
    doc: &Value,
    version: SpecVersion,
    method: HttpMethod,
    path: &str,
    operation: &Value,
    shared_params: &[Value],
    dangling: &mut Vec<String>,
) -> Endpoint {
    let mut endpoint = Endpoint::new(method, path);
    endpoint.summary = json_string(operation, "summary");
    endpoint.description = json_string(operation, "description");
    endpoint.operation_id = json_string(operation, "operationId");
    endpoint.tags = json_string_array(operation, "tags");
    endpoint.deprecated = json_bool(operation, "deprecated", false);

    // Operation-level parameters override path-level ones with the same (name, in)
    let own_params = operation
        .get("parameters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut raw_params: Vec<&Value> = Vec::new();
    for param in shared_params.iter().chain(own_params) {
        let Some(param) = resolve_local(doc, param, dangling) else {
            continue;
        };
        let identity = (json_string(param, "name"), json_string(param, "in"));
        raw_params.retain(|p| (json_string(p, "name"), json_string(p, "in")) != identity);
        raw_params.push(param);
    }

    for param in raw_params {
        let location = json_string(param, "in").unwrap_or_default();
        if version == SpecVersion::Swagger2 && location == "body" {
            let schema = param.get("schema").map(schema_type_ref).unwrap_or_else(TypeRef::any);
            let mut body = RequestBody::json(schema, json_bool(param, "required", false));
            body.description = json_string(param, "description");
            endpoint.request_body = Some(body);
            continue;
        }
        if let Some(parameter) = build_parameter(param, version) {
            endpoint.parameters.push(parameter);
        }
    }

    if version == SpecVersion::OpenApi3
        && let Some(raw_body) = operation.get("requestBody")
    {
        endpoint.request_body = Some(match resolve_local(doc, raw_body, dangling) {
            Some(raw) => build_request_body(raw),
            None => RequestBody::json(TypeRef::any(), false),
        });
    }

    if let Some(responses) = operation.get("responses").and_then(Value::as_object) {
        for (status, raw) in responses {
            let response = match resolve_local(doc, raw, dangling) {
                Some(raw) => build_response(status, raw, version),
                None => Response::new(status),
            };
            endpoint.responses.push(response);
        }
    }

    endpoint
}

fn build_parameter(param: &Value, version: SpecVersion) -> Option<Parameter> {
    let name = json_string(param, "name")?;
    let location: ParameterLocation = json_string(param, "in")?.parse().ok()?;
    let schema = match version {
        SpecVersion::OpenApi3 => param.get("schema").map(schema_type_ref),
        // Swagger 2 inlines type/items/format on the parameter itself
        SpecVersion::Swagger2 => Some(schema_type_ref(param)),
    }
    .unwrap_or_else(TypeRef::any);

    Some(
        Parameter::new(name, location, schema)
            .required(json_bool(param, "required", false))
            .with_description(json_string(param, "description")),
    )
}

fn build_request_body(raw: &Value) -> RequestBody {
    let content = raw.get("content").and_then(Value::as_object);
    let (content_type, media) = content
        .and_then(|c| {
            c.get(JSON_MEDIA_TYPE)
                .map(|v| (JSON_MEDIA_TYPE.to_string(), v))
                .or_else(|| c.iter().next().map(|(k, v)| (k.clone(), v)))
        })
        .map(|(k, v)| (k, Some(v)))
        .unwrap_or_else(|| (JSON_MEDIA_TYPE.to_string(), None));

    let schema = media
        .and_then(|m| m.get("schema"))
        .map(schema_type_ref)
        .unwrap_or_else(TypeRef::any);

    RequestBody {
        content_type,
        description: json_string(raw, "description"),
        required: json_bool(raw, "required", false),
        schema,
    }
}

fn build_response(status: &str, raw: &Value, version: SpecVersion) -> Response {
    let (schema, example) = match version {
        SpecVersion::OpenApi3 => {
            let media = raw
                .get("content")
                .and_then(Value::as_object)
                .and_then(|c| c.get(JSON_MEDIA_TYPE).or_else(|| c.values().next()));
            let schema = media.and_then(|m| m.get("schema")).map(schema_type_ref);
            let example = media.and_then(|m| {
                m.get("example").cloned().or_else(|| {
                    m.get("examples")
                        .and_then(Value::as_object)
                        .and_then(|e| e.values().next())
                        .and_then(|e| e.get("value"))
                        .cloned()
                })
            });
            (schema, example)
        }
        SpecVersion::Swagger2 => (
            raw.get("schema").map(schema_type_ref),
            raw.pointer("/examples/application~1json").cloned(),
        ),
    };

    let mut response = Response::new(status)
        .with_description(json_string(raw, "description"))
        .with_schema(schema);
    response.example = example;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserConfig;
    use serde_json::json;

    fn parse(content: &str) -> ParseOutput {
        let config = ParserConfig::default();
        OpenApiParser::new(SourceType::OpenApi).parse(&ParseInput::new(content, &config))
    }

    const PETSTORE_V3: &str = r##"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.2.0
servers:
  - url: https://api.example.com/v1
paths:
  /pets:
    get:
      summary: List pets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          schema: { type: integer }
      responses:
        "200":
          description: A list of pets
          content:
            application/json:
              schema:
                type: array
                items: { $ref: "#/components/schemas/Pet" }
    post:
      summary: Create a pet
      requestBody:
        required: true
        content:
          application/json:
            schema: { $ref: "#/components/schemas/NewPet" }
      responses:
        "201": { description: Created }
  /pets/{petId}:
    parameters:
      - $ref: "#/components/parameters/PetId"
    get:
      operationId: getPet
      deprecated: true
      responses:
        "200":
          description: A pet
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Pet" }
              example: { id: 1, name: Rex }
        default: { description: Error }
components:
  parameters:
    PetId:
      name: petId
      in: path
      required: true
      schema: { type: string }
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id: { type: integer, format: int64 }
        name: { type: string, description: Pet name }
        status: { type: string, enum: [available, sold] }
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string }
    Status:
      type: string
      enum: [available, pending, sold]
"##;

    #[test]
    fn test_parse_openapi3_document() {
        let output = parse(PETSTORE_V3);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        let ast = output.ast.unwrap();

        assert_eq!(ast.metadata().project_name.as_deref(), Some("Petstore"));
        assert_eq!(ast.metadata().project_version.as_deref(), Some("1.2.0"));
        assert_eq!(
            ast.metadata().extra.get("servers"),
            Some(&json!(["https://api.example.com/v1"]))
        );

        let locators: Vec<String> = ast.endpoints().iter().map(|e| e.locator()).collect();
        assert_eq!(
            locators,
            vec!["GET /pets", "POST /pets", "GET /pets/{petId}"]
        );

        let list = ast.endpoint(HttpMethod::Get, "/pets").unwrap();
        assert_eq!(list.tags, vec!["pets"]);
        assert_eq!(
            list.response("200").unwrap().schema,
            Some(TypeRef::array(TypeRef::named("Pet")))
        );
        let limit = list.parameter("limit", ParameterLocation::Query).unwrap();
        assert_eq!(limit.schema, TypeRef::primitive("integer"));
        assert!(!limit.required);

        let create = ast.endpoint(HttpMethod::Post, "/pets").unwrap();
        let body = create.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.schema, TypeRef::named("NewPet"));

        let get = ast.endpoint(HttpMethod::Get, "/pets/{petId}").unwrap();
        assert!(get.deprecated);
        assert_eq!(get.operation_id.as_deref(), Some("getPet"));
        assert!(get.parameter("petId", ParameterLocation::Path).unwrap().required);
        assert_eq!(get.response("200").unwrap().example, Some(json!({"id": 1, "name": "Rex"})));
        assert!(get.response("default").is_some());
    }

    #[test]
    fn test_openapi3_schemas() {
        let ast = parse(PETSTORE_V3).ast.unwrap();
        let pet = ast.schema("Pet").unwrap();
        assert!(pet.properties["id"].required);
        assert!(!pet.properties["status"].required);
        assert_eq!(pet.properties["name"].description.as_deref(), Some("Pet name"));

        let status = ast.schema("Status").unwrap();
        assert_eq!(status.enum_values, vec!["available", "pending", "sold"]);
    }

    #[test]
    fn test_parse_swagger2_document() {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "Legacy", "version": "0.9"},
            "host": "legacy.example.com",
            "basePath": "/api",
            "paths": {
                "/users/{id}": {
                    "put": {
                        "parameters": [
                            {"name": "id", "in": "path", "type": "string", "required": true},
                            {"name": "body", "in": "body", "required": true,
                             "schema": {"$ref": "#/definitions/User"}},
                            {"name": "tags", "in": "query", "type": "array", "items": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {"description": "ok", "schema": {"$ref": "#/definitions/User"}}
                        }
                    }
                }
            },
            "definitions": {
                "User": {"type": "object", "properties": {"id": {"type": "string"}}}
            }
        });
        let config = ParserConfig::default();
        let content = doc.to_string();
        let output = OpenApiParser::new(SourceType::Swagger)
            .parse(&ParseInput::new(&content, &config));
        let ast = output.ast.unwrap();

        let put = ast.endpoint(HttpMethod::Put, "/users/{id}").unwrap();
        assert_eq!(
            put.request_body.as_ref().map(|b| &b.schema),
            Some(&TypeRef::named("User"))
        );
        assert_eq!(put.parameters.len(), 2);
        assert_eq!(
            put.parameter("tags", ParameterLocation::Query).unwrap().schema,
            TypeRef::array(TypeRef::primitive("string"))
        );
        assert!(ast.schema("User").is_some());
        assert_eq!(
            ast.metadata().extra.get("servers"),
            Some(&json!(["legacy.example.com/api"]))
        );
    }

    #[test]
    fn test_config_overrides_info() {
        let value = json!({"projectName": "Override", "defaultTag": "misc"});
        let config = ParserConfig::from_value(Some(&value));
        let output = OpenApiParser::new(SourceType::OpenApi)
            .parse(&ParseInput::new(PETSTORE_V3, &config));
        let ast = output.ast.unwrap();
        assert_eq!(ast.metadata().project_name.as_deref(), Some("Override"));
        assert_eq!(ast.metadata().project_version.as_deref(), Some("1.2.0"));
        let create = ast.endpoint(HttpMethod::Post, "/pets").unwrap();
        assert_eq!(create.tags, vec!["misc"]);
    }

    #[test]
    fn test_malformed_documents_fail() {
        let output = parse("{ \"openapi\": ");
        assert_eq!(output.errors[0].kind, IssueKind::ParseError);
        assert!(output.ast.is_none());

        let output = parse("title: not an api\n");
        assert!(output.errors[0].message.contains("Missing"));

        let output = parse("openapi: 4.0.0\npaths: {}\n");
        assert!(output.errors[0].message.contains("Unsupported"));
    }

    #[test]
    fn test_validate_is_cheap_check() {
        let config = ParserConfig::default();
        let parser = OpenApiParser::new(SourceType::OpenApi);
        assert!(parser.validate(&ParseInput::new(PETSTORE_V3, &config)).is_empty());
        assert_eq!(
            parser.validate(&ParseInput::new("- a\n- b\n", &config)).len(),
            1
        );
    }

    #[test]
    fn test_missing_paths_is_warning() {
        let output = parse("openapi: 3.1.0\ninfo: {title: Empty, version: '1'}\n");
        assert!(output.errors.is_empty());
        assert_eq!(output.warnings[0].kind, IssueKind::Ambiguous);
        assert!(output.ast.unwrap().endpoints().is_empty());
    }

    #[test]
    fn test_dangling_shared_refs_are_reported() {
        let output = parse(
            r##"
openapi: 3.0.0
info: {title: Broken, version: 1.0}
paths:
  /users/{id}:
    get:
      parameters:
        - $ref: "#/components/parameters/Missing"
        - {name: verbose, in: query, schema: {type: boolean}}
      responses:
        "200": {$ref: "#/components/responses/AlsoMissing"}
"##,
        );
        assert!(output.errors.is_empty());
        assert_eq!(output.broken_references, vec!["Missing", "AlsoMissing"]);
        let messages: Vec<&str> = output.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Unresolved reference '#/components/parameters/Missing'",
                "Unresolved reference '#/components/responses/AlsoMissing'",
            ]
        );
        assert!(output.warnings.iter().all(|w| w.kind == IssueKind::UnresolvedReference));

        let ast = output.ast.unwrap();
        assert_eq!(ast.metadata().project_version.as_deref(), Some("1.0"));
        let get = ast.endpoint(HttpMethod::Get, "/users/{id}").unwrap();
        assert_eq!(get.parameters.len(), 1);
        assert!(get.response("200").is_some());
    }

    #[test]
    fn test_schema_type_ref_shapes() {
        assert_eq!(schema_type_ref(&json!({"type": "string", "format": "binary"})), TypeRef::primitive("binary"));
        assert_eq!(
            schema_type_ref(&json!({"allOf": [{"$ref": "#/components/schemas/Base"}]})),
            TypeRef::named("Base")
        );
        assert_eq!(schema_type_ref(&json!({"properties": {}})), TypeRef::primitive("object"));
        assert_eq!(schema_type_ref(&json!({})), TypeRef::any());
    }
}
