//! GraphQL SDL parser
//!
//! A small hand-written lexer and recursive-descent parser for the type
//! system subset of the SDL. Fields of the root operation types (`Query`,
//! `Mutation`, `Subscription`, or whatever a `schema { ... }` block names)
//! become endpoints whose path is the field name; object, input and
//! interface types become schemas, enums become enum schemas.

use std::collections::{HashMap, HashSet};

use super::{
    IssueKind, ParseInput, ParseIssue, ParseOutput, ParserCapabilities, SourceParser, SourceType,
    normalize_primitive,
};
use crate::ast::{
    AstBuilder, Endpoint, HttpMethod, Parameter, ParameterLocation, PropertySchema, Response,
    Schema, TypeRef,
};

type ParseStep<T> = std::result::Result<T, ParseIssue>;

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Name(String),
    Str(String),
    /// Numbers and other value literals are only ever skipped
    Number(String),
    Punct(char),
    Spread,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: u32,
}

fn tokenize(content: &str) -> ParseStep<Vec<Token>> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() || c == ',' || c == '\u{feff}' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' => {
                let start_line = line;
                let literal = if chars[i..].starts_with(&['"', '"', '"']) {
                    read_block_string(&chars, i + 3, &mut line)
                } else {
                    read_string(&chars, i + 1)
                };
                let (text, next) = literal.ok_or_else(|| {
                    ParseIssue::parse_error("Unterminated string").at_line(start_line)
                })?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line: start_line,
                });
                i = next;
            }
            '.' if chars[i..].starts_with(&['.', '.', '.']) => {
                tokens.push(Token {
                    kind: TokenKind::Spread,
                    line,
                });
                i += 3;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Name(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '+' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number(chars[start..i].iter().collect()),
                    line,
                });
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ':' | '!' | '=' | '@' | '|' | '&' | '$' => {
                tokens.push(Token {
                    kind: TokenKind::Punct(c),
                    line,
                });
                i += 1;
            }
            other => {
                return Err(
                    ParseIssue::parse_error(format!("Unexpected character '{}'", other))
                        .at_line(line),
                );
            }
        }
    }
    Ok(tokens)
}

fn read_string(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    let mut text = String::new();
    while i < chars.len() {
        match chars[i] {
            '"' => return Some((text, i + 1)),
            '\n' => return None,
            '\\' => {
                let escaped = *chars.get(i + 1)?;
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    'u' => {
                        let hex: String = chars.get(i + 2..i + 6)?.iter().collect();
                        text.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
                        i += 4;
                    }
                    other => text.push(other),
                }
                i += 2;
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    None
}

fn read_block_string(chars: &[char], mut i: usize, line: &mut u32) -> Option<(String, usize)> {
    let start = i;
    while i < chars.len() {
        if chars[i..].starts_with(&['"', '"', '"']) {
            let raw: String = chars[start..i].iter().collect();
            return Some((dedent_block(&raw.replace("\\\"\"\"", "\"\"\"")), i + 3));
        }
        if chars[i] == '\n' {
            *line += 1;
        }
        i += 1;
    }
    None
}

/// Block string value: common indentation removed, blank edges trimmed
fn dedent_block(raw: &str) -> String {
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
        .map(|(n, l)| {
            if n == 0 {
                l.trim()
            } else {
                l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// =============================================================================
// Syntax
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum GqlType {
    Named(String),
    List(Box<GqlType>),
    NonNull(Box<GqlType>),
}

impl GqlType {
    fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

#[derive(Debug)]
struct InputValue {
    description: Option<String>,
    name: String,
    ty: GqlType,
}

#[derive(Debug)]
struct FieldDef {
    description: Option<String>,
    name: String,
    args: Vec<InputValue>,
    ty: GqlType,
    deprecated: bool,
    line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Type,
    Input,
    Interface,
}

#[derive(Debug)]
enum Definition {
    Object {
        kind: ObjectKind,
        name: String,
        description: Option<String>,
        fields: Vec<FieldDef>,
        extension: bool,
        line: u32,
    },
    Enum {
        name: String,
        description: Option<String>,
        values: Vec<String>,
    },
    Union {
        name: String,
        description: Option<String>,
    },
    Scalar(String),
    SchemaRoots(Vec<(String, String)>),
}

struct SdlParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SdlParser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        self.pos += 1;
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> ParseStep<T> {
        Err(ParseIssue::parse_error(message).at_line(self.line()))
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek() == Some(&TokenKind::Punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> ParseStep<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.error(format!("Expected '{}'", c))
        }
    }

    fn at_name(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(TokenKind::Name(n)) if n == keyword)
    }

    fn expect_name(&mut self) -> ParseStep<String> {
        match self.advance() {
            Some(TokenKind::Name(name)) => Ok(name),
            _ => {
                self.pos -= 1;
                self.error("Expected a name")
            }
        }
    }

    fn description(&mut self) -> Option<String> {
        match self.peek() {
            Some(TokenKind::Str(text)) => {
                let text = text.clone();
                self.pos += 1;
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    }

    fn document(&mut self) -> ParseStep<Vec<Definition>> {
        let mut definitions = Vec::new();
        while self.peek().is_some() {
            if let Some(definition) = self.definition()? {
                definitions.push(definition);
            }
        }
        Ok(definitions)
    }

    fn definition(&mut self) -> ParseStep<Option<Definition>> {
        let description = self.description();
        let line = self.line();
        let extension = self.at_name("extend");
        if extension {
            self.pos += 1;
        }
        let keyword = self.expect_name()?;
        match keyword.as_str() {
            "schema" => {
                self.directives()?;
                Ok(Some(Definition::SchemaRoots(self.schema_roots()?)))
            }
            "type" | "input" | "interface" => {
                let kind = match keyword.as_str() {
                    "type" => ObjectKind::Type,
                    "input" => ObjectKind::Input,
                    _ => ObjectKind::Interface,
                };
                let name = self.expect_name()?;
                if self.at_name("implements") {
                    self.pos += 1;
                    self.eat_punct('&');
                    self.expect_name()?;
                    while self.eat_punct('&') {
                        self.expect_name()?;
                    }
                }
                self.directives()?;
                let fields = if self.at_punct('{') {
                    self.fields(kind)?
                } else {
                    Vec::new()
                };
                Ok(Some(Definition::Object {
                    kind,
                    name,
                    description,
                    fields,
                    extension,
                    line,
                }))
            }
            "enum" => {
                let name = self.expect_name()?;
                self.directives()?;
                let mut values = Vec::new();
                if self.eat_punct('{') {
                    while !self.eat_punct('}') {
                        if self.peek().is_none() {
                            return self.error("Unterminated enum body");
                        }
                        self.description();
                        values.push(self.expect_name()?);
                        self.directives()?;
                    }
                }
                Ok(Some(Definition::Enum {
                    name,
                    description,
                    values,
                }))
            }
            "union" => {
                let name = self.expect_name()?;
                self.directives()?;
                if self.eat_punct('=') {
                    self.eat_punct('|');
                    self.expect_name()?;
                    while self.eat_punct('|') {
                        self.expect_name()?;
                    }
                }
                Ok(Some(Definition::Union { name, description }))
            }
            "scalar" => {
                let name = self.expect_name()?;
                self.directives()?;
                Ok(Some(Definition::Scalar(name)))
            }
            "directive" => {
                self.expect_punct('@')?;
                self.expect_name()?;
                if self.at_punct('(') {
                    self.arguments_definition()?;
                }
                if self.at_name("repeatable") {
                    self.pos += 1;
                }
                if !self.at_name("on") {
                    return self.error("Expected 'on' in directive definition");
                }
                self.pos += 1;
                self.eat_punct('|');
                self.expect_name()?;
                while self.eat_punct('|') {
                    self.expect_name()?;
                }
                Ok(None)
            }
            "query" | "mutation" | "subscription" | "fragment" => {
                self.error("Executable definitions are not part of a schema")
            }
            other => self.error(format!("Unexpected keyword '{}'", other)),
        }
    }

    fn schema_roots(&mut self) -> ParseStep<Vec<(String, String)>> {
        let mut roots = Vec::new();
        self.expect_punct('{')?;
        while !self.eat_punct('}') {
            let operation = self.expect_name()?;
            self.expect_punct(':')?;
            roots.push((operation, self.expect_name()?));
        }
        Ok(roots)
    }

    fn fields(&mut self, kind: ObjectKind) -> ParseStep<Vec<FieldDef>> {
        self.expect_punct('{')?;
        let mut fields = Vec::new();
        while !self.eat_punct('}') {
            if self.peek().is_none() {
                return self.error("Unterminated field list");
            }
            let description = self.description();
            let line = self.line();
            let name = self.expect_name()?;
            let args = if kind != ObjectKind::Input && self.at_punct('(') {
                self.arguments_definition()?
            } else {
                Vec::new()
            };
            self.expect_punct(':')?;
            let ty = self.type_ref()?;
            if self.eat_punct('=') {
                self.skip_value()?;
            }
            let deprecated = self.directives()?.iter().any(|d| d == "deprecated");
            fields.push(FieldDef {
                description,
                name,
                args,
                ty,
                deprecated,
                line,
            });
        }
        Ok(fields)
    }

    fn arguments_definition(&mut self) -> ParseStep<Vec<InputValue>> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        while !self.eat_punct(')') {
            if self.peek().is_none() {
                return self.error("Unterminated argument list");
            }
            let description = self.description();
            let name = self.expect_name()?;
            self.expect_punct(':')?;
            let ty = self.type_ref()?;
            if self.eat_punct('=') {
                self.skip_value()?;
            }
            self.directives()?;
            args.push(InputValue {
                description,
                name,
                ty,
            });
        }
        Ok(args)
    }

    fn type_ref(&mut self) -> ParseStep<GqlType> {
        let inner = if self.eat_punct('[') {
            let item = self.type_ref()?;
            self.expect_punct(']')?;
            GqlType::List(Box::new(item))
        } else {
            GqlType::Named(self.expect_name()?)
        };
        if self.eat_punct('!') {
            Ok(GqlType::NonNull(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    /// Skip directive applications, returning their names
    fn directives(&mut self) -> ParseStep<Vec<String>> {
        let mut names = Vec::new();
        while self.eat_punct('@') {
            names.push(self.expect_name()?);
            if self.at_punct('(') {
                self.skip_balanced('(', ')')?;
            }
        }
        Ok(names)
    }

    fn skip_value(&mut self) -> ParseStep<()> {
        if self.at_punct('[') {
            return self.skip_balanced('[', ']');
        }
        if self.at_punct('{') {
            return self.skip_balanced('{', '}');
        }
        if self.eat_punct('$') {
            self.expect_name()?;
            return Ok(());
        }
        match self.advance() {
            Some(TokenKind::Name(_) | TokenKind::Str(_) | TokenKind::Number(_)) => Ok(()),
            _ => {
                self.pos -= 1;
                self.error("Expected a value")
            }
        }
    }

    fn skip_balanced(&mut self, open: char, close: char) -> ParseStep<()> {
        self.expect_punct(open)?;
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                Some(TokenKind::Punct(c)) if c == open => depth += 1,
                Some(TokenKind::Punct(c)) if c == close => depth -= 1,
                Some(_) => {}
                None => return self.error(format!("Unbalanced '{}'", open)),
            }
        }
        Ok(())
    }
}

fn parse_sdl(content: &str) -> ParseStep<Vec<Definition>> {
    let tokens = tokenize(content)?;
    SdlParser { tokens, pos: 0 }.document()
}

// =============================================================================
// Canonical Mapping
// =============================================================================

struct TypeMapper {
    scalars: HashSet<String>,
}

impl TypeMapper {
    fn map(&self, ty: &GqlType) -> TypeRef {
        match ty {
            GqlType::NonNull(inner) => self.map(inner),
            GqlType::List(item) => TypeRef::array(self.map(item)),
            GqlType::Named(name) => match normalize_primitive(name) {
                Some(primitive) => TypeRef::primitive(primitive),
                // Custom scalars serialize as strings unless stated otherwise
                None if self.scalars.contains(name) => TypeRef::primitive("string"),
                None => TypeRef::named(name),
            },
        }
    }
}

fn split_description(text: Option<String>) -> (Option<String>, Option<String>) {
    let Some(text) = text else {
        return (None, None);
    };
    match text.split_once("\n\n") {
        Some((summary, rest)) => (
            Some(summary.replace('\n', " ")),
            Some(rest.trim().to_string()).filter(|r| !r.is_empty()),
        ),
        None => (Some(text.replace('\n', " ")), None),
    }
}

pub struct GraphQlParser;

impl GraphQlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GraphQlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for GraphQlParser {
    fn source_type(&self) -> SourceType {
        SourceType::GraphQl
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            name: "GraphQL SDL",
            extensions: &["graphql", "graphqls", "gql"],
            extracts_schemas: true,
        }
    }

    fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
        let definitions = match parse_sdl(input.content) {
            Ok(definitions) => definitions,
            Err(issue) => return ParseOutput::failure(issue),
        };

        let mut roots: HashMap<String, HttpMethod> = HashMap::from([
            ("Query".to_string(), HttpMethod::Query),
            ("Mutation".to_string(), HttpMethod::Mutation),
            ("Subscription".to_string(), HttpMethod::Subscription),
        ]);
        let mut scalars = HashSet::new();
        for definition in &definitions {
            match definition {
                Definition::SchemaRoots(entries) => {
                    roots.clear();
                    for (operation, type_name) in entries {
                        let method = match operation.as_str() {
                            "query" => HttpMethod::Query,
                            "mutation" => HttpMethod::Mutation,
                            _ => HttpMethod::Subscription,
                        };
                        roots.insert(type_name.clone(), method);
                    }
                }
                Definition::Scalar(name) => {
                    scalars.insert(name.clone());
                }
                _ => {}
            }
        }
        let mapper = TypeMapper { scalars };

        let mut builder = AstBuilder::new(SourceType::GraphQl.tag()).project(
            input.config.project_name.clone(),
            input.config.project_version.clone(),
        );
        let mut warnings = Vec::new();
        let mut schema_order: Vec<Schema> = Vec::new();

        for definition in definitions {
            match definition {
                Definition::Object {
                    kind,
                    name,
                    description,
                    fields,
                    extension,
                    line,
                } => {
                    if kind == ObjectKind::Type
                        && let Some(method) = roots.get(&name).copied()
                    {
                        for field in fields {
                            let field_line = field.line;
                            let endpoint =
                                input.config.finish_endpoint(field_endpoint(method, field, &mapper));
                            let locator = endpoint.locator();
                            if !builder.endpoint(endpoint) {
                                warnings.push(
                                    ParseIssue::new(
                                        IssueKind::DuplicateEndpoint,
                                        format!("Duplicate root field {}", locator),
                                    )
                                    .at_line(field_line),
                                );
                            }
                        }
                        continue;
                    }

                    let schema = object_schema(&name, description, &fields, &mapper);
                    match schema_order.iter_mut().find(|s| s.name == name) {
                        Some(existing) if extension => {
                            existing.properties.extend(schema.properties);
                        }
                        Some(_) => warnings.push(
                            ParseIssue::new(
                                IssueKind::DuplicateSchema,
                                format!("Duplicate type '{}'", name),
                            )
                            .at_line(line),
                        ),
                        None => schema_order.push(schema),
                    }
                }
                Definition::Enum {
                    name,
                    description,
                    values,
                } => {
                    let mut schema = Schema::new(name).with_description(description);
                    schema.enum_values = values;
                    schema_order.push(schema);
                }
                Definition::Union { name, description } => {
                    schema_order.push(Schema::new(name).with_description(description));
                }
                Definition::Scalar(_) | Definition::SchemaRoots(_) => {}
            }
        }

        for schema in schema_order {
            let name = schema.name.clone();
            if !builder.schema(schema) {
                warnings.push(ParseIssue::new(
                    IssueKind::DuplicateSchema,
                    format!("Duplicate type '{}'", name),
                ));
            }
        }

        ParseOutput::success(builder.build(), warnings)
    }

    fn validate(&self, input: &ParseInput<'_>) -> Vec<ParseIssue> {
        parse_sdl(input.content).err().into_iter().collect()
    }
}

fn field_endpoint(method: HttpMethod, field: FieldDef, mapper: &TypeMapper) -> Endpoint {
    let mut endpoint = Endpoint::new(method, field.name);
    let (summary, description) = split_description(field.description);
    endpoint.summary = summary;
    endpoint.description = description;
    endpoint.deprecated = field.deprecated;
    endpoint.parameters = field
        .args
        .into_iter()
        .map(|arg| {
            Parameter::new(arg.name, ParameterLocation::Body, mapper.map(&arg.ty))
                .required(arg.ty.is_non_null())
                .with_description(arg.description)
        })
        .collect();
    endpoint
        .responses
        .push(Response::new("200").with_schema(Some(mapper.map(&field.ty))));
    endpoint
}

fn object_schema(
    name: &str,
    description: Option<String>,
    fields: &[FieldDef],
    mapper: &TypeMapper,
) -> Schema {
    let mut schema = Schema::new(name).with_description(description);
    for field in fields {
        schema.properties.insert(
            field.name.clone(),
            PropertySchema::new(mapper.map(&field.ty), field.ty.is_non_null())
                .with_description(field.description.clone()),
        );
    }
    schema
}
