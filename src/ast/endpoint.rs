use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TypeRef;
use crate::constants::parser::JSON_MEDIA_TYPE;

/// Operation verb. HTTP methods plus the GraphQL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Query,
    Mutation,
    Subscription,
}

impl HttpMethod {
    pub const HTTP: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" | "DEL" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            "QUERY" => Ok(Self::Query),
            "MUTATION" => Ok(Self::Mutation),
            "SUBSCRIPTION" => Ok(Self::Subscription),
            _ => Err(format!("Unknown method: {}", s)),
        }
    }
}

/// Where a parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Cookie => write!(f, "cookie"),
            Self::Body => write!(f, "body"),
        }
    }
}

impl FromStr for ParameterLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            "body" | "formdata" => Ok(Self::Body),
            _ => Err(format!("Unknown parameter location: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: TypeRef) -> Self {
        // Path parameters are always required
        let required = location == ParameterLocation::Path;
        Self {
            name: name.into(),
            location,
            required,
            description: None,
            schema,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterLocation::Path;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: TypeRef,
}

impl RequestBody {
    pub fn json(schema: TypeRef, required: bool) -> Self {
        Self {
            content_type: JSON_MEDIA_TYPE.to_string(),
            description: None,
            required,
            schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status code as written in the source ("200", "404", "default")
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl Response {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            description: None,
            schema: None,
            example: None,
        }
    }

    pub fn with_schema(mut self, schema: Option<TypeRef>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }
}

/// Identity of an endpoint within one AST
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    /// Set only through AI enhancement, never by a parser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_description: Option<String>,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            summary: None,
            description: None,
            operation_id: None,
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
            tags: Vec::new(),
            deprecated: false,
            enhanced_description: None,
        }
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.method, self.path.clone())
    }

    /// `"GET /users/{id}"`
    pub fn locator(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Grouping key used downstream (first tag)
    pub fn group(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.location == location)
    }

    pub fn response(&self, status: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.status == status)
    }

    /// Every named schema reference made by this endpoint
    pub fn referenced_names(&self) -> Vec<&str> {
        let params = self
            .parameters
            .iter()
            .filter_map(|p| p.schema.referenced_name());
        let body = self
            .request_body
            .iter()
            .filter_map(|b| b.schema.referenced_name());
        let responses = self
            .responses
            .iter()
            .filter_map(|r| r.schema.as_ref().and_then(TypeRef::referenced_name));
        params.chain(body).chain(responses).collect()
    }
}

/// Extract `{name}` placeholders from a templated path
pub fn path_parameters(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &rest[start + len + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip_through_str() {
        for method in HttpMethod::HTTP {
            assert_eq!(method.as_str().parse::<HttpMethod>().unwrap(), method);
        }
        assert_eq!("del".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_path_parameters_always_required() {
        let param = Parameter::new("id", ParameterLocation::Path, TypeRef::primitive("string"))
            .required(false);
        assert!(param.required);

        let query = Parameter::new("q", ParameterLocation::Query, TypeRef::primitive("string"));
        assert!(!query.required);
    }

    #[test]
    fn test_endpoint_locator_and_group() {
        let mut endpoint = Endpoint::new(HttpMethod::Get, "/users/{id}");
        assert_eq!(endpoint.locator(), "GET /users/{id}");
        assert_eq!(endpoint.group(), None);

        endpoint.tags = vec!["users".to_string(), "admin".to_string()];
        assert_eq!(endpoint.group(), Some("users"));
    }

    #[test]
    fn test_endpoint_referenced_names() {
        let mut endpoint = Endpoint::new(HttpMethod::Post, "/orders");
        endpoint.request_body = Some(RequestBody::json(TypeRef::named("NewOrder"), true));
        endpoint.responses.push(
            Response::new("201").with_schema(Some(TypeRef::array(TypeRef::named("Order")))),
        );
        endpoint.parameters.push(Parameter::new(
            "X-Trace",
            ParameterLocation::Header,
            TypeRef::primitive("string"),
        ));

        assert_eq!(endpoint.referenced_names(), vec!["NewOrder", "Order"]);
    }

    #[test]
    fn test_path_parameters() {
        assert_eq!(
            path_parameters("/users/{userId}/posts/{postId}"),
            vec!["userId", "postId"]
        );
        assert!(path_parameters("/health").is_empty());
        assert!(path_parameters("/broken/{oops").is_empty());
    }
}
