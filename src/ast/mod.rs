//! Canonical AST
//!
//! The parser-agnostic representation every parser emits into and every
//! downstream consumer (diff engine, enhancement, generators) reads from.
//!
//! ## Invariants
//!
//! - `(method, path)` is unique among endpoints; endpoint order is declaration order
//! - schema names are unique (map keys) and match `Schema::name`
//! - a named reference that does not resolve marks the AST `unresolved`
//! - an AST is never mutated after it is built; enhancement produces a new AST that
//!   shares every untouched endpoint with the original (`Arc` per endpoint)

mod endpoint;
mod schema;

pub use endpoint::{
    Endpoint, EndpointKey, HttpMethod, Parameter, ParameterLocation, RequestBody, Response,
    path_parameters,
};
pub use schema::{PropertySchema, Schema, TypeRef};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive metadata about the parsed source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstMetadata {
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_version: Option<String>,
    /// Stamped by the registry after parsing; excluded from structural equality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalAst {
    endpoints: Vec<Arc<Endpoint>>,
    schemas: BTreeMap<String, Schema>,
    metadata: AstMetadata,
    #[serde(default)]
    unresolved: bool,
}

impl CanonicalAst {
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn metadata(&self) -> &AstMetadata {
        &self.metadata
    }

    /// True when at least one named reference did not resolve
    pub fn is_unresolved(&self) -> bool {
        self.unresolved
    }

    pub fn endpoint(&self, method: HttpMethod, path: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
            .map(|e| e.as_ref())
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Equality ignoring the parse timestamp
    pub fn structurally_eq(&self, other: &CanonicalAst) -> bool {
        self.endpoints == other.endpoints
            && self.schemas == other.schemas
            && self.unresolved == other.unresolved
            && self.metadata.source_type == other.metadata.source_type
            && self.metadata.project_name == other.metadata.project_name
            && self.metadata.project_version == other.metadata.project_version
            && self.metadata.extra == other.metadata.extra
    }

    /// All named references made anywhere in the AST
    pub fn referenced_names(&self) -> BTreeSet<&str> {
        let from_endpoints = self.endpoints.iter().flat_map(|e| e.referenced_names());
        let from_schemas = self.schemas.values().flat_map(Schema::referenced_names);
        from_endpoints.chain(from_schemas).collect()
    }

    /// Endpoints grouped by their first tag, groups in first-appearance order.
    /// Untagged endpoints fall under `default_group`.
    pub fn grouped_endpoints<'a>(&'a self, default_group: &'a str) -> Vec<(&'a str, Vec<&'a Endpoint>)> {
        let mut groups: Vec<(&str, Vec<&Endpoint>)> = Vec::new();
        for endpoint in &self.endpoints {
            let endpoint: &Endpoint = endpoint;
            let group = endpoint.group().unwrap_or(default_group);
            match groups.iter_mut().find(|(name, _)| *name == group) {
                Some((_, members)) => members.push(endpoint),
                None => groups.push((group, vec![endpoint])),
            }
        }
        groups
    }

    /// Build a new AST with enhanced descriptions applied.
    ///
    /// Endpoints without an entry in `enhancements` are shared with `self`;
    /// only the touched endpoints are cloned.
    pub fn with_enhancements(&self, enhancements: &HashMap<EndpointKey, String>) -> CanonicalAst {
        let endpoints = self
            .endpoints
            .iter()
            .map(|endpoint| match enhancements.get(&endpoint.key()) {
                Some(text) => {
                    let mut enhanced = Endpoint::clone(endpoint);
                    enhanced.enhanced_description = Some(text.clone());
                    Arc::new(enhanced)
                }
                None => Arc::clone(endpoint),
            })
            .collect();

        CanonicalAst {
            endpoints,
            schemas: self.schemas.clone(),
            metadata: self.metadata.clone(),
            unresolved: self.unresolved,
        }
    }

    // Registry-only finishing steps

    pub(crate) fn mark_unresolved(&mut self, unresolved: bool) {
        self.unresolved = unresolved;
    }

    pub(crate) fn stamp(&mut self, parsed_at: DateTime<Utc>) {
        self.metadata.parsed_at = Some(parsed_at);
    }
}

/// Builds a draft AST. Enforces endpoint and schema uniqueness (first wins).
#[derive(Debug)]
pub struct AstBuilder {
    ast: CanonicalAst,
}

impl AstBuilder {
    pub fn new(source_type: impl Into<String>) -> Self {
        Self {
            ast: CanonicalAst {
                metadata: AstMetadata {
                    source_type: source_type.into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    pub fn project(mut self, name: Option<String>, version: Option<String>) -> Self {
        self.set_project(name, version);
        self
    }

    pub fn set_project(&mut self, name: Option<String>, version: Option<String>) {
        if name.is_some() {
            self.ast.metadata.project_name = name;
        }
        if version.is_some() {
            self.ast.metadata.project_version = version;
        }
    }

    pub fn extra(&mut self, key: impl Into<String>, value: Value) {
        self.ast.metadata.extra.insert(key.into(), value);
    }

    /// Add an endpoint. Returns false (and drops it) if `(method, path)` already exists.
    pub fn endpoint(&mut self, endpoint: Endpoint) -> bool {
        let exists = self
            .ast
            .endpoints
            .iter()
            .any(|e| e.method == endpoint.method && e.path == endpoint.path);
        if exists {
            return false;
        }
        self.ast.endpoints.push(Arc::new(endpoint));
        true
    }

    /// Add a schema. Returns false (and drops it) if the name already exists.
    pub fn schema(&mut self, schema: Schema) -> bool {
        if self.ast.schemas.contains_key(&schema.name) {
            return false;
        }
        self.ast.schemas.insert(schema.name.clone(), schema);
        true
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.ast.schemas.contains_key(name)
    }

    pub fn endpoint_count(&self) -> usize {
        self.ast.endpoints.len()
    }

    pub fn build(self) -> CanonicalAst {
        self.ast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanonicalAst {
        let mut builder = AstBuilder::new("openapi").project(Some("shop".into()), Some("1.0".into()));
        let mut list = Endpoint::new(HttpMethod::Get, "/users");
        list.tags = vec!["users".into()];
        builder.endpoint(list);
        builder.endpoint(Endpoint::new(HttpMethod::Get, "/health"));
        let mut get = Endpoint::new(HttpMethod::Get, "/users/{id}");
        get.tags = vec!["users".into()];
        get.responses
            .push(Response::new("200").with_schema(Some(TypeRef::named("User"))));
        builder.endpoint(get);
        builder.schema(Schema::new("User"));
        builder.build()
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let mut builder = AstBuilder::new("test");
        assert!(builder.endpoint(Endpoint::new(HttpMethod::Get, "/a")));
        assert!(!builder.endpoint(Endpoint::new(HttpMethod::Get, "/a")));
        assert!(builder.endpoint(Endpoint::new(HttpMethod::Post, "/a")));
        assert!(builder.schema(Schema::new("A")));
        assert!(!builder.schema(Schema::new("A")));

        let ast = builder.build();
        assert_eq!(ast.endpoints().len(), 2);
        assert_eq!(ast.schemas().len(), 1);
    }

    #[test]
    fn test_structural_equality_ignores_timestamp() {
        let a = sample();
        let mut b = sample();
        b.stamp(Utc::now());
        assert_ne!(a, b);
        assert!(a.structurally_eq(&b));
    }

    #[test]
    fn test_grouped_endpoints_preserve_order() {
        let ast = sample();
        let groups = ast.grouped_endpoints("default");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "users");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "default");
    }

    #[test]
    fn test_enhancement_is_copy_on_write() {
        let original = sample();
        let mut enhancements = HashMap::new();
        enhancements.insert(
            EndpointKey::new(HttpMethod::Get, "/users"),
            "Lists every user.".to_string(),
        );

        let enhanced = original.with_enhancements(&enhancements);

        // Original untouched
        assert!(original.endpoints()[0].enhanced_description.is_none());
        assert_eq!(
            enhanced.endpoints()[0].enhanced_description.as_deref(),
            Some("Lists every user.")
        );
        // Untouched endpoints are shared, touched ones are not
        assert!(Arc::ptr_eq(&original.endpoints()[1], &enhanced.endpoints()[1]));
        assert!(!Arc::ptr_eq(&original.endpoints()[0], &enhanced.endpoints()[0]));
    }

    #[test]
    fn test_referenced_names() {
        let ast = sample();
        assert_eq!(ast.referenced_names().into_iter().collect::<Vec<_>>(), vec!["User"]);
    }

    #[test]
    fn test_serde_round_trip_keeps_structure() {
        let ast = sample();
        let json = serde_json::to_string(&ast).unwrap();
        let back: CanonicalAst = serde_json::from_str(&json).unwrap();
        assert!(ast.structurally_eq(&back));
    }
}
