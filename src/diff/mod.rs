//! Version Comparison
//!
//! Compares two canonical ASTs and classifies every structural change.
//!
//! ## Sections
//!
//! - `diff`: endpoint and schema matching, ordering, rollup
//! - [`classify`]: field-level comparison and the breaking-change policy
//! - [`report`]: Markdown projection of a result
//!
//! Endpoints match on `(method, path)` and schemas on name. There is no
//! rename detection: a renamed endpoint is one removal plus one addition.
//! A breaking change replaces the modification it refines, so every
//! endpoint or schema contributes at most one change.

pub mod classify;
pub mod report;

pub use classify::Difference;
pub use report::render_markdown;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::ast::{CanonicalAst, Endpoint, EndpointKey, HttpMethod};
use crate::types::{AstSide, DiffError};

// =============================================================================
// Result Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Breaking,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Modified => write!(f, "modified"),
            Self::Breaking => write!(f, "breaking"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffChange {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Endpoint path, or `#/schemas/<Name>` for schema changes
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DiffChange {
    /// `"GET /users"` for endpoints, the schema locator otherwise
    pub fn locator(&self) -> String {
        match self.method {
            Some(method) => format!("{} {}", method, self.path),
            None => self.path.clone(),
        }
    }

    pub fn is_schema_change(&self) -> bool {
        self.method.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub total_changes: usize,
    pub breaking_changes: usize,
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
}

impl DiffSummary {
    fn from_changes(changes: &[DiffChange]) -> Self {
        let count = |t: ChangeType| changes.iter().filter(|c| c.change_type == t).count();
        Self {
            total_changes: changes.len(),
            breaking_changes: count(ChangeType::Breaking),
            additions: count(ChangeType::Added),
            removals: count(ChangeType::Removed),
            modifications: count(ChangeType::Modified),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<DiffChange>,
    pub summary: DiffSummary,
}

impl DiffResult {
    fn new(changes: Vec<DiffChange>) -> Self {
        let summary = DiffSummary::from_changes(&changes);
        Self { changes, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.summary.breaking_changes > 0
    }

    pub fn changes_of(&self, change_type: ChangeType) -> impl Iterator<Item = &DiffChange> {
        self.changes
            .iter()
            .filter(move |c| c.change_type == change_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Skip differences confined to summaries and descriptions
    #[serde(default)]
    pub ignore_descriptions: bool,
    #[serde(default = "default_true")]
    pub include_schemas: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_descriptions: false,
            include_schemas: true,
        }
    }
}

// =============================================================================
// Diff
// =============================================================================

/// Compare two ASTs.
///
/// Change order: endpoint changes in new-AST declaration order, then
/// removed endpoints in old-AST order, then schema changes by name.
pub fn diff(old: &CanonicalAst, new: &CanonicalAst, options: &DiffOptions) -> Result<DiffResult, DiffError> {
    validate(old, AstSide::Old)?;
    validate(new, AstSide::New)?;

    let old_index: HashMap<EndpointKey, &Endpoint> = old
        .endpoints()
        .iter()
        .map(|e| (e.key(), e.as_ref()))
        .collect();
    let new_keys: HashSet<EndpointKey> = new.endpoints().iter().map(|e| e.key()).collect();

    let narrowed = classify::narrowed_schemas(old.schemas(), new.schemas());
    let mut changes = Vec::new();

    for endpoint in new.endpoints() {
        match old_index.get(&endpoint.key()) {
            None => changes.push(endpoint_change(
                ChangeType::Added,
                endpoint,
                format!("endpoint {} added", endpoint.locator()),
                None,
            )),
            Some(previous) => {
                let mut diffs = classify::compare_endpoints(previous, endpoint, options);
                for name in classify::reachable_schemas(previous, old.schemas()) {
                    if narrowed.contains(name) {
                        diffs.push(Difference {
                            field: "schema",
                            message: format!("referenced schema '{}' was narrowed", name),
                            breaking: true,
                        });
                    }
                }
                if let Some(change) = rollup(&diffs, |change_type, description, details| {
                    endpoint_change(change_type, endpoint, description, Some(details))
                }) {
                    changes.push(change);
                }
            }
        }
    }

    for endpoint in old.endpoints() {
        if !new_keys.contains(&endpoint.key()) {
            changes.push(endpoint_change(
                ChangeType::Removed,
                endpoint,
                format!("endpoint {} removed", endpoint.locator()),
                None,
            ));
        }
    }

    if options.include_schemas {
        changes.extend(diff_schemas(old, new, options));
    }

    let result = DiffResult::new(changes);
    debug!(
        total = result.summary.total_changes,
        breaking = result.summary.breaking_changes,
        "diff complete"
    );
    Ok(result)
}

fn diff_schemas(old: &CanonicalAst, new: &CanonicalAst, options: &DiffOptions) -> Vec<DiffChange> {
    let mut names: Vec<&String> = old.schemas().keys().chain(new.schemas().keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .filter_map(|name| {
            let locator = schema_locator(name);
            match (old.schema(name), new.schema(name)) {
                (None, Some(_)) => Some(schema_change(
                    ChangeType::Added,
                    locator,
                    format!("schema '{}' added", name),
                    None,
                )),
                (Some(_), None) => Some(schema_change(
                    ChangeType::Removed,
                    locator,
                    format!("schema '{}' removed", name),
                    None,
                )),
                (Some(a), Some(b)) => {
                    let diffs = classify::compare_schemas(a, b, options);
                    rollup(&diffs, |change_type, description, details| {
                        schema_change(change_type, locator, description, Some(details))
                    })
                }
                (None, None) => None,
            }
        })
        .collect()
}

/// Collapse a difference list into at most one change.
///
/// Any breaking difference makes the whole change breaking and only the
/// breaking messages go into its description; every difference is kept in
/// `details`.
fn rollup<F>(diffs: &[Difference], make: F) -> Option<DiffChange>
where
    F: FnOnce(ChangeType, String, Value) -> DiffChange,
{
    if diffs.is_empty() {
        return None;
    }
    let breaking: Vec<&str> = diffs
        .iter()
        .filter(|d| d.breaking)
        .map(|d| d.message.as_str())
        .collect();

    let (change_type, description) = if breaking.is_empty() {
        let all: Vec<&str> = diffs.iter().map(|d| d.message.as_str()).collect();
        (ChangeType::Modified, all.join("; "))
    } else {
        (ChangeType::Breaking, breaking.join("; "))
    };

    Some(make(change_type, description, json!({ "differences": diffs })))
}

fn endpoint_change(
    change_type: ChangeType,
    endpoint: &Endpoint,
    description: String,
    details: Option<Value>,
) -> DiffChange {
    DiffChange {
        change_type,
        path: endpoint.path.clone(),
        method: Some(endpoint.method),
        description,
        details,
    }
}

fn schema_change(
    change_type: ChangeType,
    locator: String,
    description: String,
    details: Option<Value>,
) -> DiffChange {
    DiffChange {
        change_type,
        path: locator,
        method: None,
        description,
        details,
    }
}

pub fn schema_locator(name: &str) -> String {
    format!("#/schemas/{}", name)
}

/// Reject ASTs that break the model's identity rules
pub fn validate(ast: &CanonicalAst, side: AstSide) -> Result<(), DiffError> {
    let mut seen: HashSet<EndpointKey> = HashSet::new();
    for (index, endpoint) in ast.endpoints().iter().enumerate() {
        if endpoint.path.trim().is_empty() {
            return Err(DiffError::EmptyPath {
                side,
                index,
                method: endpoint.method.to_string(),
            });
        }
        if !seen.insert(endpoint.key()) {
            return Err(DiffError::DuplicateEndpoint {
                side,
                locator: endpoint.locator(),
            });
        }
    }

    for (key, schema) in ast.schemas() {
        if key != &schema.name {
            return Err(DiffError::SchemaNameMismatch {
                side,
                key: key.clone(),
                name: schema.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        AstBuilder, Parameter, ParameterLocation, PropertySchema, RequestBody, Response, Schema,
        TypeRef,
    };
    use proptest::prelude::*;

    fn users_endpoint() -> Endpoint {
        let mut e = Endpoint::new(HttpMethod::Get, "/users");
        e.summary = Some("List users".into());
        e.parameters.push(Parameter::new(
            "limit",
            ParameterLocation::Query,
            TypeRef::primitive("integer"),
        ));
        e.responses.push(
            Response::new("200").with_schema(Some(TypeRef::array(TypeRef::named("User")))),
        );
        e
    }

    fn user_schema() -> Schema {
        Schema::new("User")
            .with_property("id", PropertySchema::new(TypeRef::primitive("integer"), true))
            .with_property("email", PropertySchema::new(TypeRef::primitive("string"), false))
    }

    fn ast(endpoints: Vec<Endpoint>, schemas: Vec<Schema>) -> CanonicalAst {
        let mut builder = AstBuilder::new("openapi");
        for e in endpoints {
            builder.endpoint(e);
        }
        for s in schemas {
            builder.schema(s);
        }
        builder.build()
    }

    #[test]
    fn test_identical_asts_have_no_changes() {
        let a = ast(vec![users_endpoint()], vec![user_schema()]);
        let result = diff(&a, &a, &DiffOptions::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.summary, DiffSummary::default());
    }

    #[test]
    fn test_newly_required_parameter_is_breaking() {
        let old = ast(vec![users_endpoint()], vec![user_schema()]);
        let mut changed = users_endpoint();
        changed.parameters[0].required = true;
        changed.summary = Some("List all users".into());
        let new = ast(vec![changed], vec![user_schema()]);

        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        assert_eq!(result.changes.len(), 1);
        let change = &result.changes[0];
        assert_eq!(change.change_type, ChangeType::Breaking);
        assert_eq!(change.locator(), "GET /users");
        assert_eq!(change.description, "parameter 'limit' (query) is now required");
        assert_eq!(result.summary.breaking_changes, 1);
        assert_eq!(result.summary.modifications, 0);

        let details = change.details.as_ref().unwrap();
        assert_eq!(details["differences"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_added_and_removed_ordering() {
        let health = Endpoint::new(HttpMethod::Get, "/health");
        let legacy = Endpoint::new(HttpMethod::Delete, "/legacy");
        let orders = Endpoint::new(HttpMethod::Post, "/orders");

        let old = ast(vec![legacy.clone(), users_endpoint()], vec![user_schema()]);
        let mut modified = users_endpoint();
        modified.tags = vec!["users".into()];
        let new = ast(vec![orders, modified, health], vec![user_schema()]);

        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        let locators: Vec<String> = result.changes.iter().map(DiffChange::locator).collect();
        assert_eq!(
            locators,
            vec!["POST /orders", "GET /users", "GET /health", "DELETE /legacy"]
        );
        assert_eq!(result.summary.additions, 2);
        assert_eq!(result.summary.modifications, 1);
        assert_eq!(result.summary.removals, 1);
        assert_eq!(result.summary.total_changes, 4);
    }

    #[test]
    fn test_same_path_different_method_is_distinct() {
        let old = ast(vec![Endpoint::new(HttpMethod::Get, "/items")], vec![]);
        let new = ast(vec![Endpoint::new(HttpMethod::Post, "/items")], vec![]);
        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        assert_eq!(result.summary.additions, 1);
        assert_eq!(result.summary.removals, 1);
    }

    #[test]
    fn test_schema_changes() {
        let old = ast(vec![users_endpoint()], vec![user_schema(), Schema::new("Legacy")]);
        let mut narrowed = user_schema();
        narrowed.properties.remove("email");
        let new = ast(vec![users_endpoint()], vec![narrowed, Schema::new("Order")]);

        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        let locators: Vec<String> = result.changes.iter().map(DiffChange::locator).collect();
        // The endpoint returning User[] is broken by the narrowing too
        assert_eq!(
            locators,
            vec!["GET /users", "#/schemas/Legacy", "#/schemas/Order", "#/schemas/User"]
        );
        assert_eq!(result.changes[0].change_type, ChangeType::Breaking);
        assert_eq!(
            result.changes[0].description,
            "referenced schema 'User' was narrowed"
        );
        assert_eq!(result.changes[1].change_type, ChangeType::Removed);
        assert_eq!(result.changes[2].change_type, ChangeType::Added);
        assert_eq!(result.changes[3].change_type, ChangeType::Breaking);
        assert!(result.changes[3].is_schema_change());
    }

    #[test]
    fn test_new_required_request_property_breaks_endpoint() {
        let mut create = Endpoint::new(HttpMethod::Post, "/users");
        create.request_body = Some(RequestBody::json(TypeRef::named("User"), true));
        let old = ast(vec![create.clone()], vec![user_schema()]);

        let extended = user_schema()
            .with_property("tenant", PropertySchema::new(TypeRef::primitive("string"), true));
        let new = ast(vec![create], vec![extended]);

        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        let breaking: Vec<String> = result
            .changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Breaking)
            .map(DiffChange::locator)
            .collect();
        assert_eq!(breaking, vec!["POST /users", "#/schemas/User"]);
        assert_eq!(result.summary.breaking_changes, 2);
    }

    #[test]
    fn test_exclude_schemas() {
        let old = ast(vec![], vec![user_schema()]);
        let new = ast(vec![], vec![]);
        let options = DiffOptions {
            include_schemas: false,
            ..DiffOptions::default()
        };
        assert!(diff(&old, &new, &options).unwrap().is_empty());
    }

    #[test]
    fn test_ignore_descriptions_option() {
        let old = ast(vec![users_endpoint()], vec![]);
        let mut edited = users_endpoint();
        edited.summary = Some("Enumerate users".into());
        let new = ast(vec![edited], vec![]);

        assert_eq!(diff(&old, &new, &DiffOptions::default()).unwrap().summary.modifications, 1);
        let options = DiffOptions {
            ignore_descriptions: true,
            ..DiffOptions::default()
        };
        assert!(diff(&old, &new, &options).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_input() {
        let good = ast(vec![users_endpoint()], vec![]);
        let bad = ast(vec![Endpoint::new(HttpMethod::Get, "  ")], vec![]);
        let err = diff(&good, &bad, &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, DiffError::EmptyPath { side: AstSide::New, .. }));

        let json = serde_json::json!({
            "endpoints": [],
            "schemas": {"User": {"name": "Account"}},
            "metadata": {"sourceType": "openapi"}
        });
        let mismatched: CanonicalAst = serde_json::from_value(json).unwrap();
        let err = diff(&mismatched, &good, &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, DiffError::SchemaNameMismatch { side: AstSide::Old, .. }));

        let json = serde_json::json!({
            "endpoints": [
                {"method": "GET", "path": "/a"},
                {"method": "GET", "path": "/a"}
            ],
            "schemas": {},
            "metadata": {"sourceType": "openapi"}
        });
        let duplicated: CanonicalAst = serde_json::from_value(json).unwrap();
        let err = diff(&good, &duplicated, &DiffOptions::default()).unwrap_err();
        assert_eq!(
            err,
            DiffError::DuplicateEndpoint {
                side: AstSide::New,
                locator: "GET /a".to_string()
            }
        );
    }

    #[test]
    fn test_change_serialization() {
        let old = ast(vec![], vec![]);
        let new = ast(vec![users_endpoint()], vec![]);
        let result = diff(&old, &new, &DiffOptions::default()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["changes"][0]["type"], "added");
        assert_eq!(value["changes"][0]["method"], "GET");
        assert_eq!(value["summary"]["totalChanges"], 1);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn arb_endpoint() -> impl Strategy<Value = Endpoint> {
        let method = prop::sample::select(vec![
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
        ]);
        (
            method,
            "/[a-c]{1,2}",
            prop::option::of("[a-z ]{0,6}"),
            any::<bool>(),
            prop::sample::select(vec!["200", "201", "404"]),
        )
            .prop_map(|(method, path, summary, required, status)| {
                let mut e = Endpoint::new(method, path);
                e.summary = summary;
                e.parameters.push(
                    Parameter::new("q", ParameterLocation::Query, TypeRef::primitive("string"))
                        .required(required),
                );
                e.responses.push(Response::new(status));
                e
            })
    }

    fn arb_ast() -> impl Strategy<Value = CanonicalAst> {
        (
            prop::collection::vec(arb_endpoint(), 0..6),
            prop::collection::btree_set("[A-C]", 0..3),
        )
            .prop_map(|(endpoints, schema_names)| {
                ast(endpoints, schema_names.into_iter().map(Schema::new).collect())
            })
    }

    proptest! {
        #[test]
        fn prop_diff_with_self_is_empty(a in arb_ast()) {
            let result = diff(&a, &a, &DiffOptions::default()).unwrap();
            prop_assert!(result.is_empty());
        }

        #[test]
        fn prop_additions_mirror_removals(a in arb_ast(), b in arb_ast()) {
            let forward = diff(&a, &b, &DiffOptions::default()).unwrap();
            let backward = diff(&b, &a, &DiffOptions::default()).unwrap();

            let mut added: Vec<String> = forward.changes_of(ChangeType::Added).map(DiffChange::locator).collect();
            let mut removed: Vec<String> = backward.changes_of(ChangeType::Removed).map(DiffChange::locator).collect();
            added.sort();
            removed.sort();
            prop_assert_eq!(added, removed);
            prop_assert_eq!(forward.summary.additions, backward.summary.removals);
        }

        #[test]
        fn prop_summary_matches_changes(a in arb_ast(), b in arb_ast()) {
            let result = diff(&a, &b, &DiffOptions::default()).unwrap();
            let s = result.summary;
            prop_assert_eq!(s.total_changes, result.changes.len());
            prop_assert_eq!(
                s.total_changes,
                s.additions + s.removals + s.modifications + s.breaking_changes
            );
        }
    }
}
