//! Field-by-field comparison of matched endpoints and schemas.
//!
//! Every difference is classified as breaking or not. A difference is
//! breaking when a client written against the old contract can fail
//! against the new one.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::DiffOptions;
use crate::ast::{Endpoint, Parameter, RequestBody, Response, Schema};

/// One classified difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difference {
    /// Field that changed, e.g. `parameter`, `response`, `property`
    pub field: &'static str,
    pub message: String,
    pub breaking: bool,
}

impl Difference {
    fn breaking(field: &'static str, message: String) -> Self {
        Self {
            field,
            message,
            breaking: true,
        }
    }

    fn compatible(field: &'static str, message: String) -> Self {
        Self {
            field,
            message,
            breaking: false,
        }
    }
}

// =============================================================================
// Endpoints
// =============================================================================

pub fn compare_endpoints(old: &Endpoint, new: &Endpoint, options: &DiffOptions) -> Vec<Difference> {
    let mut diffs = Vec::new();

    if !options.ignore_descriptions {
        if old.summary != new.summary {
            diffs.push(Difference::compatible("summary", "summary changed".to_string()));
        }
        if old.description != new.description {
            diffs.push(Difference::compatible(
                "description",
                "description changed".to_string(),
            ));
        }
    }

    if old.operation_id != new.operation_id {
        diffs.push(Difference::compatible(
            "operationId",
            format!(
                "operation id changed from {} to {}",
                display_opt(&old.operation_id),
                display_opt(&new.operation_id)
            ),
        ));
    }

    compare_parameters(&old.parameters, &new.parameters, options, &mut diffs);
    compare_request_body(old.request_body.as_ref(), new.request_body.as_ref(), options, &mut diffs);
    compare_responses(&old.responses, &new.responses, options, &mut diffs);

    if old.tags != new.tags {
        diffs.push(Difference::compatible(
            "tags",
            format!("tags changed from [{}] to [{}]", old.tags.join(", "), new.tags.join(", ")),
        ));
    }

    if old.deprecated != new.deprecated {
        let message = if new.deprecated {
            "endpoint marked deprecated"
        } else {
            "endpoint no longer deprecated"
        };
        diffs.push(Difference::compatible("deprecated", message.to_string()));
    }

    diffs
}

fn compare_parameters(
    old: &[Parameter],
    new: &[Parameter],
    options: &DiffOptions,
    diffs: &mut Vec<Difference>,
) {
    let mut matched: HashSet<usize> = HashSet::new();

    for param in old {
        let exact = new
            .iter()
            .position(|p| p.name == param.name && p.location == param.location);
        let moved = || {
            new.iter().enumerate().position(|(i, p)| {
                p.name == param.name && p.location != param.location && !matched.contains(&i)
            })
        };

        match exact.or_else(moved) {
            Some(index) => {
                matched.insert(index);
                compare_parameter(param, &new[index], options, diffs);
            }
            None => diffs.push(Difference::breaking(
                "parameter",
                format!("parameter '{}' ({}) removed", param.name, param.location),
            )),
        }
    }

    for (index, param) in new.iter().enumerate() {
        if matched.contains(&index) {
            continue;
        }
        if param.required {
            diffs.push(Difference::breaking(
                "parameter",
                format!("new required parameter '{}' ({}) added", param.name, param.location),
            ));
        } else {
            diffs.push(Difference::compatible(
                "parameter",
                format!("optional parameter '{}' ({}) added", param.name, param.location),
            ));
        }
    }
}

fn compare_parameter(old: &Parameter, new: &Parameter, options: &DiffOptions, diffs: &mut Vec<Difference>) {
    if old.location != new.location {
        diffs.push(Difference::breaking(
            "parameter",
            format!(
                "parameter '{}' moved from {} to {}",
                old.name, old.location, new.location
            ),
        ));
    }

    match (old.required, new.required) {
        (false, true) => diffs.push(Difference::breaking(
            "parameter",
            format!("parameter '{}' ({}) is now required", new.name, new.location),
        )),
        (true, false) => diffs.push(Difference::compatible(
            "parameter",
            format!("parameter '{}' ({}) is now optional", new.name, new.location),
        )),
        _ => {}
    }

    if old.schema != new.schema {
        diffs.push(Difference::breaking(
            "parameter",
            format!(
                "parameter '{}' ({}) type changed from {} to {}",
                new.name, new.location, old.schema, new.schema
            ),
        ));
    }

    if !options.ignore_descriptions && old.description != new.description {
        diffs.push(Difference::compatible(
            "parameter",
            format!("parameter '{}' ({}) description changed", new.name, new.location),
        ));
    }
}

fn compare_request_body(
    old: Option<&RequestBody>,
    new: Option<&RequestBody>,
    options: &DiffOptions,
    diffs: &mut Vec<Difference>,
) {
    match (old, new) {
        (None, None) => {}
        (None, Some(body)) if body.required => diffs.push(Difference::breaking(
            "requestBody",
            format!("required request body ({}) added", body.schema),
        )),
        (None, Some(body)) => diffs.push(Difference::compatible(
            "requestBody",
            format!("optional request body ({}) added", body.schema),
        )),
        (Some(_), None) => diffs.push(Difference::compatible(
            "requestBody",
            "request body removed".to_string(),
        )),
        (Some(old), Some(new)) => {
            if !old.required && new.required {
                diffs.push(Difference::breaking(
                    "requestBody",
                    "request body is now required".to_string(),
                ));
            } else if old.required && !new.required {
                diffs.push(Difference::compatible(
                    "requestBody",
                    "request body is now optional".to_string(),
                ));
            }
            if old.schema != new.schema {
                diffs.push(Difference::breaking(
                    "requestBody",
                    format!("request body type changed from {} to {}", old.schema, new.schema),
                ));
            }
            if old.content_type != new.content_type {
                diffs.push(Difference::breaking(
                    "requestBody",
                    format!(
                        "request body content type changed from {} to {}",
                        old.content_type, new.content_type
                    ),
                ));
            }
            if !options.ignore_descriptions && old.description != new.description {
                diffs.push(Difference::compatible(
                    "requestBody",
                    "request body description changed".to_string(),
                ));
            }
        }
    }
}

fn compare_responses(old: &[Response], new: &[Response], options: &DiffOptions, diffs: &mut Vec<Difference>) {
    for response in old {
        let Some(counterpart) = new.iter().find(|r| r.status == response.status) else {
            diffs.push(Difference::breaking(
                "response",
                format!("response {} removed", response.status),
            ));
            continue;
        };

        match (&response.schema, &counterpart.schema) {
            (Some(a), Some(b)) if a != b => diffs.push(Difference::breaking(
                "response",
                format!("response {} type changed from {} to {}", response.status, a, b),
            )),
            (Some(a), None) => diffs.push(Difference::breaking(
                "response",
                format!("response {} no longer returns {}", response.status, a),
            )),
            (None, Some(b)) => diffs.push(Difference::compatible(
                "response",
                format!("response {} now returns {}", response.status, b),
            )),
            _ => {}
        }

        if response.example != counterpart.example {
            diffs.push(Difference::compatible(
                "response",
                format!("response {} example changed", response.status),
            ));
        }

        if !options.ignore_descriptions && response.description != counterpart.description {
            diffs.push(Difference::compatible(
                "response",
                format!("response {} description changed", response.status),
            ));
        }
    }

    for response in new {
        if !old.iter().any(|r| r.status == response.status) {
            diffs.push(Difference::compatible(
                "response",
                format!("response {} added", response.status),
            ));
        }
    }
}

// =============================================================================
// Schemas
// =============================================================================

pub fn compare_schemas(old: &Schema, new: &Schema, options: &DiffOptions) -> Vec<Difference> {
    let mut diffs = Vec::new();

    if !options.ignore_descriptions && old.description != new.description {
        diffs.push(Difference::compatible(
            "description",
            "description changed".to_string(),
        ));
    }

    for (name, property) in &old.properties {
        let Some(counterpart) = new.properties.get(name) else {
            diffs.push(Difference::breaking(
                "property",
                format!("property '{}' removed", name),
            ));
            continue;
        };

        if property.type_ref != counterpart.type_ref {
            diffs.push(Difference::breaking(
                "property",
                format!(
                    "property '{}' type changed from {} to {}",
                    name, property.type_ref, counterpart.type_ref
                ),
            ));
        }

        match (property.required, counterpart.required) {
            (false, true) => diffs.push(Difference::breaking(
                "property",
                format!("property '{}' is now required", name),
            )),
            (true, false) => diffs.push(Difference::compatible(
                "property",
                format!("property '{}' is now optional", name),
            )),
            _ => {}
        }

        if !options.ignore_descriptions && property.description != counterpart.description {
            diffs.push(Difference::compatible(
                "property",
                format!("property '{}' description changed", name),
            ));
        }
    }

    // Like a new required parameter, a new required property narrows the schema
    for (name, property) in &new.properties {
        if old.properties.contains_key(name) {
            continue;
        }
        if property.required {
            diffs.push(Difference::breaking(
                "property",
                format!("new required property '{}' added", name),
            ));
        } else {
            diffs.push(Difference::compatible(
                "property",
                format!("optional property '{}' added", name),
            ));
        }
    }

    for value in &old.enum_values {
        if !new.enum_values.contains(value) {
            diffs.push(Difference::breaking(
                "enum",
                format!("enum value '{}' removed", value),
            ));
        }
    }
    for value in &new.enum_values {
        if !old.enum_values.contains(value) {
            diffs.push(Difference::compatible(
                "enum",
                format!("enum value '{}' added", value),
            ));
        }
    }

    diffs
}

/// Schemas that exist on both sides and lost something a client relies on
pub fn narrowed_schemas(
    old: &BTreeMap<String, Schema>,
    new: &BTreeMap<String, Schema>,
) -> BTreeSet<String> {
    // Descriptions never make a schema narrower
    let options = DiffOptions {
        ignore_descriptions: true,
        include_schemas: true,
    };
    old.iter()
        .filter_map(|(name, schema)| {
            let counterpart = new.get(name)?;
            compare_schemas(schema, counterpart, &options)
                .iter()
                .any(|d| d.breaking)
                .then(|| name.clone())
        })
        .collect()
}

/// Named schemas an endpoint reaches, following property references
pub fn reachable_schemas<'a>(endpoint: &'a Endpoint, schemas: &'a BTreeMap<String, Schema>) -> BTreeSet<&'a str> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&str> = endpoint.referenced_names();
    while let Some(name) = stack.pop() {
        if !seen.insert(name) {
            continue;
        }
        if let Some(schema) = schemas.get(name) {
            stack.extend(schema.referenced_names());
        }
    }
    seen
}

fn display_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(none)")
}
