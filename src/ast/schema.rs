use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a type: a named schema, a primitive, or an array of either.
///
/// Only `Named` references participate in reference resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    Named { name: String },
    Primitive { name: String },
    Array { items: Box<TypeRef> },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive { name: name.into() }
    }

    pub fn array(items: TypeRef) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// Any-typed placeholder for values whose type the source does not state
    pub fn any() -> Self {
        Self::primitive("any")
    }

    /// Name of the schema this reference points at, looking through arrays
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            Self::Named { name } => Some(name),
            Self::Primitive { .. } => None,
            Self::Array { items } => items.referenced_name(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name } | Self::Primitive { name } => write!(f, "{}", name),
            Self::Array { items } => write!(f, "{}[]", items),
        }
    }
}

/// A single property of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl PropertySchema {
    pub fn new(type_ref: TypeRef, required: bool) -> Self {
        Self {
            type_ref,
            description: None,
            required,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }
}

/// Named data shape shared by endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    /// Allowed values for enum-like schemas, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            properties: BTreeMap::new(),
            enum_values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Named references made by this schema's properties
    pub fn referenced_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .values()
            .filter_map(|p| p.type_ref.referenced_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::named("User").to_string(), "User");
        assert_eq!(TypeRef::array(TypeRef::named("User")).to_string(), "User[]");
        assert_eq!(
            TypeRef::array(TypeRef::array(TypeRef::primitive("integer"))).to_string(),
            "integer[][]"
        );
    }

    #[test]
    fn test_referenced_name_looks_through_arrays() {
        assert_eq!(
            TypeRef::array(TypeRef::named("Order")).referenced_name(),
            Some("Order")
        );
        assert_eq!(TypeRef::primitive("string").referenced_name(), None);
    }

    #[test]
    fn test_schema_referenced_names() {
        let schema = Schema::new("Order")
            .with_property("id", PropertySchema::new(TypeRef::primitive("string"), true))
            .with_property("buyer", PropertySchema::new(TypeRef::named("User"), false))
            .with_property(
                "items",
                PropertySchema::new(TypeRef::array(TypeRef::named("LineItem")), true),
            );

        let mut names: Vec<&str> = schema.referenced_names().collect();
        names.sort();
        assert_eq!(names, vec!["LineItem", "User"]);
    }

    #[test]
    fn test_type_ref_serde_shape() {
        let json = serde_json::to_value(TypeRef::named("User")).unwrap();
        assert_eq!(json["kind"], "named");
        assert_eq!(json["name"], "User");
    }
}
