//! Cache key derivation
//!
//! Keys are pure functions of their inputs:
//!
//! - parse results: `<parserType>:<sha256(bytes)>:<sha256(canonical config)>`
//! - enhancements: `enhance:<sha256(canonical endpoint)>:<sha256(canonical context)>`
//!
//! Configuration objects are canonicalized (object keys sorted recursively)
//! before hashing, so two configs that differ only in key order share a key.
//! An absent configuration canonicalizes as `null`.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::ast::Endpoint;
use crate::types::Result;

const ENHANCE_PREFIX: &str = "enhance";

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a parse result
    pub fn derive(parser_type: &str, source: &[u8], config: Option<&Value>) -> Self {
        Self(format!(
            "{}:{}:{}",
            parser_type,
            sha256_hex(source),
            config_digest(config)
        ))
    }

    /// Key for an AI enhancement of one endpoint
    pub fn enhancement(endpoint: &Endpoint, context: Option<&Value>) -> Result<Self> {
        let endpoint = serde_json::to_value(endpoint)?;
        let body = serde_json::to_string(&canonicalize(&endpoint))?;
        Ok(Self(format!(
            "{}:{}:{}",
            ENHANCE_PREFIX,
            sha256_hex(body.as_bytes()),
            config_digest(context)
        )))
    }

    /// Wrap an already-derived key string
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading namespace segment (parser type or `enhance`)
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Recursively sort object keys. Arrays keep their order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn config_digest(config: Option<&Value>) -> String {
    let canonical = config.map(canonicalize).unwrap_or(Value::Null);
    // Value's Display is infallible compact JSON
    sha256_hex(canonical.to_string().as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::HttpMethod;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_key_shape() {
        let key = CacheKey::derive("openapi", b"openapi: 3.0.0", None);
        let parts: Vec<&str> = key.as_str().split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "openapi");
        assert_eq!(parts[1].len(), 64);
        assert_eq!(parts[2].len(), 64);
        assert_eq!(key.namespace(), "openapi");
    }

    #[test]
    fn test_absent_config_equals_null() {
        let absent = CacheKey::derive("go", b"package main", None);
        let null = CacheKey::derive("go", b"package main", Some(&Value::Null));
        assert_eq!(absent, null);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"projectName": "pets", "nested": {"b": 1, "a": [2, {"y": 1, "x": 0}]}});
        let b = json!({"nested": {"a": [2, {"x": 0, "y": 1}], "b": 1}, "projectName": "pets"});
        assert_eq!(
            CacheKey::derive("python", b"x", Some(&a)),
            CacheKey::derive("python", b"x", Some(&b))
        );
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!({"tags": ["a", "b"]});
        let b = json!({"tags": ["b", "a"]});
        assert_ne!(
            CacheKey::derive("python", b"x", Some(&a)),
            CacheKey::derive("python", b"x", Some(&b))
        );
    }

    #[test]
    fn test_parser_type_separates_keys() {
        assert_ne!(
            CacheKey::derive("openapi", b"same", None),
            CacheKey::derive("swagger", b"same", None)
        );
    }

    #[test]
    fn test_enhancement_key() {
        let mut endpoint = Endpoint::new(HttpMethod::Get, "/users");
        let key = CacheKey::enhancement(&endpoint, None).unwrap();
        assert_eq!(key.namespace(), "enhance");
        assert_eq!(key, CacheKey::enhancement(&endpoint, None).unwrap());

        endpoint.summary = Some("List users".to_string());
        assert_ne!(key, CacheKey::enhancement(&endpoint, None).unwrap());

        let with_context =
            CacheKey::enhancement(&endpoint, Some(&json!({"audience": "public"}))).unwrap();
        assert_ne!(with_context, CacheKey::enhancement(&endpoint, None).unwrap());
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn reversed_keys(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map.iter().rev() {
                    out.insert(k.clone(), reversed_keys(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(reversed_keys).collect()),
            other => other.clone(),
        }
    }

    proptest! {
        #[test]
        fn prop_derive_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 0..256), config in arb_json()) {
            let a = CacheKey::derive("openapi", &bytes, Some(&config));
            let b = CacheKey::derive("openapi", &bytes, Some(&config));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_key_ignores_object_key_order(config in arb_json()) {
            let shuffled = reversed_keys(&config);
            prop_assert_eq!(
                CacheKey::derive("jsdoc", b"src", Some(&config)),
                CacheKey::derive("jsdoc", b"src", Some(&shuffled))
            );
        }

        #[test]
        fn prop_different_bytes_give_different_keys(
            a in prop::collection::vec(any::<u8>(), 0..64),
            b in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(
                CacheKey::derive("go", &a, None),
                CacheKey::derive("go", &b, None)
            );
        }

        #[test]
        fn prop_canonicalize_is_idempotent(config in arb_json()) {
            let once = canonicalize(&config);
            prop_assert_eq!(canonicalize(&once), once);
        }
    }
}
