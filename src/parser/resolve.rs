//! Reference resolution pass
//!
//! Run by the registry on every draft AST. Parsers never resolve references
//! themselves, so the check is uniform across source types.

use crate::ast::CanonicalAst;

/// Named references that do not resolve to a key in `schemas`.
/// Sorted and deduplicated.
pub fn find_broken_references(ast: &CanonicalAst) -> Vec<String> {
    ast.referenced_names()
        .into_iter()
        .filter(|name| !ast.schemas().contains_key(*name))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        AstBuilder, Endpoint, HttpMethod, PropertySchema, RequestBody, Response, Schema, TypeRef,
    };

    #[test]
    fn test_all_references_resolve() {
        let mut builder = AstBuilder::new("test");
        let mut endpoint = Endpoint::new(HttpMethod::Get, "/users");
        endpoint
            .responses
            .push(Response::new("200").with_schema(Some(TypeRef::array(TypeRef::named("User")))));
        builder.endpoint(endpoint);
        builder.schema(Schema::new("User"));

        assert!(find_broken_references(&builder.build()).is_empty());
    }

    #[test]
    fn test_broken_references_are_sorted_and_unique() {
        let mut builder = AstBuilder::new("test");
        let mut endpoint = Endpoint::new(HttpMethod::Post, "/orders");
        endpoint.request_body = Some(RequestBody::json(TypeRef::named("NewOrder"), true));
        endpoint
            .responses
            .push(Response::new("201").with_schema(Some(TypeRef::named("Order"))));
        builder.endpoint(endpoint);
        builder.schema(Schema::new("Order").with_property(
            "buyer",
            PropertySchema::new(TypeRef::named("Customer"), true),
        ));
        builder.schema(Schema::new("Invoice").with_property(
            "buyer",
            PropertySchema::new(TypeRef::named("Customer"), true),
        ));

        assert_eq!(
            find_broken_references(&builder.build()),
            vec!["Customer".to_string(), "NewOrder".to_string()]
        );
    }
}
