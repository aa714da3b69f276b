//! Tree-sitter helpers shared by the source-code parsers

use tree_sitter::{Query, QueryCursor, StreamingIterator};

use crate::types::{DocGenError, Result};

/// Create a tree-sitter parser for the given language.
pub fn create_ts_parser<L: Into<tree_sitter::Language>>(
    language: L,
    lang_name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.into())
        .map_err(|e| DocGenError::parse(lang_name, format!("Failed to set language: {}", e)))?;
    Ok(parser)
}

/// Extract text content from a tree-sitter node.
/// Returns empty string if extraction fails (with debug logging).
#[inline]
pub fn get_node_text<'a>(node: tree_sitter::Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        tracing::debug!(
            "UTF-8 extraction failed at {}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            e
        );
        ""
    })
}

/// 1-based start line of a node
#[inline]
pub fn node_line(node: tree_sitter::Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Named children of a node, in source order
pub fn named_children(node: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Captures of a single query match, addressable by capture name
#[derive(Debug)]
pub struct CaptureSet<'tree> {
    captures: Vec<(String, tree_sitter::Node<'tree>)>,
}

impl<'tree> CaptureSet<'tree> {
    pub fn get(&self, name: &str) -> Option<tree_sitter::Node<'tree>> {
        self.captures
            .iter()
            .find(|(capture, _)| capture == name)
            .map(|(_, node)| *node)
    }
}

/// Execute a query and collect the captures of every match, in match order.
/// An invalid query yields no matches (logged at warn level).
pub fn query_matches<'tree>(
    language: &tree_sitter::Language,
    query_str: &str,
    root: tree_sitter::Node<'tree>,
    content: &[u8],
) -> Vec<CaptureSet<'tree>> {
    let query = match Query::new(language, query_str) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!("Invalid tree-sitter query: {}", e);
            return Vec::new();
        }
    };
    let names = query.capture_names();

    let mut results = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, content);
    while let Some(m) = matches.next() {
        let captures = m
            .captures
            .iter()
            .map(|cap| (names[cap.index as usize].to_string(), cap.node))
            .collect();
        results.push(CaptureSet { captures });
    }
    results
}

/// Line of the first syntax error in the tree, if any
pub fn first_error_line(root: tree_sitter::Node) -> Option<u32> {
    if !root.has_error() {
        return None;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node_line(node));
        }
        if node.has_error() {
            let mut children = named_children(node);
            children.reverse();
            stack.extend(children);
        }
    }
    Some(node_line(root))
}
