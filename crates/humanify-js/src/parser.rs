//! tree-sitter parser wiring for JavaScript.

use humanify_core::ParseError;
use tree_sitter::{Node, Parser, Tree};

/// Parse JavaScript source into a tree-sitter tree.
///
/// tree-sitter recovers from syntax errors with error nodes; the renaming
/// engine must not rewrite code it cannot fully resolve, so any error node
/// fails the parse.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| ParseError::new(format!("failed to load JavaScript grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::new("parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let offset = first_error_offset(root).unwrap_or(0);
        return Err(ParseError::new(format!(
            "syntax error near byte {offset}"
        )));
    }
    Ok(tree)
}

fn first_error_offset(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_byte());
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(offset) = first_error_offset(child) {
            return Some(offset);
        }
    }
    Some(node.start_byte())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_parses() {
        assert!(parse("const a = 1;").is_ok());
        assert!(parse("function f(x) { return x * 2; }").is_ok());
        assert!(parse("").is_ok());
    }

    #[test]
    fn syntax_errors_are_rejected() {
        let err = parse("const = ;").unwrap_err();
        assert!(err.message.contains("syntax error"));
        assert!(parse("function {").is_err());
    }
}
