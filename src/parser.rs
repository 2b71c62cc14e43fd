//! Parse Go source with tree-sitter (§0/§6 "Inputs": "a function
//! handle enumerator and a call-site enumerator obtained from a
//! Go-syntax-aware front-end").

use crate::error::{Error, Result};
use tree_sitter::{Parser, Tree};

fn go_language() -> tree_sitter::Language {
    tree_sitter_go::language()
}

/// Parse a single Go source file. A `tree-sitter` grammar never truly
/// "fails" to parse (syntax errors become `ERROR` nodes rather than a
/// `Result::Err`), so this only fails when the grammar itself cannot be
/// loaded; per-file `ERROR` nodes are the analyzer's concern (§7
/// "ParseError... the file is skipped, the package continues").
pub fn parse_source(file: &str, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(go_language())
        .map_err(|e| Error::parse(file, format!("failed to load Go grammar: {e}")))?;

    parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(file, "tree-sitter produced no tree"))
}

/// True when `node` or any descendant is an `ERROR` node, signalling a
/// syntax error the type-checker tier would otherwise catch (§7).
pub fn contains_error_node(node: tree_sitter::Node) -> bool {
    if node.is_error() {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if contains_error_node(child) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_function() {
        let src = "package p\n\nfunc f() {}\n";
        let tree = parse_source("p.go", src).expect("parse should succeed");
        assert!(!contains_error_node(tree.root_node()));
    }

    #[test]
    fn empty_file_parses_without_crash() {
        let tree = parse_source("empty.go", "").expect("parse should succeed");
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn flags_error_nodes_on_broken_syntax() {
        let src = "package p\n\nfunc f( {\n";
        let tree = parse_source("broken.go", src).expect("parse should succeed");
        assert!(contains_error_node(tree.root_node()));
    }
}
