//! AST-Inspect Driver (§4.1).
//!
//! A pure traversal library: it owns no AST and no fact base. For each
//! visited node it supplies the full ancestor chain, from the root to that
//! node, as a borrowed slice; visitors may filter by node kind, and a
//! visitor may be invoked twice per node (entry and exit) so the ancestor
//! stack stays exact across the whole walk.
//!
//! Dispatch-by-`node.kind()`, generalized with an ancestor stack and
//! entry/exit calls so callers never need their own recursive descent.

use tree_sitter::Node;

/// Callback invoked once per matching node per entry/exit.
///
/// Returns whether the driver should descend into this node's children.
/// The return value is only consulted on entry; the exit call's return
/// value is ignored.
pub trait Visitor<'tree> {
    /// Node kinds this visitor wants to hear about. An empty slice means
    /// "every node kind".
    fn kinds(&self) -> &[&'static str];

    fn on_node(&mut self, node: Node<'tree>, entering: bool, ancestors: &[Node<'tree>]) -> bool;
}

/// Depth-first, deterministic pre-order traversal of `root`, calling
/// `visitor` on entry and exit of each node whose kind matches
/// [`Visitor::kinds`].
pub fn inspect<'tree>(root: Node<'tree>, visitor: &mut dyn Visitor<'tree>) {
    let mut ancestors: Vec<Node<'tree>> = Vec::new();
    walk(root, visitor, &mut ancestors);
}

fn walk<'tree>(node: Node<'tree>, visitor: &mut dyn Visitor<'tree>, ancestors: &mut Vec<Node<'tree>>) {
    let matches = node_matches(visitor.kinds(), node);

    let descend = if matches {
        visitor.on_node(node, true, ancestors)
    } else {
        true
    };

    if descend {
        ancestors.push(node);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, visitor, ancestors);
        }
        ancestors.pop();
    }

    if matches {
        visitor.on_node(node, false, ancestors);
    }
}

fn node_matches(kinds: &[&'static str], node: Node<'_>) -> bool {
    kinds.is_empty() || kinds.contains(&node.kind())
}

/// Find the innermost node among `ancestors` (searched from the end, i.e.
/// nearest enclosing first) whose kind is in `kinds`. Used by the range-loop
/// checker to find the "innermost enclosing node" (§3, §4.6 step 2).
pub fn innermost_ancestor_of_kind<'tree>(
    ancestors: &[Node<'tree>],
    kinds: &[&str],
) -> Option<Node<'tree>> {
    ancestors
        .iter()
        .rev()
        .find(|n| kinds.contains(&n.kind()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    struct RecordingVisitor<'tree> {
        kinds: Vec<&'static str>,
        entries: Vec<(String, usize)>,
        _marker: std::marker::PhantomData<&'tree ()>,
    }

    impl<'tree> Visitor<'tree> for RecordingVisitor<'tree> {
        fn kinds(&self) -> &[&'static str] {
            &self.kinds
        }

        fn on_node(&mut self, node: Node<'tree>, entering: bool, ancestors: &[Node<'tree>]) -> bool {
            if entering {
                self.entries.push((node.kind().to_string(), ancestors.len()));
            }
            true
        }
    }

    #[test]
    fn visits_matching_kinds_with_correct_ancestor_depth() {
        let src = "package p\n\nfunc f() {\n\tfunc() {}()\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let mut visitor = RecordingVisitor {
            kinds: vec!["function_declaration", "func_literal"],
            entries: Vec::new(),
            _marker: std::marker::PhantomData,
        };
        inspect(tree.root_node(), &mut visitor);

        assert_eq!(visitor.entries[0].0, "function_declaration");
        assert_eq!(visitor.entries[0].1, 1); // under source_file
        assert_eq!(visitor.entries[1].0, "func_literal");
        assert!(visitor.entries[1].1 > visitor.entries[0].1);
    }

    #[test]
    fn skipping_descend_prunes_subtree() {
        struct StopAtFunc {
            seen_literal: bool,
        }
        impl<'tree> Visitor<'tree> for StopAtFunc {
            fn kinds(&self) -> &[&'static str] {
                &[]
            }
            fn on_node(&mut self, node: Node<'tree>, entering: bool, _: &[Node<'tree>]) -> bool {
                if entering && node.kind() == "func_literal" {
                    self.seen_literal = true;
                    return false;
                }
                true
            }
        }

        let src = "package p\n\nfunc f() {\n\tfunc() { var x int; _ = x }()\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let mut visitor = StopAtFunc {
            seen_literal: false,
        };
        inspect(tree.root_node(), &mut visitor);
        assert!(visitor.seen_literal);
    }
}
