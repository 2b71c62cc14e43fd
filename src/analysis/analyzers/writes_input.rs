//! Writes-Input analyzer (§4.4.1).
//!
//! Fires when a function parameter appears as an element of an
//! assignment's right-hand side list, or as an element inside a composite
//! literal. Both bare identifiers `p` and `&p` count.

use crate::analysis::analyzers::{bound_param_index, local_param_indices};
use crate::analysis::ast::{inspect, Visitor};
use crate::analysis::callgraph::{FunctionId, FunctionInfo, ParameterId};
use crate::analysis::facts::{BaseFact, FactBase};
use std::collections::HashMap;
use tree_sitter::Node;

pub fn analyze(func: &FunctionInfo<'_>, source: &str, facts: &mut FactBase) {
    let Some(body) = func.body else {
        return;
    };
    let locals = local_param_indices(func, source);
    if locals.is_empty() {
        return;
    }
    let mut visitor = WritesInputVisitor {
        function: func.id,
        source,
        locals: &locals,
        facts,
    };
    inspect(body, &mut visitor);
}

struct WritesInputVisitor<'a> {
    function: FunctionId,
    source: &'a str,
    locals: &'a HashMap<String, i32>,
    facts: &'a mut FactBase,
}

impl<'tree, 'a> Visitor<'tree> for WritesInputVisitor<'a> {
    fn kinds(&self) -> &[&'static str] {
        &["assignment_statement", "composite_literal"]
    }

    fn on_node(&mut self, node: Node<'tree>, entering: bool, _ancestors: &[Node<'tree>]) -> bool {
        if !entering {
            return true;
        }
        match node.kind() {
            "assignment_statement" => {
                if let Some(right) = node.child_by_field_name("right") {
                    for expr in expression_list(right) {
                        self.emit_if_bound(expr);
                    }
                }
            }
            "composite_literal" => {
                if let Some(body) = node.child_by_field_name("body") {
                    for value in composite_values(body) {
                        self.emit_if_bound(value);
                    }
                }
            }
            _ => {}
        }
        true
    }
}

impl<'a> WritesInputVisitor<'a> {
    fn emit_if_bound(&mut self, expr: Node<'_>) {
        if let Some(index) = bound_param_index(expr, self.source, self.locals) {
            self.facts.export_fact(
                ParameterId {
                    function: self.function,
                    index,
                },
                BaseFact::WritesInput,
            );
        }
    }
}

/// Right-hand side of an assignment is a comma-separated `expression_list`
/// in tree-sitter-go; a single-expression RHS appears as the bare
/// expression node itself.
fn expression_list(right: Node<'_>) -> Vec<Node<'_>> {
    if right.kind() == "expression_list" {
        let mut cursor = right.walk();
        right.named_children(&mut cursor).collect()
    } else {
        vec![right]
    }
}

/// Named children of a `literal_value`, unwrapping `keyed_element` to its
/// value side.
fn composite_values(literal_value: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = literal_value.walk();
    literal_value
        .named_children(&mut cursor)
        .map(|child| {
            if child.kind() == "keyed_element" {
                child.child_by_field_name("value").unwrap_or(child)
            } else {
                child
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::callgraph::CallGraph;
    use crate::analysis::facts::WRITES_INPUT;
    use crate::analysis::resolve::PackageResolver;
    use crate::parser::parse_source;

    #[test]
    fn fires_on_composite_literal_element() {
        let src = "package p\n\nfunc f(x *int) {\n\t_ = S{x}\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &mut facts);
        assert_eq!(
            facts.base_facts(ParameterId { function: func.id, index: 0 }),
            WRITES_INPUT
        );
    }

    #[test]
    fn fires_on_assignment_rhs_with_address_of() {
        let src = "package p\n\nfunc f(x int) {\n\tvar y *int\n\ty = &x\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &mut facts);
        assert_eq!(
            facts.base_facts(ParameterId { function: func.id, index: 0 }),
            WRITES_INPUT
        );
    }

    #[test]
    fn does_not_fire_when_parameter_unused() {
        let src = "package p\n\nfunc f(x *int) {\n\tvar y int\n\t_ = y\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &mut facts);
        assert_eq!(facts.base_facts(ParameterId { function: func.id, index: 0 }), 0);
    }
}
