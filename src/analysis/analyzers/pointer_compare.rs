//! Pointer-Compare analyzer (§4.4.3).
//!
//! Fires when a parameter (bare or `&parameter`) appears as an operand of a
//! binary `==` or `!=` expression. Other operators do not fire.

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
    let mut visitor = PointerCompareVisitor {
        function: func.id,
        source,
        locals: &locals,
        facts,
    };
    inspect(body, &mut visitor);
}

struct PointerCompareVisitor<'a> {
    function: FunctionId,
    source: &'a str,
    locals: &'a HashMap<String, i32>,
    facts: &'a mut FactBase,
}

impl<'tree, 'a> Visitor<'tree> for PointerCompareVisitor<'a> {
    fn kinds(&self) -> &[&'static str] {
        &["binary_expression"]
    }

    fn on_node(&mut self, node: Node<'tree>, entering: bool, _ancestors: &[Node<'tree>]) -> bool {
        if !entering {
            return true;
        }
        let Some(op) = node.child_by_field_name("operator") else {
            return true;
        };
        if !matches!(op.utf8_text(self.source.as_bytes()), Ok("==") | Ok("!=")) {
            return true;
        }
        for field in ["left", "right"] {
            if let Some(operand) = node.child_by_field_name(field) {
                if let Some(index) = bound_param_index(operand, self.source, self.locals) {
                    self.facts.export_fact(
                        ParameterId {
                            function: self.function,
                            index,
                        },
                        BaseFact::ComparesPtr,
                    );
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::callgraph::CallGraph;
    use crate::analysis::facts::COMPARES_PTR;
    use crate::analysis::resolve::PackageResolver;
    use crate::parser::parse_source;

    #[test]
    fn fires_on_equality_with_address_of() {
        let src = "package p\n\nfunc f(z int) bool {\n\tvar x *int\n\treturn x == &z\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &mut facts);
        assert_eq!(
            facts.base_facts(ParameterId { function: func.id, index: 0 }),
            COMPARES_PTR
        );
    }

    #[test]
    fn does_not_fire_for_other_operators() {
        let src = "package p\n\nfunc f(z int) bool {\n\treturn z < 1\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &mut facts);
        assert_eq!(facts.base_facts(ParameterId { function: func.id, index: 0 }), 0);
    }
}
