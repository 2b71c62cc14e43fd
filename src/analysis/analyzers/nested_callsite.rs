//! Nested-Callsite analyzer (§4.4.4).
//!
//! Fires when a parameter flows into a chain `f1(f2(...fn(x)...))` where
//! each `fi` takes exactly one argument, the chain length is >= 2, and the
//! two innermost calls are both "dangerous" by this definition.

use crate::analysis::analyzers::{bound_param_index, local_param_indices};
use crate::analysis::ast::{inspect, Visitor};
use crate::analysis::callgraph::{CallGraph, CallSite, FunctionId, FunctionInfo, ParameterId};
use crate::analysis::facts::{BaseFact, FactBase};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

pub fn analyze(func: &FunctionInfo<'_>, source: &str, graph: &CallGraph<'_>, facts: &mut FactBase) {
    let Some(body) = func.body else {
        return;
    };
    let locals = local_param_indices(func, source);
    if locals.is_empty() {
        return;
    }
    let mut visitor = NestedCallsiteVisitor {
        function: func.id,
        source,
        locals: &locals,
        graph,
        facts,
        visited: HashSet::new(),
    };
    inspect(body, &mut visitor);
}

struct NestedCallsiteVisitor<'tree, 'a> {
    function: FunctionId,
    source: &'a str,
    locals: &'a HashMap<String, i32>,
    graph: &'a CallGraph<'tree>,
    facts: &'a mut FactBase,
    visited: HashSet<usize>,
}

impl<'tree, 'a> Visitor<'tree> for NestedCallsiteVisitor<'tree, 'a> {
    fn kinds(&self) -> &[&'static str] {
        &["call_expression"]
    }

    fn on_node(&mut self, node: Node<'tree>, entering: bool, _ancestors: &[Node<'tree>]) -> bool {
        if !entering || self.visited.contains(&node.start_byte()) {
            return true;
        }
        let Some((chain, terminal)) = extract_chain(node) else {
            return true;
        };
        if chain.len() < 2 {
            return true;
        }
        for c in &chain {
            self.visited.insert(c.start_byte());
        }
        let Some(index) = bound_param_index(terminal, self.source, self.locals) else {
            return true;
        };
        let innermost = chain[chain.len() - 1];
        let surrounding = chain[chain.len() - 2];
        if call_is_dangerous(innermost, self.graph) && call_is_interesting_or_missing(surrounding, self.graph) {
            self.facts.export_fact(
                ParameterId {
                    function: self.function,
                    index,
                },
                BaseFact::NestedCallsite,
            );
        }
        true
    }
}

/// Follows a call node down through single-argument call expressions,
/// returning the chain (outer to inner) and the final non-call argument.
fn extract_chain(call: Node<'_>) -> Option<(Vec<Node<'_>>, Node<'_>)> {
    let mut chain = Vec::new();
    let mut current = call;
    loop {
        let args = current.child_by_field_name("arguments")?;
        let only_arg = sole_argument(args)?;
        chain.push(current);
        if only_arg.kind() == "call_expression" {
            current = only_arg;
        } else {
            return Some((chain, only_arg));
        }
    }
}

fn sole_argument(args: Node<'_>) -> Option<Node<'_>> {
    if args.named_child_count() == 1 {
        args.named_child(0)
    } else {
        None
    }
}

fn site_for<'a>(call: Node<'_>, graph: &'a CallGraph<'_>) -> Option<&'a CallSite> {
    graph.call_site_at(call.start_byte())
}

/// "the innermost call's signature is missing from the type checker's
/// info, or the innermost signature is interesting and its results contain
/// at least one interesting type."
fn call_is_dangerous(call: Node<'_>, graph: &CallGraph<'_>) -> bool {
    match site_for(call, graph).and_then(|s| s.callee) {
        None => true,
        Some(callee) => {
            let f = &graph.functions[callee];
            f.is_interesting() && f.results_interesting
        }
    }
}

/// "The surrounding call must also be interesting (or missing type info)."
fn call_is_interesting_or_missing(call: Node<'_>, graph: &CallGraph<'_>) -> bool {
    match site_for(call, graph).and_then(|s| s.callee) {
        None => true,
        Some(callee) => graph.functions[callee].is_interesting(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::facts::NESTED_CALLSITE;
    use crate::analysis::resolve::PackageResolver;
    use crate::parser::parse_source;

    #[test]
    fn fires_through_two_unresolved_calls() {
        let src = "package p\n\nfunc f(x int) {\n\t_ = outer(inner(x))\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &graph, &mut facts);
        assert_eq!(
            facts.base_facts(ParameterId { function: func.id, index: 0 }),
            NESTED_CALLSITE
        );
    }

    #[test]
    fn does_not_fire_for_single_call() {
        let src = "package p\n\nfunc f(x int) {\n\t_ = single(x)\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &graph, &mut facts);
        assert_eq!(facts.base_facts(ParameterId { function: func.id, index: 0 }), 0);
    }

    #[test]
    fn does_not_fire_when_inner_call_takes_multiple_arguments() {
        let src = "package p\n\nfunc f(x int) {\n\t_ = outer(inner(x, x))\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);
        let func = &graph.functions[0];
        let mut facts = FactBase::new();
        analyze(func, src, &graph, &mut facts);
        assert_eq!(facts.base_facts(ParameterId { function: func.id, index: 0 }), 0);
    }
}
