//! Inductive Fact Propagator (§4.5).
//!
//! Lifts per-parameter base-case facts through the call graph via
//! reverse-BFS from the graph's leaves, composing a hazard bitmask per
//! parameter. Iterates to a fixed point: the bitmask only grows, over a
//! finite lattice, so termination is guaranteed (§3 invariant).

use crate::analysis::acceptlist::AcceptList;
use crate::analysis::callgraph::{CallGraph, FunctionId, ParameterId};
use crate::analysis::facts::{FactBase, EXTERNAL_FUNC, WRITES_INPUT};

pub fn propagate(graph: &CallGraph<'_>, accept: &AcceptList, facts: &mut FactBase) {
    facts.seed_self();
    let roots = graph.leaves();
    loop {
        let mut changed = false;
        graph.reverse_bfs(&roots, |caller| {
            if lift(graph, accept, caller, facts) {
                changed = true;
            }
        });
        if !changed {
            break;
        }
    }
}

/// One lift step over every call site made by `caller` (§4.5.1).
/// Returns whether any caller parameter's bitmask grew.
fn lift(graph: &CallGraph<'_>, accept: &AcceptList, caller: FunctionId, facts: &mut FactBase) -> bool {
    let mut changed = false;
    for site in graph.calls_by(caller) {
        for &(caller_param, callee_slot) in &site.arguments {
            let Some(caller_idx) = caller_param else {
                continue;
            };
            let Some(param_info) = graph.functions[caller].params.get(caller_idx as usize) else {
                continue;
            };
            if !param_info.is_pointer {
                continue;
            }
            let caller_pid = ParameterId {
                function: caller,
                index: caller_idx,
            };

            match site.callee {
                Some(callee_id) => {
                    let callee_pid = ParameterId {
                        function: callee_id,
                        index: callee_slot,
                    };
                    let mut bits = facts.base_facts(callee_pid) & WRITES_INPUT;
                    bits |= facts.inductive_bits(callee_pid);
                    if bits != 0 && facts.import_fact(caller_pid, bits) {
                        changed = true;
                    }
                }
                None => {
                    let accepted = site
                        .external_package_member
                        .as_ref()
                        .map(|(pkg, member)| accept.allows(pkg, member))
                        .unwrap_or(false);
                    if !accepted && facts.import_fact(caller_pid, EXTERNAL_FUNC) {
                        changed = true;
                    }
                }
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzers::writes_input;
    use crate::analysis::resolve::PackageResolver;
    use crate::parser::parse_source;

    #[test]
    fn lifts_writes_input_through_one_call() {
        let src = "package p\n\nfunc a(x *int) { b(x) }\n\nfunc b(y *int) {\n\tvar z *int\n\tz = y\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);

        let mut facts = FactBase::new();
        for func in &graph.functions {
            writes_input::analyze(func, src, &mut facts);
        }
        let accept = AcceptList::empty();
        propagate(&graph, &accept, &mut facts);

        let a_id = graph.functions.iter().find(|f| f.name == "a").unwrap().id;
        let pid = ParameterId { function: a_id, index: 0 };
        assert_eq!(facts.inductive_bits(pid) & WRITES_INPUT, WRITES_INPUT);
    }

    /// §8 invariant 2: WritesInput can appear in a parameter's
    /// inductive bitmask purely because the base-case analyzer set it on
    /// that same parameter, with no call site involved at all.
    #[test]
    fn own_base_fact_appears_in_own_inductive_bitmask_with_no_callers() {
        let src = "package p\n\nfunc leaf(x *int) {\n\tvar r *int\n\tr = x\n}\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);

        let mut facts = FactBase::new();
        for func in &graph.functions {
            writes_input::analyze(func, src, &mut facts);
        }
        let accept = AcceptList::empty();
        propagate(&graph, &accept, &mut facts);

        let leaf_id = graph.functions.iter().find(|f| f.name == "leaf").unwrap().id;
        let pid = ParameterId { function: leaf_id, index: 0 };
        assert_eq!(facts.inductive_bits(pid) & WRITES_INPUT, WRITES_INPUT);
    }

    #[test]
    fn unaccepted_external_call_sets_external_func() {
        let src = "package p\n\nimport \"example.com/risky\"\n\nfunc a(x *int) { risky.Leak(x) }\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);

        let mut facts = FactBase::new();
        let accept = AcceptList::empty();
        propagate(&graph, &accept, &mut facts);

        let a_id = graph.functions.iter().find(|f| f.name == "a").unwrap().id;
        let pid = ParameterId { function: a_id, index: 0 };
        assert_eq!(facts.inductive_bits(pid) & EXTERNAL_FUNC, EXTERNAL_FUNC);
    }

    #[test]
    fn accept_listed_external_call_does_not_set_external_func() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc a(x *int) { fmt.Println(x) }\n";
        let tree = parse_source("p.go", src).unwrap();
        let resolver = PackageResolver::from_source_file(tree.root_node(), src);
        let graph = CallGraph::build(tree.root_node(), src, &resolver);

        let mut facts = FactBase::new();
        let accept = AcceptList::parse("accept:\n  fmt: [Println]\n").unwrap();
        propagate(&graph, &accept, &mut facts);

        let a_id = graph.functions.iter().find(|f| f.name == "a").unwrap().id;
        let pid = ParameterId { function: a_id, index: 0 };
        assert_eq!(facts.inductive_bits(pid) & EXTERNAL_FUNC, 0);
    }
}
