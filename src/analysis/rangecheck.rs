//! Range-Loop Checker (§4.6).
//!
//! For each `&ident` inside a function body whose `ident` is bound by a
//! `range` clause, classifies the innermost enclosing syntactic context and
//! either clears or reports the site. All offending sites that share a
//! range statement are grouped into one [`Diagnostic`] (§4.6
//! "Reporting").

use crate::analysis::ast::{inspect, Visitor};
use crate::analysis::acceptlist::AcceptList;
use crate::analysis::callgraph::{CallGraph, FunctionInfo, ParameterId};
use crate::analysis::facts::{bitmask_to_reason, FactBase};
use crate::analysis::resolve::PackageResolver;
use crate::diagnostics::{Category, Diagnostic, RelatedSite, Span};
use std::collections::BTreeMap;
use tree_sitter::Node;

pub fn check<'tree>(
    func: &FunctionInfo<'tree>,
    source: &str,
    graph: &CallGraph<'tree>,
    resolver: &PackageResolver,
    accept: &AcceptList,
    facts: &FactBase,
) -> Vec<Diagnostic> {
    let Some(body) = func.body else {
        return Vec::new();
    };

    let mut visitor = RangeCheckVisitor {
        source,
        graph,
        resolver,
        accept,
        facts,
        active: Vec::new(),
        groups: BTreeMap::new(),
    };
    inspect(body, &mut visitor);

    visitor
        .groups
        .into_values()
        .map(|(range_stmt, loop_var, related)| Diagnostic {
            file: None,
            range_span: Span::from_range(range_stmt.range()),
            loop_var,
            related,
        })
        .collect()
}

/// Drives the §4.1 AST-Inspect Driver over one function body: `for_statement`
/// entry/exit maintains the stack of in-scope range variables, and every
/// `unary_expression` (candidate `&ident`) is classified against the
/// ancestor stack the driver already maintains.
struct RangeCheckVisitor<'tree, 'a> {
    source: &'a str,
    graph: &'a CallGraph<'tree>,
    resolver: &'a PackageResolver,
    accept: &'a AcceptList,
    facts: &'a FactBase,
    active: Vec<(String, Node<'tree>)>,
    groups: BTreeMap<usize, (Node<'tree>, String, Vec<RelatedSite>)>,
}

impl<'tree, 'a> Visitor<'tree> for RangeCheckVisitor<'tree, 'a> {
    fn kinds(&self) -> &[&'static str] {
        &["for_statement", "unary_expression"]
    }

    fn on_node(&mut self, node: Node<'tree>, entering: bool, ancestors: &[Node<'tree>]) -> bool {
        match node.kind() {
            "for_statement" => {
                let vars = range_clause_vars(node, self.source);
                if entering {
                    for name in vars {
                        self.active.push((name, node));
                    }
                } else {
                    for _ in vars {
                        self.active.pop();
                    }
                }
            }
            "unary_expression" if entering => self.check_addr_of(node, ancestors),
            _ => {}
        }
        true
    }
}

impl<'tree, 'a> RangeCheckVisitor<'tree, 'a> {
    fn check_addr_of(&mut self, node: Node<'tree>, ancestors: &[Node<'tree>]) {
        let Some(ident_name) = addr_operand_name(node, self.source) else {
            return;
        };
        let Some((_, range_stmt)) = self.active.iter().rev().find(|(n, _)| n == ident_name) else {
            return;
        };
        let range_stmt = *range_stmt;
        let Some((category, reason)) = classify(
            node,
            self.source,
            self.graph,
            self.resolver,
            self.accept,
            self.facts,
            ancestors,
            range_stmt,
        ) else {
            return;
        };
        let entry = self
            .groups
            .entry(range_stmt.start_byte())
            .or_insert_with(|| (range_stmt, ident_name.to_string(), Vec::new()));
        entry.2.push(RelatedSite {
            span: Span::from_range(node.range()),
            category,
            reason,
        });
    }
}

fn range_clause_vars<'tree>(for_stmt: Node<'tree>, source: &str) -> Vec<String> {
    let mut cursor = for_stmt.walk();
    let Some(clause) = for_stmt.children(&mut cursor).find(|c| c.kind() == "range_clause") else {
        return Vec::new();
    };
    let Some(left) = clause.child_by_field_name("left") else {
        return Vec::new();
    };
    let idents: Box<dyn Iterator<Item = Node<'_>>> = if left.kind() == "expression_list" {
        let mut c = left.walk();
        Box::new(left.named_children(&mut c).collect::<Vec<_>>().into_iter())
    } else {
        Box::new(std::iter::once(left))
    };
    idents
        .filter(|n| n.kind() == "identifier")
        .filter_map(|n| n.utf8_text(source.as_bytes()).ok())
        .filter(|name| *name != "_")
        .map(str::to_string)
        .collect()
}

fn addr_operand_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    if node.kind() != "unary_expression" {
        return None;
    }
    let op = node.child(0)?;
    if op.utf8_text(source.as_bytes()).ok()? != "&" {
        return None;
    }
    let operand = node.child_by_field_name("operand")?;
    if operand.kind() != "identifier" {
        return None;
    }
    operand.utf8_text(source.as_bytes()).ok()
}

/// Classify the innermost enclosing context of `addr_node` and decide
/// whether (and how) to report it. `range_stmt` is the `for_statement` that
/// binds the range variable `addr_node` takes the address of.
#[allow(clippy::too_many_arguments)]
fn classify<'tree>(
    addr_node: Node<'tree>,
    source: &str,
    graph: &CallGraph<'tree>,
    resolver: &PackageResolver,
    accept: &AcceptList,
    facts: &FactBase,
    ancestors: &[Node<'tree>],
    range_stmt: Node<'tree>,
) -> Option<(Category, String)> {
    let (idx, innermost) = ancestors.iter().enumerate().rev().find_map(|(i, n)| {
        match n.kind() {
            "composite_literal" => Some((i, Context::CompositeLit)),
            "assignment_statement" | "short_var_declaration" => Some((i, Context::Assign)),
            "call_expression" => Some((i, Context::Call)),
            "binary_expression" => {
                let op = n.child_by_field_name("operator")?;
                let text = op.utf8_text(source.as_bytes()).ok()?;
                (text == "==" || text == "!=").then_some((i, Context::PtrCompare))
            }
            _ => None,
        }
    })?;
    let context_node = ancestors[idx];

    match innermost {
        Context::CompositeLit => Some((Category::CompositeLit, "composite literal element".to_string())),
        Context::PtrCompare => Some((Category::PtrCompare, "pointer comparison operand".to_string())),
        Context::Assign => {
            if context_node.kind() == "short_var_declaration" {
                return None;
            }
            let right = context_node.child_by_field_name("right")?;
            if !(addr_node.start_byte() >= right.start_byte() && addr_node.end_byte() <= right.end_byte()) {
                return None;
            }
            if is_exempted_by_safe_break(context_node, &ancestors[..=idx], range_stmt) {
                return None;
            }
            Some((Category::AssignRHS, "assignment right-hand side".to_string()))
        }
        Context::Call => classify_call(addr_node, context_node, source, graph, resolver, accept, facts),
    }
}

enum Context {
    CompositeLit,
    Assign,
    Call,
    PtrCompare,
}

fn classify_call<'tree>(
    addr_node: Node<'tree>,
    call: Node<'tree>,
    source: &str,
    graph: &CallGraph<'tree>,
    resolver: &PackageResolver,
    accept: &AcceptList,
    facts: &FactBase,
) -> Option<(Category, String)> {
    if let Some(pkg) = resolver.package_for(call, source) {
        if let Some(member) = PackageResolver::callee_member(call, source) {
            if accept.allows(&pkg, member) {
                return None;
            }
        }
        return Some((Category::UnsafeCall, "ExternalFunc".to_string()));
    }

    let Some(site) = graph.call_site_at(call.start_byte()) else {
        return Some((Category::UnsafeCall, "ExternalFunc".to_string()));
    };

    let Some(callee) = site.callee else {
        return Some((Category::UnsafeCall, "ExternalFunc".to_string()));
    };

    let Some(args) = call.child_by_field_name("arguments") else {
        return None;
    };
    let mut cursor = args.walk();
    let position = args.named_children(&mut cursor).position(|arg| {
        addr_node.start_byte() >= arg.start_byte() && addr_node.end_byte() <= arg.end_byte()
    })?;
    let slot = site.arguments.get(position).map(|(_, slot)| *slot)?;

    let bits = facts.inductive_bits(ParameterId { function: callee, index: slot });
    if bits == 0 {
        None
    } else {
        Some((Category::UnsafeCall, bitmask_to_reason(bits)))
    }
}

/// §4.6 "Followed-by-safe-break rule": exempt when the statement
/// immediately following the assignment in its innermost block is a
/// `return`, or (only when the range loop that bound the variable, not just
/// any enclosing loop, is the innermost enclosing loop) a `break`. Scoped to
/// exactly the immediately following statement (§9 open questions).
fn is_exempted_by_safe_break(
    assign: Node<'_>,
    ancestors_up_to_assign: &[Node<'_>],
    range_stmt: Node<'_>,
) -> bool {
    let Some(block) = ancestors_up_to_assign.iter().rev().find(|n| n.kind() == "block") else {
        return false;
    };
    let mut cursor = block.walk();
    let children: Vec<Node<'_>> = block.named_children(&mut cursor).collect();
    let Some(pos) = children.iter().position(|c| c.id() == assign.id()) else {
        return false;
    };
    let Some(next) = children.get(pos + 1) else {
        return false;
    };

    match next.kind() {
        "return_statement" => true,
        "break_statement" => {
            let innermost_loop = ancestors_up_to_assign
                .iter()
                .rev()
                .find(|n| n.kind() == "for_statement");
            innermost_loop.is_some_and(|n| n.id() == range_stmt.id())
        }
        _ => false,
    }
}
