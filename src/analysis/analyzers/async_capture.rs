//! Async-Capture analyzer (§4.4.2).
//!
//! Fires when a parameter identifier appears inside the body of a deferred
//! call or an asynchronously-spawned (`go`) call. Only closures (function
//! literals) actually capture their enclosing scope; `go`/`defer` of a
//! named function merely evaluates its arguments eagerly, so only the
//! `go func() { ... }()` / `defer func() { ... }()` shape is scanned.

use crate::analysis::analyzers::local_param_indices;
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
    let mut visitor = AsyncCaptureVisitor {
        function: func.id,
        source,
        locals: &locals,
        facts,
    };
    inspect(body, &mut visitor);
}

struct AsyncCaptureVisitor<'a> {
    function: FunctionId,
    source: &'a str,
    locals: &'a HashMap<String, i32>,
    facts: &'a mut FactBase,
}

impl<'tree, 'a> Visitor<'tree> for AsyncCaptureVisitor<'a> {
    fn kinds(&self) -> &[&'static str] {
        &["go_statement", "defer_statement"]
    }

    fn on_node(&mut self, node: Node<'tree>, entering: bool, _ancestors: &[Node<'tree>]) -> bool {
        if entering {
            if let Some(literal_body) = spawned_literal_body(node) {
                scan_references(literal_body, self.source, self.locals, self.function, self.facts);
            }
        }
        true
    }
}

fn spawned_literal_body(stmt: Node<'_>) -> Option<Node<'_>> {
    let expr = stmt.named_child(0)?;
    let call = if expr.kind() == "call_expression" {
        expr
    } else {
        return None;
    };
    let function = call.child_by_field_name("function")?;
    if function.kind() != "func_literal" {
        return None;
    }
    function.child_by_field_name("body")
}

fn scan_references(
    node: Node<'_>,
    source: &str,
    locals: &std::collections::HashMap<String, i32>,
    function: FunctionId,
    facts: &mut FactBase,
) {
    if node.kind() == "identifier" {
        if let Ok(name) = node.utf8_text(source.as_bytes()) {
            if let Some(&index) = locals.get(name) {
                facts.export_fact(ParameterId { function, index }, BaseFact::CapturesAsync);
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        scan_references(child, source, locals, function, facts);
    }
}
