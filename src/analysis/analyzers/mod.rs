//! Base-Case Fact Analyzers (§4.4).
//!
//! All four share a skeleton: walk the function body with the AST driver,
//! compute the set of the function's own parameter bindings (including the
//! receiver at index `-1`), and emit a parameter-keyed base-case fact on
//! specific syntactic shapes.

pub mod async_capture;
pub mod nested_callsite;
pub mod pointer_compare;
pub mod writes_input;

use crate::analysis::callgraph::FunctionInfo;
use std::collections::HashMap;

/// `identifier name -> parameter index` for one function, receiver
/// included at index `-1`.
pub fn local_param_indices(func: &FunctionInfo<'_>, source: &str) -> HashMap<String, i32> {
    let mut out = HashMap::new();
    if let Some(name) = func.receiver_name(source) {
        out.insert(name, -1);
    }
    for (idx, param) in func.params.iter().enumerate() {
        if let Some(name) = &param.name {
            out.insert(name.clone(), idx as i32);
        }
    }
    out
}

/// An identifier node, bare or dereferenced through `&`, resolved against a
/// function's own parameter bindings (used by writes-input,
/// pointer-compare, and async-capture: "both bare identifiers `p` and `&p`
/// count").
pub fn bound_param_index(
    node: tree_sitter::Node<'_>,
    source: &str,
    locals: &HashMap<String, i32>,
) -> Option<i32> {
    let ident = match node.kind() {
        "identifier" => node,
        "unary_expression" => {
            let op = node.child(0)?;
            if op.utf8_text(source.as_bytes()).ok()? != "&" {
                return None;
            }
            let operand = node.child_by_field_name("operand")?;
            if operand.kind() != "identifier" {
                return None;
            }
            operand
        }
        _ => return None,
    };
    let name = ident.utf8_text(source.as_bytes()).ok()?;
    locals.get(name).copied()
}
