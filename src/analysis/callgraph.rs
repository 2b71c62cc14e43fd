//! Type-Aware Call Graph (§4.3).
//!
//! Built without a real Go type-checker: function identity is the
//! declaration node's byte offset in its source file; call-site resolution
//! is syntactic name matching within one package's enumerated declarations
//! (bare identifier → top-level function of the same package; selector
//! whose root's local static type is known → method of that receiver type;
//! selector whose root matches an import binding → external call).

use crate::analysis::resolve::PackageResolver;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tree_sitter::Node;

pub type FunctionId = usize;

/// Identifies one parameter slot. Receivers use index `-1` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId {
    pub function: FunctionId,
    pub index: i32,
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: Option<String>,
    pub interesting: bool,
    pub is_variadic: bool,
    /// Declared type is a pointer type. §4.5.1: "Only pointer-typed
    /// caller parameters receive lifted facts; value parameters are not
    /// tracked" — narrower than `interesting`, which also covers empty
    /// interfaces.
    pub is_pointer: bool,
}

/// One enumerated function or method declaration.
pub struct FunctionInfo<'tree> {
    pub id: FunctionId,
    pub name: String,
    /// Base receiver type name with any leading `*` stripped; `None` for
    /// free functions and interface methods with no concrete receiver.
    pub receiver_type: Option<String>,
    pub receiver_interesting: bool,
    pub byte_offset: usize,
    pub node: Node<'tree>,
    pub body: Option<Node<'tree>>,
    /// Positional parameters, in declaration order. The final entry is the
    /// variadic slot when `is_variadic` is set on it.
    pub params: Vec<ParamInfo>,
    pub results_interesting: bool,
}

impl<'tree> FunctionInfo<'tree> {
    /// §3 "interesting signature": pointer receiver, or any
    /// non-variadic parameter / variadic element type that is a pointer or
    /// empty interface.
    pub fn is_interesting(&self) -> bool {
        self.receiver_interesting || self.params.iter().any(|p| p.interesting)
    }

    /// Name bound to the method receiver, if this is a method with a named
    /// receiver. Receivers occupy parameter index `-1` (§3).
    pub fn receiver_name(&self, source: &str) -> Option<String> {
        let receiver = self.node.child_by_field_name("receiver")?;
        receiver_name(receiver, source)
    }

    fn local_type_of(&self, name: &str, source: &str) -> Option<String> {
        let params_node = self.node.child_by_field_name("parameters")?;
        let mut cursor = params_node.walk();
        for decl in params_node.children(&mut cursor) {
            if decl.kind() != "parameter_declaration" && decl.kind() != "variadic_parameter_declaration" {
                continue;
            }
            let mut inner = decl.walk();
            let mut names = Vec::new();
            let mut ty_node = None;
            for child in decl.children(&mut inner) {
                if child.kind() == "identifier" {
                    if let Ok(t) = child.utf8_text(source.as_bytes()) {
                        names.push(t);
                    }
                } else if child.id() != decl.id() {
                    ty_node = Some(child);
                }
            }
            if names.iter().any(|n| *n == name) {
                return ty_node.and_then(|t| type_base_name(t, source));
            }
        }
        None
    }
}

/// A resolved or external call expression.
pub struct CallSite {
    pub caller: FunctionId,
    pub callee: Option<FunctionId>,
    pub call_byte_offset: usize,
    /// For each positional argument: `(caller_param_index, callee_slot)`
    /// when the argument is a bare identifier or `&ident` bound to one of
    /// the caller's own parameters; `None` otherwise ("no binding",
    /// §3).
    pub arguments: Vec<(Option<i32>, i32)>,
    /// `(package_path, member)` when this call resolved, via the package
    /// resolver, to a selector call on an imported package. `None` for
    /// unqualified or method calls (§6 accept-list consultation).
    pub external_package_member: Option<(String, String)>,
}

#[derive(Default)]
pub struct CallGraph<'tree> {
    pub functions: Vec<FunctionInfo<'tree>>,
    pub call_sites: Vec<CallSite>,
    /// `ExternalCalls`: call expressions whose callee did not resolve to an
    /// enumerated declaration (§4.3).
    pub external_calls: Vec<usize>,
    /// Edges between two interesting functions only (§3).
    forward: BTreeMap<FunctionId, Vec<usize>>,
    reverse: BTreeMap<FunctionId, Vec<FunctionId>>,
    free_functions: HashMap<String, FunctionId>,
    methods: HashMap<(String, String), FunctionId>,
    site_by_offset: HashMap<usize, usize>,
}

impl<'tree> CallGraph<'tree> {
    pub fn build(root: Node<'tree>, source: &str, resolver: &PackageResolver) -> Self {
        let mut graph = CallGraph::default();
        graph.enumerate_declarations(root, source);
        graph.enumerate_calls(root, source, resolver);
        graph
    }

    fn enumerate_declarations(&mut self, root: Node<'tree>, source: &str) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "function_declaration" => self.record_function(child, source, None),
                "method_declaration" => {
                    let receiver_type = child
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_base_type(r, source));
                    self.record_function(child, source, receiver_type);
                }
                _ => {}
            }
        }
    }

    fn record_function(&mut self, node: Node<'tree>, source: &str, receiver_type: Option<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Ok(name) = name_node.utf8_text(source.as_bytes()) else {
            return;
        };

        let receiver_interesting = node
            .child_by_field_name("receiver")
            .map(|r| receiver_is_pointer(r))
            .unwrap_or(false);

        let params = node
            .child_by_field_name("parameters")
            .map(|p| parse_params(p, source))
            .unwrap_or_default();

        let results_interesting = node
            .child_by_field_name("result")
            .map(|r| result_is_interesting(r, source))
            .unwrap_or(false);

        let id = self.functions.len();
        let body = node.child_by_field_name("body");

        if let Some(base) = &receiver_type {
            self.methods.insert((base.clone(), name.to_string()), id);
        } else {
            self.free_functions.insert(name.to_string(), id);
        }

        self.functions.push(FunctionInfo {
            id,
            name: name.to_string(),
            receiver_type,
            receiver_interesting,
            byte_offset: node.start_byte(),
            node,
            body,
            params,
            results_interesting,
        });
    }

    fn enumerate_calls(&mut self, root: Node<'tree>, source: &str, resolver: &PackageResolver) {
        for func_id in 0..self.functions.len() {
            let Some(body) = self.functions[func_id].body else {
                continue;
            };
            self.walk_calls_in(func_id, body, source, resolver);
        }
        let _ = root;
    }

    fn walk_calls_in(
        &mut self,
        caller: FunctionId,
        node: Node<'tree>,
        source: &str,
        resolver: &PackageResolver,
    ) {
        if node.kind() == "call_expression" {
            self.record_call(caller, node, source, resolver);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk_calls_in(caller, child, source, resolver);
        }
    }

    fn record_call(
        &mut self,
        caller: FunctionId,
        call: Node<'tree>,
        source: &str,
        resolver: &PackageResolver,
    ) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };

        let external_package_member = if function.kind() == "selector_expression" {
            resolver
                .package_for(call, source)
                .zip(PackageResolver::callee_member(call, source).map(str::to_string))
        } else {
            None
        };

        let callee = match function.kind() {
            "identifier" => function
                .utf8_text(source.as_bytes())
                .ok()
                .filter(|name| !is_builtin(name))
                .and_then(|name| self.free_functions.get(name).copied()),
            "selector_expression" => {
                if external_package_member.is_some() {
                    None
                } else {
                    self.resolve_method_call(caller, function, source)
                }
            }
            _ => None,
        };

        let arguments = self.bind_arguments(caller, callee, call, source);
        let site_index = self.call_sites.len();
        self.site_by_offset.insert(call.start_byte(), site_index);
        self.call_sites.push(CallSite {
            caller,
            callee,
            call_byte_offset: call.start_byte(),
            arguments,
            external_package_member,
        });

        match callee {
            Some(callee_id) => {
                if self.functions[caller].is_interesting() && self.functions[callee_id].is_interesting() {
                    self.forward.entry(caller).or_default().push(site_index);
                    self.reverse.entry(callee_id).or_default().push(caller);
                }
            }
            None => {
                if function.kind() != "identifier"
                    || function
                        .utf8_text(source.as_bytes())
                        .map(|n| !is_builtin(n))
                        .unwrap_or(true)
                {
                    self.external_calls.push(site_index);
                }
            }
        }
    }

    fn resolve_method_call(
        &self,
        caller: FunctionId,
        selector: Node<'tree>,
        source: &str,
    ) -> Option<FunctionId> {
        let operand = selector.child_by_field_name("operand")?;
        let field = selector.child_by_field_name("field")?;
        let method_name = field.utf8_text(source.as_bytes()).ok()?;

        let base_type = match operand.kind() {
            "identifier" => {
                let name = operand.utf8_text(source.as_bytes()).ok()?;
                let caller_info = &self.functions[caller];
                if caller_info.receiver_type.is_some()
                    && caller_info
                        .node
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_name(r, source))
                        .as_deref()
                        == Some(name)
                {
                    caller_info.receiver_type.clone()
                } else {
                    caller_info.local_type_of(name, source)
                }
            }
            _ => None,
        }?;

        self.methods.get(&(base_type, method_name.to_string())).copied()
    }

    /// `slot` in the returned pairs indexes into the *callee's* parameter
    /// list (§4.5.1 "the callee's final-slot parameter is the one
    /// consulted" for variadic calls), clamped to the callee's last
    /// declared slot when the callee is known. Unresolved callees use the
    /// raw positional index; nothing downstream consults it without a
    /// resolved callee.
    fn bind_arguments(
        &self,
        caller: FunctionId,
        callee: Option<FunctionId>,
        call: Node<'tree>,
        source: &str,
    ) -> Vec<(Option<i32>, i32)> {
        let Some(args_node) = call.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let caller_info = &self.functions[caller];
        let last_slot = callee
            .map(|id| self.functions[id].params.len().saturating_sub(1) as i32)
            .unwrap_or(i32::MAX);

        let mut out = Vec::new();
        let mut cursor = args_node.walk();
        let mut position = 0i32;
        for arg in args_node.named_children(&mut cursor) {
            let slot = if position > last_slot { last_slot } else { position };
            let binding = bare_or_addr_ident(arg, source)
                .and_then(|ident| caller_info.params.iter().position(|p| p.name.as_deref() == Some(ident)))
                .map(|idx| idx as i32);
            out.push((binding, slot));
            position += 1;
        }
        out
    }

    pub fn forward_successors(&self, f: FunctionId) -> impl Iterator<Item = (&CallSite, FunctionId)> {
        self.forward
            .get(&f)
            .into_iter()
            .flatten()
            .filter_map(move |&idx| self.call_sites[idx].callee.map(|callee| (&self.call_sites[idx], callee)))
    }

    pub fn reverse_predecessors(&self, f: FunctionId) -> &[FunctionId] {
        self.reverse.get(&f).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Calls made by `caller`, for the propagator's lift step.
    pub fn calls_by(&self, caller: FunctionId) -> impl Iterator<Item = &CallSite> {
        self.call_sites.iter().filter(move |c| c.caller == caller)
    }

    /// Look up the resolved call site for a `call_expression` node by its
    /// byte offset. Used by the nested-callsite analyzer to inspect a
    /// chain's own call nodes.
    pub fn call_site_at(&self, byte_offset: usize) -> Option<&CallSite> {
        self.site_by_offset.get(&byte_offset).map(|&idx| &self.call_sites[idx])
    }

    /// Leaves of the interesting-function graph: functions with no
    /// outgoing interesting edges.
    pub fn leaves(&self) -> Vec<FunctionId> {
        (0..self.functions.len())
            .filter(|id| self.functions[*id].is_interesting() && !self.forward.contains_key(id))
            .collect()
    }

    /// Reverse-BFS from `roots` over the called-by graph, invoking
    /// `visit` once per reachable node (§4.3, §4.5.2).
    pub fn reverse_bfs(&self, roots: &[FunctionId], mut visit: impl FnMut(FunctionId)) {
        let mut seen: HashSet<FunctionId> = HashSet::new();
        let mut queue: VecDeque<FunctionId> = roots.iter().copied().collect();
        for r in roots {
            seen.insert(*r);
        }
        while let Some(node) = queue.pop_front() {
            visit(node);
            for &pred in self.reverse_predecessors(node) {
                if seen.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "len" | "cap" | "append" | "make" | "new" | "panic" | "recover" | "print" | "println" | "copy"
            | "delete" | "close" | "complex" | "real" | "imag" | "min" | "max" | "clear"
    )
}

fn bare_or_addr_ident<'a>(arg: Node<'_>, source: &'a str) -> Option<&'a str> {
    match arg.kind() {
        "identifier" => arg.utf8_text(source.as_bytes()).ok(),
        "unary_expression" => {
            let op = arg.child(0)?;
            if op.utf8_text(source.as_bytes()).ok()? != "&" {
                return None;
            }
            let operand = arg.child_by_field_name("operand")?;
            if operand.kind() != "identifier" {
                return None;
            }
            operand.utf8_text(source.as_bytes()).ok()
        }
        _ => None,
    }
}

fn receiver_name(receiver_params: Node<'_>, source: &str) -> Option<String> {
    let decl = receiver_params.named_child(0)?;
    let name = decl.child_by_field_name("name")?;
    name.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

fn receiver_base_type(receiver_params: Node<'_>, source: &str) -> Option<String> {
    let decl = receiver_params.named_child(0)?;
    let ty = decl.child_by_field_name("type")?;
    type_base_name(ty, source)
}

fn receiver_is_pointer(receiver_params: Node<'_>) -> bool {
    receiver_params
        .named_child(0)
        .and_then(|decl| decl.child_by_field_name("type"))
        .map(|ty| ty.kind() == "pointer_type")
        .unwrap_or(false)
}

fn type_base_name(ty: Node<'_>, source: &str) -> Option<String> {
    let ty = if ty.kind() == "pointer_type" {
        ty.named_child(0)?
    } else {
        ty
    };
    ty.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

fn type_is_interesting(ty: Node<'_>, source: &str) -> bool {
    match ty.kind() {
        "pointer_type" => true,
        "interface_type" => ty.named_child_count() == 0,
        "type_identifier" => ty
            .utf8_text(source.as_bytes())
            .map(|t| t == "any")
            .unwrap_or(false),
        _ => false,
    }
}

fn parse_params(params_node: Node<'_>, source: &str) -> Vec<ParamInfo> {
    let mut out = Vec::new();
    let mut cursor = params_node.walk();
    for decl in params_node.named_children(&mut cursor) {
        match decl.kind() {
            "parameter_declaration" => {
                let ty = decl.child_by_field_name("type");
                let interesting = ty.map(|t| type_is_interesting(t, source)).unwrap_or(false);
                let is_pointer = ty.map(|t| t.kind() == "pointer_type").unwrap_or(false);
                let names: Vec<&str> = decl
                    .children(&mut decl.walk())
                    .filter(|c| c.kind() == "identifier")
                    .filter_map(|c| c.utf8_text(source.as_bytes()).ok())
                    .collect();
                if names.is_empty() {
                    out.push(ParamInfo {
                        name: None,
                        interesting,
                        is_variadic: false,
                        is_pointer,
                    });
                } else {
                    for name in names {
                        out.push(ParamInfo {
                            name: Some(name.to_string()),
                            interesting,
                            is_variadic: false,
                            is_pointer,
                        });
                    }
                }
            }
            "variadic_parameter_declaration" => {
                let ty = decl.child_by_field_name("type");
                let interesting = ty.map(|t| type_is_interesting(t, source)).unwrap_or(false);
                let is_pointer = ty.map(|t| t.kind() == "pointer_type").unwrap_or(false);
                let name = decl
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source.as_bytes()).ok())
                    .map(str::to_string);
                out.push(ParamInfo {
                    name,
                    interesting,
                    is_variadic: true,
                    is_pointer,
                });
            }
            _ => {}
        }
    }
    out
}

fn result_is_interesting(result: Node<'_>, source: &str) -> bool {
    match result.kind() {
        "parameter_list" => {
            let mut cursor = result.walk();
            result.named_children(&mut cursor).any(|decl| {
                decl.child_by_field_name("type")
                    .map(|t| type_is_interesting(t, source))
                    .unwrap_or(false)
            })
        }
        _ => type_is_interesting(result, source),
    }
}
