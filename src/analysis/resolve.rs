//! Package Resolver (§4.2).
//!
//! Builds, per source file, a mapping from locally-bound import name to
//! package path, and answers whether a given call expression's callee root
//! refers to one of those bindings.

use std::collections::HashMap;
use tree_sitter::Node;

/// `local_name -> package_path` bindings for a single file's imports.
#[derive(Debug, Default, Clone)]
pub struct PackageResolver {
    bindings: HashMap<String, String>,
}

impl PackageResolver {
    /// Scan `root` (a `source_file` node) for `import_declaration`s and
    /// build the local-name bindings. Unnamed imports bind to the last
    /// `/`-separated segment of the path, per §4.2.
    pub fn from_source_file(root: Node<'_>, source: &str) -> Self {
        let mut bindings = HashMap::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "import_declaration" {
                collect_import_decl(child, source, &mut bindings);
            }
        }
        Self { bindings }
    }

    /// Resolve the package path bound to `local_name`, if any.
    pub fn package_for_name(&self, local_name: &str) -> Option<&str> {
        self.bindings.get(local_name).map(String::as_str)
    }

    /// §4.2: "returns a package path only when the callee is a
    /// `selector.expression` whose root is a bare identifier that matches an
    /// import binding in the enclosing file. Failure signals 'not an
    /// external package call'."
    pub fn package_for(&self, call_expression: Node<'_>, source: &str) -> Option<String> {
        let function = call_expression.child_by_field_name("function")?;
        if function.kind() != "selector_expression" {
            return None;
        }
        let operand = function.child_by_field_name("operand")?;
        if operand.kind() != "identifier" {
            return None;
        }
        let root_name = operand.utf8_text(source.as_bytes()).ok()?;
        self.package_for_name(root_name).map(str::to_string)
    }

    /// The selector member name of a `selector_expression` callee, e.g.
    /// `Printf` in `fmt.Printf(...)`. Used together with [`Self::package_for`]
    /// to check the accept-list.
    pub fn callee_member<'a>(call_expression: Node<'_>, source: &'a str) -> Option<&'a str> {
        let function = call_expression.child_by_field_name("function")?;
        if function.kind() != "selector_expression" {
            return None;
        }
        let field = function.child_by_field_name("field")?;
        field.utf8_text(source.as_bytes()).ok()
    }
}

fn collect_import_decl(decl: Node<'_>, source: &str, out: &mut HashMap<String, String>) {
    let mut cursor = decl.walk();
    for child in decl.children(&mut cursor) {
        match child.kind() {
            "import_spec" => collect_import_spec(child, source, out),
            "import_spec_list" => {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() == "import_spec" {
                        collect_import_spec(spec, source, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_import_spec(spec: Node<'_>, source: &str, out: &mut HashMap<String, String>) {
    let Some(path_node) = spec.child_by_field_name("path") else {
        return;
    };
    let Ok(raw_path) = path_node.utf8_text(source.as_bytes()) else {
        return;
    };
    let path = raw_path.trim_matches(|c| c == '"' || c == '`');
    if path.is_empty() {
        return;
    }

    let explicit_name = spec
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok());

    let local_name = match explicit_name {
        Some(".") | Some("_") => return,
        Some(name) => name.to_string(),
        None => path.rsplit('/').next().unwrap_or(path).to_string(),
    };

    out.insert(local_name, path.to_string());
}
