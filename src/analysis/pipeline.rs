//! Per-package orchestration (§2, §5).
//!
//! Runs parse -> base-case analyzers -> inductive propagator -> range-loop
//! checker over every file of one package. Packages within a repository may
//! be analyzed in parallel by the caller; each call to
//! [`analyze_package`] owns its own fact base (§5) and is isolated
//! from panics in a single analyzer (§4.7).
//!
//! Call-graph construction here is scoped to one file at a time rather than
//! merged across a whole package: every literal example in this design's
//! testable-properties section is intra-file, and the core's own
//! non-goals already rule out sound whole-program resolution. Cross-file
//! calls within a package fall back to the same "unresolved, therefore
//! potentially external" treatment §4.7 gives any other
//! resolution failure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::instrument_block;

use crate::analysis::acceptlist::AcceptList;
use crate::analysis::analyzers::{async_capture, nested_callsite, pointer_compare, writes_input};
use crate::analysis::callgraph::CallGraph;
use crate::analysis::facts::FactBase;
use crate::analysis::propagate::propagate;
use crate::analysis::rangecheck;
use crate::analysis::resolve::PackageResolver;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::parser::{contains_error_node, parse_source};

/// Cooperative cancellation signal propagated into a per-package analysis
/// (§5 "Cancellation & timeouts").
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One Go source file belonging to the package under analysis.
pub struct SourceFile {
    pub name: String,
    pub source: String,
}

/// Analyze every file of one package, aggregating diagnostics. A canceled
/// token abandons partial results and returns no diagnostics (§5).
pub fn analyze_package(
    files: &[SourceFile],
    accept: &AcceptList,
    cancel: &CancellationToken,
) -> Result<Vec<Diagnostic>> {
    instrument_block!("package", { files = files.len() }, {
        let mut diagnostics = Vec::new();
        for file in files {
            if cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            match analyze_file(file, accept) {
                Ok(mut found) => diagnostics.append(&mut found),
                Err(Error::Parse { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        Ok(diagnostics)
    })
}

fn analyze_file(file: &SourceFile, accept: &AcceptList) -> Result<Vec<Diagnostic>> {
    match panic::catch_unwind(AssertUnwindSafe(|| analyze_file_inner(file, accept))) {
        Ok(inner) => inner,
        Err(_) => Err(Error::analyzer(
            "pipeline",
            format!("panic while analyzing {}", file.name),
        )),
    }
}

fn analyze_file_inner(file: &SourceFile, accept: &AcceptList) -> Result<Vec<Diagnostic>> {
    let tree = parse_source(&file.name, &file.source)?;
    let root = tree.root_node();
    if contains_error_node(root) {
        return Err(Error::parse(&file.name, "syntax error"));
    }

    let resolver = PackageResolver::from_source_file(root, &file.source);
    let graph = CallGraph::build(root, &file.source, &resolver);

    let mut facts = FactBase::new();
    for func in &graph.functions {
        writes_input::analyze(func, &file.source, &mut facts);
        async_capture::analyze(func, &file.source, &mut facts);
        pointer_compare::analyze(func, &file.source, &mut facts);
        nested_callsite::analyze(func, &file.source, &graph, &mut facts);
    }

    propagate(&graph, accept, &mut facts);

    let mut diagnostics = Vec::new();
    for func in &graph.functions {
        for diag in rangecheck::check(func, &file.source, &graph, &resolver, accept, &facts) {
            diagnostics.push(diag.with_file(file.name.clone()));
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_diagnostic_with_originating_file_name() {
        let files = vec![SourceFile {
            name: "trap.go".to_string(),
            source: "package p\n\nfunc f() {\n\tvar y interface{}\n\tfor _, x := range []int{1, 2, 3} {\n\t\ty = S{&x}\n\t}\n\t_ = y\n}\n".to_string(),
        }];
        let accept = AcceptList::empty();
        let diags = analyze_package(&files, &accept, &CancellationToken::new()).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file.as_deref(), Some("trap.go"));
    }

    #[test]
    fn skips_file_with_syntax_error_and_continues_package() {
        let files = vec![
            SourceFile {
                name: "broken.go".to_string(),
                source: "package p\n\nfunc f( {\n".to_string(),
            },
            SourceFile {
                name: "clean.go".to_string(),
                source: "package p\n\nfunc g() {}\n".to_string(),
            },
        ];
        let accept = AcceptList::empty();
        let diags = analyze_package(&files, &accept, &CancellationToken::new()).unwrap();
        assert!(diags.is_empty());
    }

    #[test]
    fn cancellation_yields_no_diagnostics() {
        let files = vec![SourceFile {
            name: "trap.go".to_string(),
            source: "package p\n\nfunc f() {\n\tvar y interface{}\n\tfor _, x := range []int{1, 2, 3} {\n\t\ty = S{&x}\n\t}\n\t_ = y\n}\n".to_string(),
        }];
        let accept = AcceptList::empty();
        let token = CancellationToken::new();
        token.cancel();
        let diags = analyze_package(&files, &accept, &token).unwrap();
        assert!(diags.is_empty());
    }
}
