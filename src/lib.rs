//! VetBot's static-analysis core and ambient collaborator stack.
//!
//! The crate exposes [`Pipeline`], a thin builder over
//! [`analysis::pipeline::analyze_package`], plus the collaborator modules
//! (`collab`) that fetch repositories, persist findings, and file issues.

pub mod analysis;
pub mod cli;
pub mod collab;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod telemetry;

use crate::analysis::acceptlist::AcceptList;
use crate::analysis::pipeline::{analyze_package, CancellationToken, SourceFile};
use crate::diagnostics::Diagnostic;
use crate::error::Result;

/// Orchestrates a single package's analysis: parse, run the four base-case
/// analyzers, propagate inductive facts, and range-check (§2).
pub struct Pipeline {
    accept: AcceptList,
    cancel: CancellationToken,
}

impl Pipeline {
    #[must_use]
    pub fn new(accept: AcceptList) -> Self {
        Self {
            accept,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a builder for configuring a [`Pipeline`].
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// A token the caller can use to cancel an in-flight package analysis
    /// from another thread (§5 "Cancellation & timeouts").
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Analyze one package's worth of Go source files and return its
    /// diagnostics.
    #[must_use = "diagnostics should be processed or reported"]
    pub fn analyze_package(&self, files: &[SourceFile]) -> Result<Vec<Diagnostic>> {
        analyze_package(files, &self.accept, &self.cancel)
    }
}

/// Builder for constructing a configured [`Pipeline`].
///
/// Use [`Pipeline::builder()`] to create a new builder.
#[derive(Default)]
pub struct PipelineBuilder {
    accept: Option<AcceptList>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit accept-list (§6). Defaults to an empty
    /// accept-list ("unknown packages default to external / unsafe") when
    /// not set.
    #[must_use]
    pub fn accept_list(mut self, accept: AcceptList) -> Self {
        self.accept = Some(accept);
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline::new(self.accept.unwrap_or_else(AcceptList::empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_reports_direct_unsafe_call() {
        let pipeline = Pipeline::builder().build();
        let files = vec![SourceFile {
            name: "a.go".to_string(),
            source: "package p\n\ntype A struct{}\n\nfunc f(a *A) {\n\tfor _, z := range []int{1} {\n\t\tvar y int\n\t\ta.unsafeWrites(&z, &y)\n\t}\n}\n\nfunc (a *A) unsafeWrites(x, y *int) *int {\n\tvar r *int\n\tr = x\n\treturn r\n}\n".to_string(),
        }];
        let diagnostics = pipeline.analyze_package(&files).expect("analysis should succeed");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn cancelling_the_token_stops_further_diagnostics() {
        let pipeline = Pipeline::builder().build();
        pipeline.cancellation_token().cancel();
        let files = vec![SourceFile {
            name: "a.go".to_string(),
            source: "package p\n\nfunc f() {\n\tvar y interface{}\n\tfor _, x := range []int{1} {\n\t\ty = S{&x}\n\t}\n\t_ = y\n}\n".to_string(),
        }];
        let diagnostics = pipeline.analyze_package(&files).expect("analysis should succeed");
        assert!(diagnostics.is_empty());
    }
}
