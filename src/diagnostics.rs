//! Diagnostic data model (§3 "Diagnostic", §4.6 "Reporting").

use tree_sitter::Range;

/// The four diagnostic categories a range-loop site can be reported under
/// (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    AssignRHS,
    CompositeLit,
    PtrCompare,
    UnsafeCall,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AssignRHS => "AssignRHS",
            Category::CompositeLit => "CompositeLit",
            Category::PtrCompare => "PtrCompare",
            Category::UnsafeCall => "UnsafeCall",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single position in a Go source file (1-based row/column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

/// Span in a Go source file (1-based row/column positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Construct a `Span` from a tree-sitter range, converting to 1-based
    /// positions.
    #[must_use]
    pub fn from_range(range: Range) -> Self {
        Self {
            start: Position {
                row: range.start_point.row + 1,
                column: range.start_point.column + 1,
            },
            end: Position {
                row: range.end_point.row + 1,
                column: range.end_point.column + 1,
            },
        }
    }
}

/// One offending `&ident` site within a single range statement's diagnostic
/// group (§4.6 "Reporting": "All diagnostics for the same range
/// statement are grouped into a single high-level report whose `Related`
/// field carries one entry per offending site.").
#[derive(Debug, Clone)]
pub struct RelatedSite {
    pub span: Span,
    pub category: Category,
    pub reason: String,
}

/// A single finding produced by the range-loop checker.
///
/// `span` and `loop_var` anchor the diagnostic to the `range` statement and
/// the loop-induction variable it binds; `related` carries one entry per
/// offending `&ident` use inside that loop (§3 "Range-loop site",
/// §4.6 "Reporting").
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub file: Option<String>,
    pub range_span: Span,
    pub loop_var: String,
    pub related: Vec<RelatedSite>,
}

impl Diagnostic {
    pub fn new(range_span: Span, loop_var: impl Into<String>) -> Self {
        Self {
            file: None,
            range_span,
            loop_var: loop_var.into(),
            related: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Categories present in this diagnostic's related sites, deduplicated
    /// and in first-seen order. Used to enforce the "at most one report per
    /// category per parameter" invariant (§3, §8 property 4).
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::new();
        for site in &self.related {
            if !seen.contains(&site.category) {
                seen.push(site.category);
            }
        }
        seen
    }
}
