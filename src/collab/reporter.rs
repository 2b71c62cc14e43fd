//! Issue filing: turn a diagnostic into a content-hashed finding, skip it if
//! already on file, and otherwise open (or update) a GitHub issue.

use crate::collab::github::GitHubClient;
use crate::collab::store::{FindingId, FindingRecord, IssueRecord, Store};
use crate::diagnostics::{Diagnostic, Span};
use crate::error::Result;

/// The exact source text a diagnostic's range statement spans, used as the
/// content-hash input for de-duplication.
pub fn quote_for(source: &str, span: &Span) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = span.start.row.saturating_sub(1).min(lines.len() - 1);
    let end = span.end.row.saturating_sub(1).min(lines.len() - 1);
    lines[start..=end].join("\n")
}

pub fn md5_of_quote(quote: &str) -> String {
    format!("{:x}", md5::compute(quote.as_bytes()))
}

fn issue_title(diagnostic: &Diagnostic) -> String {
    format!(
        "range-loop hazard: `{}` escapes its iteration",
        diagnostic.loop_var
    )
}

fn issue_body(diagnostic: &Diagnostic, filepath: &str) -> String {
    let mut body = format!(
        "`{}` in `{}` (line {}) is bound by a `for ... range` clause and has its \
         address taken somewhere that may outlive the iteration.\n\nOffending sites:\n",
        diagnostic.loop_var, filepath, diagnostic.range_span.start.row
    );
    for site in &diagnostic.related {
        body.push_str(&format!(
            "- [{}] line {}: {}\n",
            site.category, site.span.start.row, site.reason
        ));
    }
    body
}

/// Record `diagnostic` as a finding and file an issue for it, unless its
/// content hash is already on file for this repository and commit.
///
/// Returns `None` when the finding was a duplicate (no issue filed).
pub async fn report_diagnostic(
    store: &Store,
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    root_commit: &str,
    filepath: &str,
    source: &str,
    diagnostic: &Diagnostic,
) -> Result<Option<FindingId>> {
    let quote = quote_for(source, &diagnostic.range_span);
    let categories: Vec<&str> = diagnostic
        .categories()
        .iter()
        .map(|c| c.as_str())
        .collect();
    let reasons: Vec<&str> = diagnostic.related.iter().map(|s| s.reason.as_str()).collect();

    let record = FindingRecord {
        owner: owner.to_string(),
        repo: repo.to_string(),
        filepath: filepath.to_string(),
        root_commit: root_commit.to_string(),
        md5_of_quote: md5_of_quote(&quote),
        start_line: diagnostic.range_span.start.row as u32,
        end_line: diagnostic.range_span.end.row as u32,
        category: categories.join(","),
        reason: reasons.join(";"),
    };

    let Some(finding_id) = store.insert_finding(&record)? else {
        return Ok(None);
    };

    let issue_number = github
        .file_issue(owner, repo, &issue_title(diagnostic), &issue_body(diagnostic, filepath))
        .await?;

    store.record_issue(&IssueRecord {
        finding_id: finding_id.0,
        owner: owner.to_string(),
        repo: repo.to_string(),
        issue_number: issue_number as i64,
    })?;

    Ok(Some(finding_id))
}

/// File every diagnostic produced for one package, skipping duplicates.
pub async fn report_package(
    store: &Store,
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    root_commit: &str,
    sources: &std::collections::HashMap<String, String>,
    diagnostics: &[Diagnostic],
) -> Result<usize> {
    let mut filed = 0;
    for diagnostic in diagnostics {
        let Some(filepath) = diagnostic.file.as_deref() else {
            continue;
        };
        let Some(source) = sources.get(filepath) else {
            continue;
        };
        if report_diagnostic(store, github, owner, repo, root_commit, filepath, source, diagnostic)
            .await?
            .is_some()
        {
            filed += 1;
        }
    }
    Ok(filed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Category, Position, RelatedSite};

    fn span(start: usize, end: usize) -> Span {
        Span {
            start: Position { row: start, column: 1 },
            end: Position { row: end, column: 1 },
        }
    }

    #[test]
    fn quote_extracts_exact_line_range() {
        let source = "line1\nline2\nline3\nline4\n";
        let quote = quote_for(source, &span(2, 3));
        assert_eq!(quote, "line2\nline3");
    }

    #[test]
    fn md5_is_deterministic_and_sensitive_to_content() {
        let a = md5_of_quote("for _, x := range xs {");
        let b = md5_of_quote("for _, x := range xs {");
        let c = md5_of_quote("for _, y := range ys {");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn issue_body_lists_every_related_site() {
        let mut diag = Diagnostic::new(span(5, 9), "x");
        diag.related.push(RelatedSite {
            span: span(6, 6),
            category: Category::CompositeLit,
            reason: "CompositeLit".to_string(),
        });
        diag.related.push(RelatedSite {
            span: span(8, 8),
            category: Category::UnsafeCall,
            reason: "WritesInput".to_string(),
        });
        let body = issue_body(&diag, "pkg/run.go");
        assert!(body.contains("line 6"));
        assert!(body.contains("line 8"));
        assert!(body.contains("WritesInput"));
    }
}
