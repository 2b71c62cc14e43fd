//! End-to-end snapshots over the literal scenarios from §8
//! "Testable properties / end-to-end scenarios". Each fixture runs the
//! full pipeline (parse -> base-case analyzers -> propagator -> range-loop
//! checker) and snapshots the formatted diagnostics, in the style of
//! `tests/fixtures_snapshots.rs`'s `format_diags` + `assert_snapshot!`
//! shape.

use insta::assert_snapshot;
use vetbot::analysis::acceptlist::AcceptList;
use vetbot::analysis::pipeline::{analyze_package, CancellationToken, SourceFile};
use vetbot::diagnostics::Diagnostic;

fn format_diags(diags: &[Diagnostic]) -> String {
    let mut lines: Vec<String> = diags
        .iter()
        .flat_map(|d| {
            d.related.iter().map(move |site| {
                format!(
                    "{}:{}: range `{}`: {}: {}",
                    d.file.as_deref().unwrap_or("<unknown>"),
                    site.span.start.row,
                    d.loop_var,
                    site.category,
                    site.reason,
                )
            })
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

fn run(src: &str, accept_src: &str) -> String {
    let files = vec![SourceFile {
        name: "fixture.go".to_string(),
        source: src.to_string(),
    }];
    let accept = AcceptList::parse(accept_src).expect("valid accept-list");
    let diags = analyze_package(&files, &accept, &CancellationToken::new()).expect("analysis should succeed");
    format_diags(&diags)
}

#[test]
fn direct_unsafe_call_reports_writes_input() {
    let src = "package p\n\ntype A struct{}\n\nfunc f(a *A) {\n\tfor _, z := range []int{1} {\n\t\tvar y int\n\t\ta.unsafeWrites(&z, &y)\n\t}\n}\n\nfunc (a *A) unsafeWrites(x, y *int) *int {\n\tvar r *int\n\tr = x\n\treturn r\n}\n";
    assert_snapshot!(run(src, "accept: {}\n"), @"fixture.go:8: range `z`: UnsafeCall: WritesInput");
}

#[test]
fn spawned_goroutine_reports_captures_async() {
    let src = "package p\n\nfunc f() {\n\tfor _, x := range []int{1, 2} {\n\t\tunsafeAsync(&x)\n\t}\n}\n\nfunc unsafeAsync(x *int) {\n\tgo func() { *x = 3 }()\n}\n";
    assert_snapshot!(run(src, "accept: {}\n"), @"fixture.go:5: range `x`: UnsafeCall: CapturesAsync");
}

#[test]
fn accept_listed_call_is_clean() {
    let src = "package p\n\nimport \"fmt\"\n\nfunc f() {\n\tfor _, x := range []int{1, 2, 3} {\n\t\tfmt.Printf(\"%v\", &x)\n\t}\n}\n";
    assert_snapshot!(run(src, "accept:\n  fmt: [Printf]\n"), @"");
}

#[test]
fn composite_literal_trap_is_reported() {
    let src = "package p\n\nfunc f() {\n\tvar y interface{}\n\tfor _, x := range []int{1, 2, 3} {\n\t\ty = UnsafeStruct{&x}\n\t}\n\t_ = y\n}\n";
    assert_snapshot!(run(src, "accept: {}\n"), @"fixture.go:6: range `x`: CompositeLit: composite literal element");
}

#[test]
fn pointer_comparison_trap_is_reported() {
    let src = "package p\n\nfunc f(x *int) {\n\tfor _, z := range []int{2, 3, 4} {\n\t\tif x == &z {\n\t\t\t_ = x\n\t\t}\n\t}\n}\n";
    assert_snapshot!(run(src, "accept: {}\n"), @"fixture.go:5: range `z`: PtrCompare: pointer comparison operand");
}

#[test]
fn safe_assign_then_return_is_exempt() {
    let src = "package p\n\nfunc f(s []int) *int {\n\tvar p *int\n\tfor _, z := range s {\n\t\tp = &z\n\t\treturn p\n\t}\n\treturn nil\n}\n";
    assert_snapshot!(run(src, "accept: {}\n"), @"");
}

#[test]
fn empty_file_produces_no_diagnostics() {
    assert_snapshot!(run("package p\n", "accept: {}\n"), @"");
}
