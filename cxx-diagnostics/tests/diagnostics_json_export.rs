use cxx_diagnostics::{Diagnostic, DiagnosticEngine, Span};
use serde_json::Value;

#[test]
fn diagnostics_json_round_trips_through_serde() {
    let mut engine = DiagnosticEngine::new();

    let span = Span::new("main.cpp".to_string(), 2, 5, 3);
    let suggestion_span = span.clone();

    let diag = Diagnostic::error(
        "E0201",
        "cannot find value `foo` in this scope".to_string(),
        span,
    )
    .with_help("did you mean `foo_bar`?".to_string())
    .with_suggestion(
        "rename to foo_bar".to_string(),
        "foo_bar".to_string(),
        suggestion_span,
    );

    engine.emit(diag);

    let json = engine.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    let diagnostics = v["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diagnostics.len(), 1);
    let entry = &diagnostics[0];
    assert_eq!(entry["code"], "E0201");
    assert_eq!(entry["level"], "error");
    assert_eq!(entry["help"], "did you mean `foo_bar`?");
    assert!(entry["message"].as_str().unwrap().contains("foo"));
}
