//! End-to-end tests: transcript logs on disk → patterns → suggestion YAML.

use egokit_imprint::{
    AugmentParser, ClaudeCodeParser, LogParser, PatternConfidence, PatternDetector,
    PolicySuggester, SuggesterConfig, build_report,
};
use serde_json::json;
use tempfile::TempDir;

fn user_line(content: &str) -> String {
    json!({"type": "human", "message": {"content": content}}).to_string()
}

fn assistant_line(content: &str) -> String {
    json!({"type": "assistant", "message": {"content": content}}).to_string()
}

#[test]
fn jsonl_logs_to_suggestions_pipeline() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("session-1.jsonl");
    let lines = [
        user_line("Add a function to parse the config"),
        assistant_line("Here is the function."),
        user_line("No, use snake_case for the helper"),
        assistant_line("Renamed."),
        user_line("Actually, snake_case please, for the variable too"),
    ];
    std::fs::write(&log, lines.join("\n")).expect("write log");

    let sessions = ClaudeCodeParser.parse(&log);
    assert_eq!(sessions.len(), 1);

    let report = build_report(
        &sessions,
        &PatternDetector::default(),
        PolicySuggester::default(),
    );

    assert_eq!(report.sessions_analyzed, 1);
    assert_eq!(report.claude_sessions, 1);
    assert_eq!(report.correction_patterns.len(), 1);

    let pattern = &report.correction_patterns[0];
    assert_eq!(pattern.category, "naming");
    assert_eq!(pattern.occurrences, 2);
    assert_eq!(pattern.confidence, PatternConfidence::Low);

    assert_eq!(report.policy_suggestions.len(), 1);
    let suggestion = &report.policy_suggestions[0];
    assert_eq!(suggestion.suggested_id, "QUAL-001");

    let yaml = PolicySuggester::to_yaml_snippets(&report.policy_suggestions);
    assert!(yaml.starts_with("rules:"));
    assert!(yaml.contains("- id: QUAL-001"));
    assert!(yaml.contains("severity: info"));
}

#[test]
fn assistant_messages_never_produce_patterns() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("session-2.jsonl");
    // The assistant says correction-like things; only user text may count.
    let lines = [
        assistant_line("No, use snake_case"),
        assistant_line("Actually, snake_case please"),
        user_line("Looks good, thanks"),
    ];
    std::fs::write(&log, lines.join("\n")).expect("write log");

    let sessions = ClaudeCodeParser.parse(&log);
    let detector = PatternDetector::default();
    assert!(detector.detect_corrections(&sessions).is_empty());
}

#[test]
fn augment_export_feeds_same_detector() {
    let dir = TempDir::new().expect("temp dir");
    let export = dir.path().join("export.json");
    std::fs::write(
        &export,
        json!({
            "conversation": {
                "chatHistory": [
                    {"request_message": "Be concise", "response_text": "Sure."},
                    {"request_message": "Keep it short", "response_text": "OK."}
                ]
            }
        })
        .to_string(),
    )
    .expect("write export");

    let discovered = AugmentParser.discover(dir.path());
    assert_eq!(discovered.len(), 1);

    let sessions = AugmentParser.parse(&discovered[0]);
    let report = build_report(
        &sessions,
        &PatternDetector::default(),
        PolicySuggester::default(),
    );

    assert_eq!(report.augment_sessions, 1);
    assert_eq!(report.style_preferences.len(), 1);
    assert_eq!(report.style_preferences[0].preference, "concise");
    assert_eq!(report.policy_suggestions[0].suggested_id, "DOCU-001");
}

#[test]
fn policy_reference_mentions_surface_but_never_suggest() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("session-3.jsonl");
    let lines: Vec<String> = (0..6)
        .map(|i| user_line(&format!("Remember SEC-001 applies to change {i}")))
        .collect();
    std::fs::write(&log, lines.join("\n")).expect("write log");

    let sessions = ClaudeCodeParser.parse(&log);
    let report = build_report(
        &sessions,
        &PatternDetector::default(),
        PolicySuggester::default(),
    );

    assert_eq!(report.implicit_patterns.len(), 1);
    assert_eq!(report.implicit_patterns[0].confidence, PatternConfidence::High);
    // High confidence, many occurrences, and still no suggestion.
    assert!(report.policy_suggestions.is_empty());
}

#[test]
fn max_suggestions_bounds_the_output() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("session-4.jsonl");
    let mut lines = Vec::new();
    for _ in 0..3 {
        lines.push(user_line("No, add type annotations here"));
        lines.push(user_line("No, fix the import ordering in this module"));
        lines.push(user_line("No, the docstring style is google style"));
    }
    std::fs::write(&log, lines.join("\n")).expect("write log");

    let sessions = ClaudeCodeParser.parse(&log);
    let detector = PatternDetector::default();
    let (corrections, styles, implicit) = detector.detect_all(&sessions);
    assert!(corrections.len() >= 2);

    let mut suggester = PolicySuggester::new(SuggesterConfig {
        max_suggestions: 2,
        ..SuggesterConfig::default()
    });
    let suggestions = suggester.generate_suggestions(&corrections, &styles, &implicit);
    assert_eq!(suggestions.len(), 2);
}
