//! Assembles a full analysis report from parsed sessions.

use crate::detector::PatternDetector;
use crate::models::{ImprintReport, Session};
use crate::suggester::PolicySuggester;

/// Run detection and suggestion over `sessions` and collect the results.
///
/// The suggester is taken by value so its id counters are scoped to exactly
/// one report.
pub fn build_report(
    sessions: &[Session],
    detector: &PatternDetector,
    mut suggester: PolicySuggester,
) -> ImprintReport {
    let (corrections, style_prefs, implicit) = detector.detect_all(sessions);
    let suggestions = suggester.generate_suggestions(&corrections, &style_prefs, &implicit);

    let date_range_start = sessions.iter().filter_map(|s| s.start_time).min();
    let date_range_end = sessions.iter().filter_map(|s| s.end_time).max();

    ImprintReport {
        sessions_analyzed: sessions.len(),
        claude_sessions: sessions.iter().filter(|s| s.source == "claude_code").count(),
        augment_sessions: sessions.iter().filter(|s| s.source == "augment").count(),
        date_range_start,
        date_range_end,
        correction_patterns: corrections,
        style_preferences: style_prefs,
        implicit_patterns: implicit,
        policy_suggestions: suggestions,
    }
}
