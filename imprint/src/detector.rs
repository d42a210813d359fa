//! Heuristic pattern detection over normalized session transcripts.
//!
//! Three independent passes over the user-message stream: explicit
//! corrections, stated style preferences, and implicit policy-id references.
//! No ML, no embeddings; pure regex and frequency analysis.

use std::collections::BTreeMap;

use regex_lite::Regex;

use crate::models::{
    CorrectionPattern, ImplicitPattern, PatternConfidence, Session, StylePreference,
};

/// Sentence-opening phrases that signal the user is correcting the assistant.
const CORRECTION_INDICATORS: &[&str] = &[
    r"(?i)^no[,.]?\s",
    r"(?i)^actually[,.]?\s",
    r"(?i)^that'?s?\s+not\s+(right|correct|what)",
    r"(?i)^i\s+said\s+to",
    r"(?i)^don'?t\s+(?:do|use)",
    r"(?i)^use\s+\w+\s+(?:not|instead)",
    r"(?i)^not\s+\w+,\s*(?:use|try)",
    r"(?i)^please\s+(?:don'?t|stop)",
    r"(?i)^i\s+(?:wanted|meant|asked)",
    r"(?i)^wrong[,.]",
    r"(?i)^nope[,.]",
];

/// Style-preference banks; a message counts for at most one category.
const STYLE_PATTERNS: &[(&str, &[&str])] = &[
    (
        "concise",
        &[
            r"(?i)^be\s+(?:more\s+)?concise",
            r"(?i)^too\s+(?:verbose|long|wordy)",
            r"(?i)shorter\s+(?:response|answer|explanation)",
            r"(?i)skip\s+(?:the\s+)?explanation",
            r"(?i)^just\s+(?:show|give)\s+(?:me\s+)?(?:the\s+)?code",
            r"(?i)keep\s+it\s+(?:short|brief)",
        ],
    ),
    (
        "verbose",
        &[
            r"(?i)^(?:i\s+need\s+)?more\s+detail",
            r"(?i)^explain\s+(?:this\s+)?(?:more|further|better)",
            r"(?i)^too\s+brief",
            r"(?i)^can\s+you\s+elaborate",
            r"(?i)^please\s+explain",
            r"(?i)^i\s+don'?t\s+understand",
        ],
    ),
    (
        "code_first",
        &[
            r"(?i)show\s+(?:me\s+)?(?:the\s+)?code\s+first",
            r"(?i)code\s+before\s+explanation",
            r"(?i)^start\s+with\s+(?:the\s+)?code",
        ],
    ),
];

/// Signatures of system-injected content that must not count as user input.
const SYSTEM_NOISE_PATTERNS: &[&str] = &[
    r"^<supervisor>",
    r"^<user>",
    r"^<agent",
    r"^\s*#\s*(?:AGENTS|Policy|EgoKit)",
    r"^\s*<!--",
];

// The pattern is a compile-time constant; a failed compile is a programmer
// error.
#[allow(clippy::expect_used)]
static POLICY_ID_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{2,6}-\d{3})\b").expect("valid policy id pattern")
});

/// Maximum evidence snippets stored per pattern.
const MAX_EVIDENCE_EXAMPLES: usize = 5;

/// Evidence snippets keep at most this many characters.
const EVIDENCE_SNIPPET_CHARS: usize = 200;

/// Keyword buckets for correction topics; first match wins, `general`
/// otherwise.
const CORRECTION_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "type_hints",
        &["type", "typing", "hint", "annotation", "list[", "dict["],
    ),
    ("imports", &["import", "from ", "module"]),
    (
        "docstrings",
        &["docstring", "documentation", "google style", "numpy style"],
    ),
    (
        "naming",
        &["name", "naming", "snake_case", "camelcase", "variable"],
    ),
    ("testing", &["test", "testing", "pytest", "unittest"]),
    (
        "formatting",
        &["format", "indent", "spacing", "line length"],
    ),
];

/// Occurrence thresholds for detection and confidence classification.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Minimum occurrences for high confidence.
    pub min_occurrences_high: usize,
    /// Minimum occurrences for medium confidence.
    pub min_occurrences_medium: usize,
    /// Minimum occurrences for a pattern to surface at all.
    pub min_occurrences_low: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_occurrences_high: 5,
            min_occurrences_medium: 3,
            min_occurrences_low: 2,
        }
    }
}

fn compile_bank(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!("skipping unparsable pattern '{p}': {err}");
                None
            }
        })
        .collect()
}

/// Truncate to at most `max_chars` characters without splitting a UTF-8
/// sequence.
fn snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Detects correction, style, and implicit patterns in session transcripts.
pub struct PatternDetector {
    config: DetectorConfig,
    correction_patterns: Vec<Regex>,
    style_patterns: Vec<(&'static str, Vec<Regex>)>,
    noise_patterns: Vec<Regex>,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            correction_patterns: compile_bank(CORRECTION_INDICATORS),
            style_patterns: STYLE_PATTERNS
                .iter()
                .map(|(category, patterns)| (*category, compile_bank(patterns)))
                .collect(),
            noise_patterns: compile_bank(SYSTEM_NOISE_PATTERNS),
        }
    }

    fn is_system_noise(&self, text: &str) -> bool {
        self.noise_patterns.iter().any(|p| p.is_match(text))
    }

    /// Real user messages as (content, session id) pairs, noise filtered out.
    fn user_content<'a>(&self, sessions: &'a [Session]) -> Vec<(&'a str, &'a str)> {
        sessions
            .iter()
            .flat_map(|session| {
                session
                    .user_messages()
                    .map(move |msg| (msg.content.as_str(), session.session_id.as_str()))
            })
            .filter(|(content, _)| !self.is_system_noise(content))
            .collect()
    }

    fn confidence(&self, count: usize) -> PatternConfidence {
        if count >= self.config.min_occurrences_high {
            PatternConfidence::High
        } else if count >= self.config.min_occurrences_medium {
            PatternConfidence::Medium
        } else {
            PatternConfidence::Low
        }
    }

    fn is_correction(&self, text: &str) -> bool {
        self.correction_patterns.iter().any(|p| p.is_match(text))
    }

    fn categorize_correction(text: &str) -> &'static str {
        let lower = text.to_lowercase();
        for (category, keywords) in CORRECTION_CATEGORIES {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return category;
            }
        }
        "general"
    }

    /// Detect explicit correction patterns, grouped by topic category.
    pub fn detect_corrections(&self, sessions: &[Session]) -> Vec<CorrectionPattern> {
        let mut by_category: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();

        for (content, session_id) in self.user_content(sessions) {
            if self.is_correction(content) {
                let category = Self::categorize_correction(content);
                by_category
                    .entry(category)
                    .or_default()
                    .push((content, session_id));
            }
        }

        let mut patterns: Vec<CorrectionPattern> = by_category
            .into_iter()
            .filter(|(_, items)| items.len() >= self.config.min_occurrences_low)
            .map(|(category, items)| {
                let count = items.len();
                CorrectionPattern {
                    category: category.to_string(),
                    description: format!(
                        "Corrections about {}",
                        category.replace('_', " ")
                    ),
                    occurrences: count,
                    confidence: self.confidence(count),
                    evidence: collect_evidence(&items),
                    sessions: distinct_sessions(&items),
                }
            })
            .collect();

        patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        patterns
    }

    fn style_description(category: &str) -> String {
        match category {
            "concise" => "Keep responses brief and focused on essential information".to_string(),
            "verbose" => "Provide detailed explanations with context and rationale".to_string(),
            "code_first" => "Show code examples before explanations".to_string(),
            other => format!("Preference for {} style", other.replace('_', " ")),
        }
    }

    /// Detect stated style preferences. A message counts for at most one
    /// category (first match wins).
    pub fn detect_style_preferences(&self, sessions: &[Session]) -> Vec<StylePreference> {
        let mut by_category: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();

        for (content, session_id) in self.user_content(sessions) {
            for (category, patterns) in &self.style_patterns {
                if patterns.iter().any(|p| p.is_match(content)) {
                    by_category
                        .entry(category)
                        .or_default()
                        .push((content, session_id));
                    break;
                }
            }
        }

        let mut results: Vec<StylePreference> = by_category
            .into_iter()
            .filter(|(_, items)| items.len() >= self.config.min_occurrences_low)
            .map(|(category, items)| {
                let count = items.len();
                StylePreference {
                    preference: category.to_string(),
                    description: Self::style_description(category),
                    occurrences: count,
                    confidence: self.confidence(count),
                    evidence: collect_evidence(&items),
                    sessions: distinct_sessions(&items),
                }
            })
            .collect();

        results.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        results
    }

    /// Detect implicit patterns: policy-id tokens mentioned repeatedly in
    /// user text.
    pub fn detect_implicit_patterns(&self, sessions: &[Session]) -> Vec<ImplicitPattern> {
        let mut mentions: BTreeMap<String, usize> = BTreeMap::new();
        let mut evidence: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (content, _session_id) in self.user_content(sessions) {
            for capture in POLICY_ID_RE.captures_iter(content) {
                let Some(policy_id) = capture.get(1) else {
                    continue;
                };
                let policy_id = policy_id.as_str().to_string();
                *mentions.entry(policy_id.clone()).or_insert(0) += 1;
                let examples = evidence.entry(policy_id).or_default();
                if examples.len() < MAX_EVIDENCE_EXAMPLES {
                    examples.push(snippet(content, EVIDENCE_SNIPPET_CHARS));
                }
            }
        }

        let session_count = sessions.len();
        let mut patterns: Vec<ImplicitPattern> = mentions
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_occurrences_low)
            .map(|(policy_id, count)| ImplicitPattern {
                pattern_type: "policy_reference".to_string(),
                description: format!(
                    "User references policy {policy_id} - consider reinforcing"
                ),
                frequency: if session_count > 0 {
                    count as f64 / session_count as f64
                } else {
                    0.0
                },
                occurrences: count,
                confidence: self.confidence(count),
                evidence: evidence.remove(&policy_id).unwrap_or_default(),
            })
            .collect();

        patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        patterns
    }

    /// Run all three passes.
    pub fn detect_all(
        &self,
        sessions: &[Session],
    ) -> (
        Vec<CorrectionPattern>,
        Vec<StylePreference>,
        Vec<ImplicitPattern>,
    ) {
        (
            self.detect_corrections(sessions),
            self.detect_style_preferences(sessions),
            self.detect_implicit_patterns(sessions),
        )
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

fn collect_evidence(items: &[(&str, &str)]) -> Vec<String> {
    items
        .iter()
        .take(MAX_EVIDENCE_EXAMPLES)
        .map(|(quote, _)| snippet(quote, EVIDENCE_SNIPPET_CHARS))
        .collect()
}

fn distinct_sessions(items: &[(&str, &str)]) -> Vec<String> {
    let mut seen = Vec::new();
    for (_, session_id) in items {
        if !seen.iter().any(|s: &String| s == session_id) {
            seen.push((*session_id).to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, MessageRole};

    fn session(id: &str, user_messages: &[&str]) -> Session {
        Session {
            session_id: id.to_string(),
            messages: user_messages
                .iter()
                .map(|content| Message {
                    role: MessageRole::User,
                    content: (*content).to_string(),
                    timestamp: None,
                })
                .collect(),
            source: "test".to_string(),
            project_path: None,
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn single_occurrence_is_excluded() {
        let detector = PatternDetector::default();
        let sessions = vec![session("s1", &["No, use snake_case here"])];
        assert!(detector.detect_corrections(&sessions).is_empty());
    }

    #[test]
    fn naming_correction_scenario_two_occurrences_low() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &["No, use snake_case", "Actually, snake_case please"],
        )];

        let patterns = detector.detect_corrections(&sessions);
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(pattern.category, "naming");
        assert_eq!(pattern.occurrences, 2);
        assert_eq!(pattern.confidence, PatternConfidence::Low);
        assert_eq!(pattern.sessions, vec!["s1"]);
    }

    #[test]
    fn confidence_thresholds_at_exact_counts() {
        let detector = PatternDetector::default();
        let msg = "No, use type hints here";

        for (count, expected) in [
            (2, PatternConfidence::Low),
            (3, PatternConfidence::Medium),
            (4, PatternConfidence::Medium),
            (5, PatternConfidence::High),
        ] {
            let messages: Vec<&str> = std::iter::repeat_n(msg, count).collect();
            let sessions = vec![session("s1", &messages)];
            let patterns = detector.detect_corrections(&sessions);
            assert_eq!(patterns[0].occurrences, count);
            assert_eq!(patterns[0].confidence, expected, "count {count}");
        }
    }

    #[test]
    fn non_correction_messages_ignored() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &["Please add a login page", "Can you write tests for this?"],
        )];
        assert!(detector.detect_corrections(&sessions).is_empty());
    }

    #[test]
    fn corrections_without_prefix_are_not_matched() {
        let detector = PatternDetector::default();
        // "no" appears mid-sentence, not as a correction opener.
        let sessions = vec![session(
            "s1",
            &["There is no reason to worry", "There is no rush at all"],
        )];
        assert!(detector.detect_corrections(&sessions).is_empty());
    }

    #[test]
    fn type_hint_corrections_categorized() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &[
                "No, add type annotations to that function",
                "Actually, the type hint should be Optional",
            ],
        )];
        let patterns = detector.detect_corrections(&sessions);
        assert_eq!(patterns[0].category, "type_hints");
    }

    #[test]
    fn uncategorized_corrections_fall_back_to_general() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &["No, that approach is wrong", "Nope, try again differently"],
        )];
        let patterns = detector.detect_corrections(&sessions);
        assert_eq!(patterns[0].category, "general");
    }

    #[test]
    fn system_noise_is_filtered_before_scanning() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &[
                "<supervisor>No, do the task differently</supervisor>",
                "<!-- No, this is a comment -->",
                "# AGENTS policy header echo",
            ],
        )];
        assert!(detector.detect_corrections(&sessions).is_empty());
    }

    #[test]
    fn style_concise_detected() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &["Be concise please", "Too verbose, keep it short"],
        )];
        let prefs = detector.detect_style_preferences(&sessions);
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].preference, "concise");
        assert_eq!(prefs[0].occurrences, 2);
    }

    #[test]
    fn style_message_counts_for_one_category_only() {
        let detector = PatternDetector::default();
        // Matches both "concise" (just show the code) and "code_first"
        // (show the code first) banks; only the first category may count.
        let sessions = vec![session(
            "s1",
            &[
                "Just show me the code first",
                "Just show me the code first",
            ],
        )];
        let prefs = detector.detect_style_preferences(&sessions);
        assert_eq!(prefs.len(), 1);
    }

    #[test]
    fn implicit_policy_reference_detected_with_frequency() {
        let detector = PatternDetector::default();
        let sessions = vec![
            session("s1", &["Remember SEC-001 applies here"]),
            session("s2", &["Does SEC-001 cover this case?"]),
        ];
        let patterns = detector.detect_implicit_patterns(&sessions);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, "policy_reference");
        assert_eq!(patterns[0].occurrences, 2);
        assert!((patterns[0].frequency - 1.0).abs() < f64::EPSILON);
        assert!(patterns[0].description.contains("SEC-001"));
    }

    #[test]
    fn implicit_single_mention_excluded() {
        let detector = PatternDetector::default();
        let sessions = vec![session("s1", &["Check QUAL-003 once"])];
        assert!(detector.detect_implicit_patterns(&sessions).is_empty());
    }

    #[test]
    fn evidence_capped_at_five_snippets() {
        let detector = PatternDetector::default();
        let messages: Vec<String> = (0..8)
            .map(|i| format!("No, fix the naming of variable number {i}"))
            .collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
        let sessions = vec![session("s1", &refs)];

        let patterns = detector.detect_corrections(&sessions);
        assert_eq!(patterns[0].occurrences, 8);
        assert_eq!(patterns[0].evidence.len(), 5);
    }

    #[test]
    fn evidence_snippets_truncated_to_200_chars() {
        let detector = PatternDetector::default();
        let long = format!("No, rename this variable: {}", "x".repeat(400));
        let sessions = vec![session("s1", &[&long, &long])];

        let patterns = detector.detect_corrections(&sessions);
        assert!(patterns[0].evidence[0].chars().count() <= 200);
    }

    #[test]
    fn detect_all_returns_all_three_classes() {
        let detector = PatternDetector::default();
        let sessions = vec![session(
            "s1",
            &[
                "No, use snake_case",
                "Actually, snake_case please",
                "Be concise",
                "Keep it short",
                "SEC-001 again",
                "SEC-001 once more",
            ],
        )];
        let (corrections, styles, implicit) = detector.detect_all(&sessions);
        assert_eq!(corrections.len(), 1);
        assert_eq!(styles.len(), 1);
        assert_eq!(implicit.len(), 1);
    }
}
