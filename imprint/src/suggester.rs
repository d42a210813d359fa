//! Policy suggestion generation from detected patterns.
//!
//! Maps detected patterns onto the charter rule schema: deterministic ids per
//! category, severity derived from confidence, rationale built from the
//! evidence. Suggestions are surfaced for manual charter edits only.

use std::collections::HashMap;

use crate::models::{
    CorrectionPattern, ImplicitPattern, PatternConfidence, PolicySuggestion, SourcePattern,
    StylePreference, SuggestionSeverity,
};

/// Rationale embeds at most this many characters of the first evidence
/// snippet.
const RATIONALE_EVIDENCE_CHARS: usize = 100;

fn correction_policy_category(category: &str) -> &'static str {
    match category {
        "type_hints" | "imports" | "naming" | "testing" | "formatting" => "code_quality",
        "docstrings" => "documentation",
        _ => "workflow",
    }
}

fn style_policy_category(_preference: &str) -> &'static str {
    // All stated style preferences concern how responses are written.
    "documentation"
}

/// Fixed id prefix per policy category.
fn policy_prefix(category: &str) -> &'static str {
    match category {
        "code_quality" => "QUAL",
        "documentation" => "DOCU",
        _ => "WORK",
    }
}

fn severity_for(confidence: PatternConfidence) -> SuggestionSeverity {
    match confidence {
        PatternConfidence::High => SuggestionSeverity::Required,
        PatternConfidence::Medium => SuggestionSeverity::Recommended,
        PatternConfidence::Low => SuggestionSeverity::Info,
    }
}

fn correction_description(pattern: &CorrectionPattern) -> String {
    match pattern.category.as_str() {
        "type_hints" => "Use modern type hints consistently".to_string(),
        "imports" => "Follow import organization conventions".to_string(),
        "docstrings" => "Write docstrings following project style".to_string(),
        "naming" => "Follow naming conventions for variables and functions".to_string(),
        "testing" => "Write tests following project testing patterns".to_string(),
        "formatting" => "Follow code formatting guidelines".to_string(),
        "general" => "Follow project coding conventions".to_string(),
        _ => pattern.description.clone(),
    }
}

fn style_description(pref: &StylePreference) -> String {
    match pref.preference.as_str() {
        "concise" => "Keep responses concise and focused on code".to_string(),
        "verbose" => "Provide detailed explanations with code".to_string(),
        "code_first" => "Show code before explanations".to_string(),
        _ => pref.description.clone(),
    }
}

fn char_truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_rationale(occurrences: usize, evidence: &[String]) -> String {
    let mut rationale =
        format!("Detected {occurrences} instance(s) of this pattern in session history.");
    if let Some(first) = evidence.first() {
        let quote = char_truncate(first, RATIONALE_EVIDENCE_CHARS);
        rationale.push_str(&format!(" Example: \"{quote}...\""));
    }
    rationale
}

/// Configuration for suggestion generation.
#[derive(Debug, Clone, Copy)]
pub struct SuggesterConfig {
    /// Patterns below this confidence are ignored.
    pub min_confidence: PatternConfidence,
    /// Attach the first evidence snippet as an example.
    pub include_examples: bool,
    /// Upper bound on returned suggestions.
    pub max_suggestions: usize,
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            min_confidence: PatternConfidence::Low,
            include_examples: true,
            max_suggestions: 10,
        }
    }
}

/// Generates policy suggestions from detected patterns.
///
/// Id counters are owned by the instance, so separate runs never leak
/// sequence numbers into each other.
pub struct PolicySuggester {
    config: SuggesterConfig,
    next_id: HashMap<String, u32>,
}

impl PolicySuggester {
    pub fn new(config: SuggesterConfig) -> Self {
        Self {
            config,
            next_id: HashMap::new(),
        }
    }

    /// Generate suggestions from all detected patterns, sorted by severity
    /// rank and truncated to the configured maximum.
    pub fn generate_suggestions(
        &mut self,
        corrections: &[CorrectionPattern],
        style_prefs: &[StylePreference],
        implicit: &[ImplicitPattern],
    ) -> Vec<PolicySuggestion> {
        let mut suggestions: Vec<PolicySuggestion> = Vec::new();

        for pattern in corrections {
            if self.meets_confidence(pattern.confidence) {
                suggestions.push(self.from_correction(pattern));
            }
        }
        for pref in style_prefs {
            if self.meets_confidence(pref.confidence) {
                suggestions.push(self.from_style(pref));
            }
        }
        for pattern in implicit {
            if self.meets_confidence(pattern.confidence)
                && let Some(suggestion) = self.from_implicit(pattern)
            {
                suggestions.push(suggestion);
            }
        }

        suggestions.sort_by_key(|s| s.severity.rank());
        suggestions.truncate(self.config.max_suggestions);
        suggestions
    }

    fn meets_confidence(&self, confidence: PatternConfidence) -> bool {
        confidence >= self.config.min_confidence
    }

    /// Next sequential id for a category's 4-letter prefix, zero-padded to
    /// 3 digits (`QUAL-001`, `QUAL-002`, ...).
    fn next_policy_id(&mut self, category: &str) -> String {
        let prefix = policy_prefix(category);
        let counter = self.next_id.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{prefix}-{counter:03}")
    }

    fn example_from(&self, evidence: &[String]) -> Option<String> {
        if self.config.include_examples {
            evidence.first().cloned()
        } else {
            None
        }
    }

    fn from_correction(&mut self, pattern: &CorrectionPattern) -> PolicySuggestion {
        let category = correction_policy_category(&pattern.category);
        PolicySuggestion {
            suggested_id: self.next_policy_id(category),
            severity: severity_for(pattern.confidence),
            description: correction_description(pattern),
            rationale: build_rationale(pattern.occurrences, &pattern.evidence),
            example: self.example_from(&pattern.evidence),
            source_pattern: SourcePattern::Correction(pattern.clone()),
        }
    }

    fn from_style(&mut self, pref: &StylePreference) -> PolicySuggestion {
        let category = style_policy_category(&pref.preference);
        PolicySuggestion {
            suggested_id: self.next_policy_id(category),
            severity: severity_for(pref.confidence),
            description: style_description(pref),
            rationale: build_rationale(pref.occurrences, &pref.evidence),
            example: self.example_from(&pref.evidence),
            source_pattern: SourcePattern::Style(pref.clone()),
        }
    }

    fn from_implicit(&mut self, pattern: &ImplicitPattern) -> Option<PolicySuggestion> {
        // Policy references point at rules that already exist; they never
        // generate new suggestions.
        if pattern.pattern_type == "policy_reference" {
            return None;
        }

        Some(PolicySuggestion {
            suggested_id: self.next_policy_id("workflow"),
            severity: severity_for(pattern.confidence),
            description: pattern.description.clone(),
            rationale: build_rationale(pattern.occurrences, &pattern.evidence),
            example: self.example_from(&pattern.evidence),
            source_pattern: SourcePattern::Implicit(pattern.clone()),
        })
    }

    /// Render one suggestion as a charter-compatible YAML list item.
    pub fn to_yaml_snippet(suggestion: &PolicySuggestion) -> String {
        let mut lines = vec![
            format!("  - id: {}", suggestion.suggested_id),
            format!("    severity: {}", suggestion.severity),
            format!("    description: {}", suggestion.description),
        ];

        if let Some(example) = &suggestion.example {
            let escaped = example.replace('"', "\\\"");
            lines.push(format!(
                "    example: \"{}\"",
                char_truncate(&escaped, RATIONALE_EVIDENCE_CHARS)
            ));
        }

        lines.join("\n")
    }

    /// Render all suggestions as one YAML block ready for manual copy into
    /// the charter.
    pub fn to_yaml_snippets(suggestions: &[PolicySuggestion]) -> String {
        if suggestions.is_empty() {
            return "# No policy suggestions generated".to_string();
        }

        let snippets: Vec<String> = suggestions.iter().map(Self::to_yaml_snippet).collect();
        format!("rules:\n{}", snippets.join("\n\n"))
    }
}

impl Default for PolicySuggester {
    fn default() -> Self {
        Self::new(SuggesterConfig::default())
    }
}
