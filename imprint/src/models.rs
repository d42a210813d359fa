//! Data types for transcript analysis.
//!
//! Sessions and messages are the normalized form every log format parses
//! into; patterns and suggestions are computed fresh per detection run and
//! never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single message in a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A conversation session with an AI coding assistant. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<Message>,
    /// Source tag, e.g. `claude_code` or `augment`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Only the user messages from this session.
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
    }
}

/// Confidence classification derived purely from occurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternConfidence {
    /// 2 occurrences.
    Low,
    /// 3-4 occurrences.
    Medium,
    /// 5+ occurrences.
    High,
}

impl std::fmt::Display for PatternConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A detected pattern of user corrections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionPattern {
    /// Topic bucket, e.g. `type_hints`, `naming`, `general`.
    pub category: String,
    pub description: String,
    pub occurrences: usize,
    pub confidence: PatternConfidence,
    /// Up to 5 correction quotes.
    pub evidence: Vec<String>,
    /// Distinct contributing session ids.
    pub sessions: Vec<String>,
}

/// A detected style preference from user feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePreference {
    /// e.g. `concise`, `verbose`, `code_first`.
    pub preference: String,
    pub description: String,
    pub occurrences: usize,
    pub confidence: PatternConfidence,
    pub evidence: Vec<String>,
    pub sessions: Vec<String>,
}

/// An implicit pattern detected from repeated user behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitPattern {
    /// e.g. `policy_reference`.
    pub pattern_type: String,
    pub description: String,
    /// Occurrences divided by total session count.
    pub frequency: f64,
    pub occurrences: usize,
    pub confidence: PatternConfidence,
    pub evidence: Vec<String>,
}

/// Severity of a suggested policy rule, derived from pattern confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSeverity {
    Critical,
    Required,
    Recommended,
    Info,
}

impl SuggestionSeverity {
    /// Sort rank: critical first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Required => 1,
            Self::Recommended => 2,
            Self::Info => 3,
        }
    }
}

impl std::fmt::Display for SuggestionSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Required => write!(f, "required"),
            Self::Recommended => write!(f, "recommended"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// The pattern a suggestion was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourcePattern {
    Correction(CorrectionPattern),
    Style(StylePreference),
    Implicit(ImplicitPattern),
}

/// A suggested policy rule. Surfaced for manual charter edits, never
/// auto-applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySuggestion {
    /// Deterministic id, e.g. `QUAL-001`.
    pub suggested_id: String,
    pub severity: SuggestionSeverity,
    pub description: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub source_pattern: SourcePattern,
}

/// Complete analysis report for one detection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImprintReport {
    pub sessions_analyzed: usize,
    pub claude_sessions: usize,
    pub augment_sessions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range_end: Option<DateTime<Utc>>,
    pub correction_patterns: Vec<CorrectionPattern>,
    pub style_preferences: Vec<StylePreference>,
    pub implicit_patterns: Vec<ImplicitPattern>,
    pub policy_suggestions: Vec<PolicySuggestion>,
}

impl ImprintReport {
    /// Whether any pattern class surfaced anything.
    pub fn has_patterns(&self) -> bool {
        !self.correction_patterns.is_empty()
            || !self.style_preferences.is_empty()
            || !self.implicit_patterns.is_empty()
    }
}
