//! Root of the `egokit-imprint` library.
//!
//! Mines AI-session transcript logs for correction patterns, style
//! preferences, and implicit policy references, and turns them into policy
//! suggestions compatible with the charter rule schema.
//!
//! Design principles: every suggestion is traceable to evidence, analysis is
//! user-triggered batch work on historical data, and suggestions are never
//! applied automatically.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod detector;
pub mod models;
pub mod parsers;
pub mod report;
pub mod suggester;

pub use detector::{DetectorConfig, PatternDetector};
pub use models::{
    CorrectionPattern, ImplicitPattern, ImprintReport, Message, MessageRole, PatternConfidence,
    PolicySuggestion, Session, SourcePattern, StylePreference, SuggestionSeverity,
};
pub use parsers::{AugmentParser, ClaudeCodeParser, LogParser};
pub use report::build_report;
pub use suggester::{PolicySuggester, SuggesterConfig};
