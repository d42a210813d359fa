//! `ego imprint` — analyze session transcripts and suggest policy rules.
//!
//! Output goes to stdout only; the charter is never written.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use egokit_imprint::{
    AugmentParser, ClaudeCodeParser, LogParser, PatternConfidence, PatternDetector,
    PolicySuggester, Session, SuggesterConfig, build_report,
};

#[derive(Debug, Subcommand)]
pub enum ImprintSubcommand {
    /// Scan session logs for correction patterns and suggest policy rules
    Scan(ScanArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfidenceArg {
    Low,
    Medium,
    High,
}

impl From<ConfidenceArg> for PatternConfidence {
    fn from(value: ConfidenceArg) -> Self {
        match value {
            ConfidenceArg::Low => PatternConfidence::Low,
            ConfidenceArg::Medium => PatternConfidence::Medium,
            ConfidenceArg::High => PatternConfidence::High,
        }
    }
}

#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Claude Code log root (defaults to ~/.claude/projects)
    #[arg(long)]
    pub claude_logs: Option<PathBuf>,

    /// Directory of Augment JSON exports
    #[arg(long)]
    pub augment_logs: Option<PathBuf>,

    /// Minimum pattern confidence to turn into a suggestion
    #[arg(long, value_enum, default_value_t = ConfidenceArg::Low)]
    pub min_confidence: ConfidenceArg,

    /// Maximum number of suggestions to print
    #[arg(long, default_value_t = 10)]
    pub max_suggestions: usize,
}

pub fn run(subcommand: ImprintSubcommand) -> Result<()> {
    match subcommand {
        ImprintSubcommand::Scan(args) => scan(args),
    }
}

fn collect_sessions(args: &ScanArgs) -> Vec<Session> {
    let mut sessions = Vec::new();

    let claude_root = args.claude_logs.clone().or_else(ClaudeCodeParser::default_root);
    if let Some(root) = claude_root {
        let parser = ClaudeCodeParser;
        for path in parser.discover(&root) {
            sessions.extend(parser.parse(&path));
        }
    }

    if let Some(root) = &args.augment_logs {
        let parser = AugmentParser;
        for path in parser.discover(root) {
            sessions.extend(parser.parse(&path));
        }
    }

    sessions
}

fn scan(args: ScanArgs) -> Result<()> {
    let sessions = collect_sessions(&args);
    if sessions.is_empty() {
        println!("No sessions found to analyze");
        return Ok(());
    }

    let report = build_report(
        &sessions,
        &PatternDetector::default(),
        PolicySuggester::new(SuggesterConfig {
            min_confidence: args.min_confidence.into(),
            include_examples: true,
            max_suggestions: args.max_suggestions,
        }),
    );

    println!("Imprint analysis");
    println!(
        "  Sessions analyzed: {} ({} Claude Code, {} Augment)",
        report.sessions_analyzed, report.claude_sessions, report.augment_sessions
    );

    if !report.correction_patterns.is_empty() {
        println!("\nCorrection patterns:");
        for pattern in &report.correction_patterns {
            println!(
                "  [{}] {} — {} occurrence(s) across {} session(s)",
                pattern.confidence,
                pattern.description,
                pattern.occurrences,
                pattern.sessions.len()
            );
        }
    }

    if !report.style_preferences.is_empty() {
        println!("\nStyle preferences:");
        for pref in &report.style_preferences {
            println!(
                "  [{}] {} — {} occurrence(s)",
                pref.confidence, pref.description, pref.occurrences
            );
        }
    }

    if !report.implicit_patterns.is_empty() {
        println!("\nImplicit patterns:");
        for pattern in &report.implicit_patterns {
            println!(
                "  [{}] {} — {} occurrence(s), frequency {:.2}",
                pattern.confidence, pattern.description, pattern.occurrences, pattern.frequency
            );
        }
    }

    if report.policy_suggestions.is_empty() {
        println!("\nNo policy suggestions met the confidence threshold");
    } else {
        println!("\nSuggested charter additions (copy manually into charter.yaml):\n");
        println!(
            "{}",
            PolicySuggester::to_yaml_snippets(&report.policy_suggestions)
        );
    }

    Ok(())
}
