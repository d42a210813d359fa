//! Core data types for the policy engine.
//!
//! A charter declares versioned, hierarchical scopes of policy rules; an ego
//! configuration calibrates agent behavior. Both are loaded from YAML by the
//! registry and merged across scopes before compilation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

// Patterns are compile-time constants; a failed compile is a programmer error.
#[allow(clippy::expect_used)]
static RULE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,6}-\d{3}$").expect("valid rule id pattern"));

#[allow(clippy::expect_used)]
static DETECTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_.]+\.v\d+$").expect("valid detector pattern"));

#[allow(clippy::expect_used)]
static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[a-zA-Z0-9\-]+)?(?:\+[a-zA-Z0-9\-]+)?$")
        .expect("valid semver pattern")
});

/// Policy rule severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single policy rule with enforcement metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique identifier, format `PREFIX-NNN` (e.g. `SEC-001`).
    pub id: String,
    /// Human-readable rule description.
    pub rule: String,
    /// Enforcement severity level.
    pub severity: Severity,
    /// Detector module reference, format `name.vN` (e.g. `secret.regex.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,
    /// Whether an auto-fix is available.
    #[serde(default)]
    pub auto_fix: bool,
    /// Example of a rule violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_violation: Option<String>,
    /// Example of a correct implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_fix: Option<String>,
    /// Free-form categorization tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PolicyRule {
    /// Check field-level format constraints.
    pub fn validate(&self) -> Result<()> {
        if !RULE_ID_RE.is_match(&self.id) {
            return Err(RegistryError::Validation {
                field: "id".into(),
                message: format!(
                    "Rule ID must follow format PREFIX-NNN (e.g. SEC-001), got '{}'",
                    self.id
                ),
            });
        }
        if let Some(detector) = &self.detector
            && !DETECTOR_RE.is_match(detector)
        {
            return Err(RegistryError::Validation {
                field: "detector".into(),
                message: format!(
                    "Detector must follow format name.vN (e.g. secret.regex.v1), got '{detector}'"
                ),
            });
        }
        Ok(())
    }

    /// Whether the rule carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Validate a strict `MAJOR.MINOR.PATCH[-pre][+build]` version string.
pub fn validate_semver(version: &str) -> Result<()> {
    if !SEMVER_RE.is_match(version) {
        return Err(RegistryError::Validation {
            field: "version".into(),
            message: format!(
                "Version must follow semantic versioning (e.g. 1.2.0), got '{version}'"
            ),
        });
    }
    Ok(())
}

/// Rules defined at a single scope level, grouped by category.
///
/// Category names are organizational only; nothing downstream keys on them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeRules {
    #[serde(default)]
    pub security: Vec<PolicyRule>,
    #[serde(default)]
    pub code_quality: Vec<PolicyRule>,
    #[serde(default)]
    pub docs: Vec<PolicyRule>,
    #[serde(default)]
    pub licensing: Vec<PolicyRule>,
    #[serde(default)]
    pub additional_rules: Vec<PolicyRule>,
}

impl ScopeRules {
    /// All rules from this scope in category order.
    pub fn all_rules(&self) -> Vec<&PolicyRule> {
        self.security
            .iter()
            .chain(&self.code_quality)
            .chain(&self.docs)
            .chain(&self.licensing)
            .chain(&self.additional_rules)
            .collect()
    }
}

fn default_startup_read() -> Vec<String> {
    vec!["PROGRESS.md".to_string()]
}

fn default_startup_run() -> Vec<String> {
    vec!["git status".to_string(), "git log --oneline -5".to_string()]
}

fn default_shutdown_update() -> Vec<String> {
    vec!["PROGRESS.md".to_string()]
}

fn default_progress_file() -> String {
    "PROGRESS.md".to_string()
}

/// Files to read and commands to run when an agent session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartup {
    #[serde(default = "default_startup_read")]
    pub read: Vec<String>,
    #[serde(default = "default_startup_run")]
    pub run: Vec<String>,
}

impl Default for SessionStartup {
    fn default() -> Self {
        Self {
            read: default_startup_read(),
            run: default_startup_run(),
        }
    }
}

/// Files to update (and optionally commit) when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionShutdown {
    #[serde(default = "default_shutdown_update")]
    pub update: Vec<String>,
    #[serde(default)]
    pub commit: bool,
}

impl Default for SessionShutdown {
    fn default() -> Self {
        Self {
            update: default_shutdown_update(),
            commit: false,
        }
    }
}

/// How a context file is maintained across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFileMode {
    #[default]
    Append,
    Replace,
}

/// A file agents keep updated to carry context between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    #[serde(default)]
    pub mode: ContextFileMode,
}

/// Session-continuity configuration: startup/shutdown protocol for agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub startup: SessionStartup,
    #[serde(default)]
    pub shutdown: SessionShutdown,
    #[serde(default)]
    pub context_files: Vec<ContextFile>,
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            startup: SessionStartup::default(),
            shutdown: SessionShutdown::default(),
            context_files: Vec::new(),
            progress_file: default_progress_file(),
        }
    }
}

/// Complete policy charter with versioning and hierarchical scopes.
///
/// Scope values are kept as raw JSON mappings (category name → rule-object
/// list); individual rules are parsed and validated at merge time so one
/// malformed entry cannot poison the whole charter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCharter {
    /// Semantic version of the charter.
    pub version: String,
    /// Scope name → categories → rule objects.
    #[serde(default)]
    pub scopes: BTreeMap<String, serde_json::Value>,
    /// Free-form charter metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optional session-continuity configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,
}

impl PolicyCharter {
    pub fn validate(&self) -> Result<()> {
        validate_semver(&self.version)
    }
}

/// Communication style configuration for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Voice characteristics.
    pub voice: String,
    /// Verbosity level.
    pub verbosity: String,
    /// Ordered formatting preferences.
    #[serde(default)]
    pub formatting: Vec<String>,
}

/// A named operating mode with its own verbosity and focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub verbosity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

/// Agent persona and behavioral configuration ("ego").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoConfig {
    /// Primary role identity.
    pub role: String,
    /// Communication style.
    pub tone: ToneConfig,
    /// Default behavioral patterns.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Review criteria checklist.
    #[serde(default)]
    pub reviewer_checklist: Vec<String>,
    /// Scenarios requiring user clarification.
    #[serde(default)]
    pub ask_when_unsure: Vec<String>,
    /// Named operating modes.
    #[serde(default)]
    pub modes: BTreeMap<String, ModeConfig>,
}

/// On-disk shape of a per-scope ego file: version header plus the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgoCharter {
    pub version: String,
    pub ego: EgoConfig,
}

impl EgoCharter {
    pub fn validate(&self) -> Result<()> {
        validate_semver(&self.version)
    }
}

/// Everything the artifact compiler needs for one run.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    /// Target repository path.
    pub target_repo: PathBuf,
    /// Loaded charter (for version, metadata, session config).
    pub charter: PolicyCharter,
    /// Effective merged ego configuration.
    pub ego: EgoConfig,
    /// Highest-precedence scope name.
    pub active_scope: String,
    /// When compilation occurred.
    pub generated_at: DateTime<Utc>,
}
