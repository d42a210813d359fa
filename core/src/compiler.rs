//! Artifact compilation: effective rules + ego config → generated text.
//!
//! The compiler is a pure transformation. It renders the managed policy
//! section for `AGENTS.md`, the slash-command prompt files, and the JSON
//! settings document; it never touches the disk. Writing the results (and
//! asking for confirmation before appending to a marker-less document) is the
//! caller's job.

use std::collections::BTreeMap;

use serde_json::json;

use crate::models::{CompilationContext, PolicyRule, SessionConfig, Severity};
use crate::splice::{EGOKIT_BEGIN_MARKER, EGOKIT_END_MARKER, splice};

/// The eight generated slash commands, in output order.
const SLASH_COMMANDS: &[(&str, &str)] = &[
    ("ego-validate", "Review current work against organizational policy standards"),
    ("ego-rules", "List the active policy rules and their severities"),
    ("ego-stats", "Summarize policy coverage for this repository"),
    ("ego-suggest", "Propose policy refinements based on recent corrections"),
    ("ego-checkpoint", "Verify policy recall and recent compliance"),
    ("ego-review", "Review recent changes against the reviewer checklist"),
    ("ego-security", "Security-focused review with the security policies applied"),
    ("ego-refresh", "Re-read the policy document and re-apply its constraints"),
];

/// Compiles policy and ego configurations into agent-facing artifacts.
pub struct ArtifactCompiler {
    context: CompilationContext,
}

impl ArtifactCompiler {
    pub fn new(context: CompilationContext) -> Self {
        Self { context }
    }

    /// Compile every artifact as a path → content map.
    ///
    /// `existing_agents_md` is the current content of the target `AGENTS.md`,
    /// if any; the managed section is spliced into it. Claude and Augment
    /// receive identical command content under their own directories.
    pub fn compile_all_artifacts(
        &self,
        rules: &[PolicyRule],
        existing_agents_md: Option<&str>,
    ) -> BTreeMap<String, String> {
        let mut artifacts = BTreeMap::new();

        artifacts.insert(
            "AGENTS.md".to_string(),
            self.inject_egokit_section(existing_agents_md, rules),
        );
        artifacts.insert(
            ".claude/settings.json".to_string(),
            self.compile_settings(rules),
        );

        for (name, content) in self.compile_slash_commands() {
            artifacts.insert(format!(".claude/commands/{name}"), content.clone());
            artifacts.insert(format!(".augment/commands/{name}"), content);
        }

        artifacts
    }

    /// Splice the freshly compiled managed section into `existing`.
    ///
    /// Absent `existing` yields the full `AGENTS.md` template; a document
    /// with markers gets its managed region replaced; a document without
    /// markers gets the section appended.
    pub fn inject_egokit_section(
        &self,
        existing: Option<&str>,
        rules: &[PolicyRule],
    ) -> String {
        let section = self.compile_egokit_section(rules);
        let template = self.generate_agents_md_template(rules);
        splice(existing, &section, &template)
    }

    /// Full `AGENTS.md` template for repositories without one: human-editable
    /// placeholder sections around the managed region.
    pub fn generate_agents_md_template(&self, rules: &[PolicyRule]) -> String {
        let section = self.compile_egokit_section(rules);
        let role = &self.context.ego.role;
        format!(
            "# AGENTS.md\n\n\
             Guidance for AI coding agents working in this repository.\n\n\
             ## Project Overview\n\n\
             <!-- Describe the project, its architecture, and key directories here. -->\n\n\
             Agent role for this repository: {role}.\n\n\
             ## Setup Commands\n\n\
             <!-- List the build, test, and lint commands agents should use. -->\n\n\
             {section}\n"
        )
    }

    /// The machine-owned policy section, wrapped in the sentinel markers.
    pub fn compile_egokit_section(&self, rules: &[PolicyRule]) -> String {
        let mut lines: Vec<String> = vec![
            EGOKIT_BEGIN_MARKER.to_string(),
            "<!-- Auto-generated by EgoKit. Do not edit manually; changes here are overwritten on the next apply. -->".to_string(),
            String::new(),
            "## Policy Compliance".to_string(),
            String::new(),
            format!(
                "*Policy version {} — generated {}*",
                self.context.charter.version,
                self.context.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
            ),
            String::new(),
            "The rules below are binding constraints for all work in this repository.".to_string(),
            "When guidance conflicts, these policies take precedence.".to_string(),
            String::new(),
        ];

        self.push_severity_group(
            &mut lines,
            "### Critical (Must Follow)",
            rules,
            Severity::Critical,
        );
        self.push_severity_group(
            &mut lines,
            "### Required (Should Follow)",
            rules,
            Severity::Warning,
        );
        self.push_severity_group(&mut lines, "### Recommended", rules, Severity::Info);

        self.push_security_section(&mut lines, rules);
        self.push_behavior_section(&mut lines);
        if let Some(session) = &self.context.charter.session {
            push_session_section(&mut lines, session);
        }
        self.push_commands_section(&mut lines);

        lines.push(EGOKIT_END_MARKER.to_string());
        lines.join("\n")
    }

    fn push_severity_group(
        &self,
        lines: &mut Vec<String>,
        heading: &str,
        rules: &[PolicyRule],
        severity: Severity,
    ) {
        let group: Vec<&PolicyRule> = rules.iter().filter(|r| r.severity == severity).collect();
        if group.is_empty() {
            return;
        }

        lines.push(heading.to_string());
        lines.push(String::new());
        for rule in group {
            lines.push(format!("- **{}**: {}", rule.id, rule.rule));
            if let (Some(violation), Some(fix)) = (&rule.example_violation, &rule.example_fix) {
                lines.push(format!("  - ❌ `{violation}`"));
                lines.push(format!("  - ✅ `{fix}`"));
            }
        }
        lines.push(String::new());
    }

    fn push_security_section(&self, lines: &mut Vec<String>, rules: &[PolicyRule]) {
        let security: Vec<&PolicyRule> = rules.iter().filter(|r| r.has_tag("security")).collect();
        if security.is_empty() {
            return;
        }

        lines.push("## Security Considerations".to_string());
        lines.push(String::new());
        for rule in security {
            let marker = match rule.severity {
                Severity::Critical => "🔴",
                Severity::Warning => "🟡",
                Severity::Info => "🔵",
            };
            lines.push(format!("- {marker} **{}**: {}", rule.id, rule.rule));
        }
        lines.push(String::new());
    }

    fn push_behavior_section(&self, lines: &mut Vec<String>) {
        let ego = &self.context.ego;

        lines.push("## Agent Behavior Calibration".to_string());
        lines.push(String::new());
        lines.push(format!("**Role:** {}", ego.role));
        lines.push(format!("**Voice:** {}", ego.tone.voice));
        lines.push(format!("**Verbosity:** {}", ego.tone.verbosity));
        lines.push(String::new());

        if !ego.tone.formatting.is_empty() {
            lines.push("**Formatting:**".to_string());
            for pref in &ego.tone.formatting {
                lines.push(format!("- {pref}"));
            }
            lines.push(String::new());
        }

        if !ego.defaults.is_empty() {
            lines.push("### Default Behaviors".to_string());
            for (key, value) in &ego.defaults {
                lines.push(format!("- {key}: {value}"));
            }
            lines.push(String::new());
        }

        if !ego.reviewer_checklist.is_empty() {
            lines.push("### Reviewer Checklist".to_string());
            for item in &ego.reviewer_checklist {
                lines.push(format!("- {item}"));
            }
            lines.push(String::new());
        }

        if !ego.ask_when_unsure.is_empty() {
            lines.push("### Ask Before Proceeding With".to_string());
            for item in &ego.ask_when_unsure {
                lines.push(format!("- {item}"));
            }
            lines.push(String::new());
        }

        if !ego.modes.is_empty() {
            lines.push("### Modes".to_string());
            for (name, mode) in &ego.modes {
                lines.push(format!("- **{name}**: {} verbosity", mode.verbosity));
                if let Some(focus) = &mode.focus {
                    lines.push(format!("  - Focus: {focus}"));
                }
            }
            lines.push(String::new());
        }
    }

    fn push_commands_section(&self, lines: &mut Vec<String>) {
        lines.push("## EgoKit Commands".to_string());
        lines.push(String::new());
        for (name, description) in SLASH_COMMANDS {
            lines.push(format!("- `/{name}` — {description}"));
        }
        lines.push(String::new());
    }

    /// Generate the slash-command prompt files.
    ///
    /// Every command is a pure natural-language prompt with YAML frontmatter
    /// (mandatory `description`) referencing `AGENTS.md`; none contain shell
    /// invocations.
    pub fn compile_slash_commands(&self) -> BTreeMap<String, String> {
        let mut commands = BTreeMap::new();
        for (name, description) in SLASH_COMMANDS {
            commands.insert(format!("{name}.md"), self.command_body(name, description));
        }
        commands
    }

    fn command_body(&self, name: &str, description: &str) -> String {
        let body = match name {
            "ego-validate" => {
                "Read the policy section of AGENTS.md in this repository. Review the \
                 files changed in the current work against each rule, starting with the \
                 Critical group. For every violation you find, name the rule id, the file \
                 and line, and the smallest change that would bring the code into \
                 compliance. Finish with a one-line verdict: compliant, or the count of \
                 violations by severity."
            }
            "ego-rules" => {
                "Read the policy section of AGENTS.md and list every active rule grouped \
                 by severity. For each rule show its id and a one-line summary in your \
                 own words. Flag any rule you believe the current codebase already \
                 violates somewhere."
            }
            "ego-stats" => {
                "Summarize the policy posture of this repository: how many rules are \
                 active per severity, which tags appear most, and which parts of the \
                 codebase have been reviewed against them recently. Keep it to a short \
                 table and three observations."
            }
            "ego-suggest" => {
                "Think back over the corrections you have received in this project. \
                 Propose up to three new policy rules that would have prevented them, \
                 each with an id suggestion, a severity, and a one-line rationale. \
                 Present them for review; do not apply anything."
            }
            "ego-checkpoint" => {
                "Without re-reading anything, state the three most important policies \
                 you are currently operating under. Then open AGENTS.md and check \
                 yourself. If you missed or misstated one, re-read the full policy \
                 section before continuing."
            }
            "ego-review" => {
                "Review the most recent changes against the Reviewer Checklist in \
                 AGENTS.md. Work through the checklist item by item and note pass or \
                 fail with a short justification. End with anything the checklist does \
                 not cover that you would still flag."
            }
            "ego-security" => {
                "Switch to a security-focused review. Apply the Security Considerations \
                 rules from AGENTS.md to the current changes: look for credential \
                 handling, injection risks, and unsafe defaults. Report findings ordered \
                 by severity with the relevant rule id attached."
            }
            "ego-refresh" => {
                "Re-read the policy section of AGENTS.md now and restate, in two or \
                 three sentences, the constraints that apply to your next piece of \
                 work. Use this after the policy registry has been updated."
            }
            _ => "Consult AGENTS.md for the applicable policies before proceeding.",
        };

        format!("---\ndescription: {description}\n---\n\n# /{name}\n\n{body}\n")
    }

    /// Generate `.claude/settings.json` with policy-derived permissions and
    /// behavior flags.
    pub fn compile_settings(&self, rules: &[PolicyRule]) -> String {
        let security_rules: Vec<&PolicyRule> =
            rules.iter().filter(|r| r.has_tag("security")).collect();
        let critical_rules: Vec<&PolicyRule> = rules
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .collect();

        let mut deny: Vec<&str> = Vec::new();
        for rule in &security_rules {
            let text = rule.rule.to_lowercase();
            if text.contains("credential") || text.contains("secret") {
                deny.push("network:external");
                deny.push("env:write");
            }
            if text.contains("https") {
                deny.push("network:http");
            }
        }
        deny.sort_unstable();
        deny.dedup();

        let mut ask: Vec<&str> = vec!["git:push:main", "file:delete:batch"];
        for rule in &critical_rules {
            let text = rule.rule.to_lowercase();
            if text.contains("database") {
                ask.push("database_operations");
            }
            if text.contains("deploy") {
                ask.push("deployment_changes");
            }
            if text.contains("security") {
                ask.push("security_modifications");
            }
        }
        ask.sort_unstable();
        ask.dedup();

        let mut require_examples = false;
        let mut no_superlatives = false;
        let mut no_emojis = false;
        for rule in rules {
            if rule.has_tag("documentation") || rule.has_tag("docs") {
                let text = rule.rule.to_lowercase();
                require_examples |= text.contains("example");
                no_superlatives |= text.contains("superlative");
                no_emojis |= text.contains("emoji");
            }
        }

        let auto_validate = self
            .context
            .ego
            .defaults
            .get("auto_validate")
            .is_some_and(|v| v == "true");

        let settings = json!({
            "permissions": {
                "allow": ["read", "write", "git"],
                "deny": deny,
                "ask": ask,
            },
            "behavior": {
                "security_first": !security_rules.is_empty(),
                "require_confirmation_for_critical": !critical_rules.is_empty(),
                "documentation_standards": {
                    "require_examples": require_examples,
                    "no_superlatives": no_superlatives,
                    "no_emojis": no_emojis,
                },
            },
            "automation": {
                "auto_validate_on_save": auto_validate,
                "suggest_fixes": rules.iter().any(|r| r.auto_fix),
                "remember_preferences": true,
            },
        });

        // json! maps are sorted by key, so the output is deterministic.
        serde_json::to_string_pretty(&settings).unwrap_or_default()
    }
}

fn push_session_section(lines: &mut Vec<String>, session: &SessionConfig) {
    lines.push("## Session Continuity".to_string());
    lines.push(String::new());

    if !session.startup.read.is_empty() {
        lines.push(format!(
            "At session start, read: {}.",
            session.startup.read.join(", ")
        ));
    }
    if !session.startup.run.is_empty() {
        lines.push(format!(
            "Then run: {}.",
            session
                .startup
                .run
                .iter()
                .map(|cmd| format!("`{cmd}`"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !session.shutdown.update.is_empty() {
        lines.push(format!(
            "Before ending a session, update: {}.{}",
            session.shutdown.update.join(", "),
            if session.shutdown.commit {
                " Commit the updates."
            } else {
                ""
            }
        ));
    }
    for file in &session.context_files {
        lines.push(format!("- Context file `{}` ({:?} mode)", file.path, file.mode));
    }
    lines.push(String::new());
}
