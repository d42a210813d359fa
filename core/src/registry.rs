//! Policy registry: loading, validation, and scope merging.
//!
//! A registry root is a `.egokit/policy-registry` directory holding
//! `charter.yaml` and per-scope ego files under `ego/` (the scope name is
//! also the relative file path, so `teams/backend` lives at
//! `ego/teams/backend.yaml`).
//!
//! Top-level structural problems (missing file, bad YAML, schema failure)
//! abort the load. Individual malformed rule entries inside a valid charter
//! are skipped with a warning so one team's typo cannot take down the whole
//! charter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{RegistryError, Result};
use crate::models::{EgoCharter, EgoConfig, PolicyCharter, PolicyRule};
use crate::schema_validator::SchemaValidator;

/// Loads, validates, and merges policy and ego configurations.
///
/// Holds the compiled-schema cache for its own lifetime. A registry instance
/// is not synchronized; do not share one across threads.
pub struct PolicyRegistry {
    root: PathBuf,
    validator: SchemaValidator,
}

impl PolicyRegistry {
    /// Create a registry rooted at a `.egokit/policy-registry` directory.
    pub fn new(registry_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            root: registry_root.into(),
            validator: SchemaValidator::new()?,
        })
    }

    /// The registry root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_yaml(&self, path: &Path) -> Result<Value> {
        if !path.exists() {
            return Err(RegistryError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|e| RegistryError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load and validate the policy charter from `<root>/charter.yaml`.
    pub fn load_charter(&self) -> Result<PolicyCharter> {
        let path = self.root.join("charter.yaml");
        let raw = self.read_yaml(&path)?;
        self.validator.validate("charter", &raw)?;

        let charter: PolicyCharter =
            serde_json::from_value(raw).map_err(|e| RegistryError::Yaml {
                path,
                message: e.to_string(),
            })?;
        charter.validate()?;
        Ok(charter)
    }

    /// Load the ego configuration for one scope from `<root>/ego/<scope>.yaml`.
    pub fn load_ego_config(&self, scope: &str) -> Result<EgoConfig> {
        let path = self.root.join("ego").join(format!("{scope}.yaml"));
        let raw = self.read_yaml(&path)?;
        self.validator.validate("ego", &raw)?;

        let charter: EgoCharter =
            serde_json::from_value(raw).map_err(|e| RegistryError::Yaml {
                path,
                message: e.to_string(),
            })?;
        charter.validate()?;
        Ok(charter.ego)
    }

    /// Discover all scope names that have an ego file, sorted.
    pub fn discover_ego_scopes(&self) -> Vec<String> {
        let ego_dir = self.root.join("ego");
        if !ego_dir.is_dir() {
            return Vec::new();
        }

        let mut scopes: Vec<String> = WalkDir::new(&ego_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "yaml")
            })
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&ego_dir).ok()?;
                let scope = relative.with_extension("");
                Some(scope.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        scopes.sort();
        scopes
    }

    /// Merge rules across scopes according to precedence order.
    ///
    /// Scope names are iterated lowest-precedence first; a later scope's rule
    /// with an id already seen overwrites the earlier value in place without
    /// changing its position. Invalid rule entries are skipped. The result
    /// preserves first-insertion order.
    ///
    /// # Errors
    ///
    /// `RegistryError::ScopeNotFound` if a requested scope is absent from the
    /// charter.
    pub fn merge_scope_rules(
        &self,
        charter: &PolicyCharter,
        scope_precedence: &[String],
    ) -> Result<Vec<PolicyRule>> {
        let mut order: Vec<String> = Vec::new();
        let mut by_id: HashMap<String, PolicyRule> = HashMap::new();

        for scope_name in scope_precedence {
            let scope_data = charter
                .scopes
                .get(scope_name)
                .ok_or_else(|| RegistryError::ScopeNotFound(scope_name.clone()))?;

            let Some(categories) = scope_data.as_object() else {
                continue;
            };

            for (category, category_rules) in categories {
                let Some(entries) = category_rules.as_array() else {
                    continue;
                };

                for entry in entries {
                    match parse_rule(entry) {
                        Ok(rule) => {
                            if !by_id.contains_key(&rule.id) {
                                order.push(rule.id.clone());
                            }
                            by_id.insert(rule.id.clone(), rule);
                        }
                        Err(err) => {
                            tracing::warn!(
                                scope = %scope_name,
                                category = %category,
                                "skipping invalid rule entry: {err}"
                            );
                        }
                    }
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }

    /// Merge ego configurations across scopes.
    ///
    /// Missing or unreadable scope files are skipped. The first successfully
    /// loaded config is the base; each subsequent config overrides it at the
    /// field level (see [`merge_ego_instances`]).
    ///
    /// # Errors
    ///
    /// `RegistryError::NoScopesResolved` if no scope in the precedence list
    /// loads successfully.
    pub fn merge_ego_configs(&self, scope_precedence: &[String]) -> Result<EgoConfig> {
        let mut merged: Option<EgoConfig> = None;

        for scope in scope_precedence {
            match self.load_ego_config(scope) {
                Ok(config) => {
                    merged = Some(match merged {
                        None => config,
                        Some(base) => merge_ego_instances(base, config),
                    });
                }
                Err(err) => {
                    tracing::warn!(scope = %scope, "skipping ego scope: {err}");
                }
            }
        }

        merged.ok_or(RegistryError::NoScopesResolved)
    }
}

fn parse_rule(entry: &Value) -> Result<PolicyRule> {
    let rule: PolicyRule =
        serde_json::from_value(entry.clone()).map_err(|e| RegistryError::Validation {
            field: "rule".into(),
            message: e.to_string(),
        })?;
    rule.validate()?;
    Ok(rule)
}

/// Merge two ego configurations with override precedence.
///
/// Scalar fields overwrite unconditionally; map fields shallow-merge key by
/// key; collection fields only overwrite when the override's value is
/// non-empty, so an unset field in a higher-precedence scope never erases a
/// lower-precedence setting.
pub fn merge_ego_instances(base: EgoConfig, overlay: EgoConfig) -> EgoConfig {
    let mut merged = base;

    merged.role = overlay.role;
    merged.tone.voice = overlay.tone.voice;
    merged.tone.verbosity = overlay.tone.verbosity;
    if !overlay.tone.formatting.is_empty() {
        merged.tone.formatting = overlay.tone.formatting;
    }

    for (key, value) in overlay.defaults {
        merged.defaults.insert(key, value);
    }
    for (name, mode) in overlay.modes {
        merged.modes.insert(name, mode);
    }

    if !overlay.reviewer_checklist.is_empty() {
        merged.reviewer_checklist = overlay.reviewer_checklist;
    }
    if !overlay.ask_when_unsure.is_empty() {
        merged.ask_when_unsure = overlay.ask_when_unsure;
    }

    merged
}

/// Discover a policy registry by walking up from `start`.
///
/// Looks for `.egokit/policy-registry` in `start` and each ancestor.
pub fn discover_registry(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(".egokit").join("policy-registry");
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, ToneConfig};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn charter_with(scopes: serde_json::Value) -> PolicyCharter {
        serde_json::from_value(serde_json::json!({
            "version": "1.0.0",
            "scopes": scopes,
        }))
        .unwrap()
    }

    fn registry_in(dir: &Path) -> PolicyRegistry {
        PolicyRegistry::new(dir).unwrap()
    }

    fn rule_json(id: &str, rule: &str, severity: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "rule": rule,
            "severity": severity,
            "detector": "test.v1",
        })
    }

    #[test]
    fn merge_scope_rules_union_across_scopes() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [rule_json("SEC-001", "Never commit secrets", "critical")] },
            "teams/backend": { "security": [rule_json("BACK-001", "Parameterize SQL", "critical")] },
        }));

        let merged = registry
            .merge_scope_rules(
                &charter,
                &["global".to_string(), "teams/backend".to_string()],
            )
            .unwrap();

        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["SEC-001", "BACK-001"]);
    }

    #[test]
    fn merge_scope_rules_later_scope_overrides_same_id() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [rule_json("SEC-001", "Old text", "warning")] },
            "teams/backend": { "security": [rule_json("SEC-001", "New text", "critical")] },
        }));

        let merged = registry
            .merge_scope_rules(
                &charter,
                &["global".to_string(), "teams/backend".to_string()],
            )
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "SEC-001");
        assert_eq!(merged[0].rule, "New text");
        assert_eq!(merged[0].severity, Severity::Critical);
    }

    #[test]
    fn merge_scope_rules_override_keeps_first_insertion_position() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [
                rule_json("SEC-001", "First", "critical"),
                rule_json("SEC-002", "Second", "warning"),
            ]},
            "project": { "security": [rule_json("SEC-001", "Replaced", "critical")] },
        }));

        let merged = registry
            .merge_scope_rules(&charter, &["global".to_string(), "project".to_string()])
            .unwrap();

        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["SEC-001", "SEC-002"]);
        assert_eq!(merged[0].rule, "Replaced");
    }

    #[test]
    fn merge_scope_rules_single_scope_only() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [rule_json("SEC-001", "Never commit secrets", "critical")] },
            "teams/backend": { "security": [rule_json("BACK-001", "Parameterize SQL", "critical")] },
        }));

        let merged = registry
            .merge_scope_rules(&charter, &["teams/backend".to_string()])
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "BACK-001");
    }

    #[test]
    fn merge_scope_rules_unknown_scope_fails() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [] },
        }));

        let err = registry
            .merge_scope_rules(&charter, &["teams/backend".to_string()])
            .unwrap_err();
        assert!(matches!(err, RegistryError::ScopeNotFound(name) if name == "teams/backend"));
    }

    #[test]
    fn merge_scope_rules_skips_invalid_entries() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let charter = charter_with(serde_json::json!({
            "global": { "security": [
                { "id": "not-a-valid-id", "rule": "x", "severity": "critical", "detector": "test.v1" },
                { "id": "SEC-002" },
                rule_json("SEC-001", "Valid", "critical"),
            ]},
        }));

        let merged = registry
            .merge_scope_rules(&charter, &["global".to_string()])
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "SEC-001");
    }

    fn write_ego(root: &Path, scope: &str, yaml: &str) {
        let path = root.join("ego").join(format!("{scope}.yaml"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    const GLOBAL_EGO: &str = r#"
version: 1.0.0
ego:
  role: "Senior Software Engineer"
  tone:
    voice: "professional"
    verbosity: "balanced"
    formatting: ["code-with-comments"]
  defaults:
    testing: "unit tests with meaningful assertions"
  ask_when_unsure:
    - "Breaking API changes"
    - "Security-sensitive modifications"
"#;

    #[test]
    fn load_ego_config_reads_scope_file() {
        let dir = TempDir::new().unwrap();
        write_ego(dir.path(), "global", GLOBAL_EGO);
        let registry = registry_in(dir.path());

        let ego = registry.load_ego_config("global").unwrap();
        assert_eq!(ego.role, "Senior Software Engineer");
        assert_eq!(ego.tone.formatting, vec!["code-with-comments"]);
    }

    #[test]
    fn load_ego_config_missing_scope_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let err = registry.load_ego_config("global").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn merge_ego_configs_override_does_not_erase_collections() {
        let dir = TempDir::new().unwrap();
        write_ego(dir.path(), "global", GLOBAL_EGO);
        write_ego(
            dir.path(),
            "teams/backend",
            r#"
version: 1.0.0
ego:
  role: "Backend Engineer"
  tone:
    voice: "terse"
    verbosity: "minimal"
"#,
        );
        let registry = registry_in(dir.path());

        let merged = registry
            .merge_ego_configs(&["global".to_string(), "teams/backend".to_string()])
            .unwrap();

        assert_eq!(merged.role, "Backend Engineer");
        assert_eq!(merged.tone.voice, "terse");
        // The override omitted these; base values survive.
        assert_eq!(merged.tone.formatting, vec!["code-with-comments"]);
        assert_eq!(
            merged.ask_when_unsure,
            vec!["Breaking API changes", "Security-sensitive modifications"]
        );
        assert_eq!(
            merged.defaults.get("testing").map(String::as_str),
            Some("unit tests with meaningful assertions")
        );
    }

    #[test]
    fn merge_ego_configs_shallow_merges_defaults() {
        let dir = TempDir::new().unwrap();
        write_ego(dir.path(), "global", GLOBAL_EGO);
        write_ego(
            dir.path(),
            "project",
            r#"
version: 1.0.0
ego:
  role: "Senior Software Engineer"
  tone:
    voice: "professional"
    verbosity: "balanced"
  defaults:
    documentation: "clear and concise"
"#,
        );
        let registry = registry_in(dir.path());

        let merged = registry
            .merge_ego_configs(&["global".to_string(), "project".to_string()])
            .unwrap();

        // Override key added, base key retained.
        assert_eq!(
            merged.defaults.get("documentation").map(String::as_str),
            Some("clear and concise")
        );
        assert!(merged.defaults.contains_key("testing"));
    }

    #[test]
    fn merge_ego_configs_skips_missing_scopes() {
        let dir = TempDir::new().unwrap();
        write_ego(dir.path(), "global", GLOBAL_EGO);
        let registry = registry_in(dir.path());

        let merged = registry
            .merge_ego_configs(&["global".to_string(), "teams/missing".to_string()])
            .unwrap();
        assert_eq!(merged.role, "Senior Software Engineer");
    }

    #[test]
    fn merge_ego_configs_no_scopes_resolved_fails() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let err = registry
            .merge_ego_configs(&["missing".to_string()])
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoScopesResolved));
    }

    #[test]
    fn merge_ego_instances_scalar_and_map_semantics() {
        let base = EgoConfig {
            role: "Engineer".into(),
            tone: ToneConfig {
                voice: "professional".into(),
                verbosity: "balanced".into(),
                formatting: vec!["bullets".into()],
            },
            defaults: BTreeMap::from([("a".to_string(), "1".to_string())]),
            reviewer_checklist: vec!["check tests".into()],
            ask_when_unsure: Vec::new(),
            modes: BTreeMap::new(),
        };
        let overlay = EgoConfig {
            role: "Reviewer".into(),
            tone: ToneConfig {
                voice: "direct".into(),
                verbosity: "detailed".into(),
                formatting: Vec::new(),
            },
            defaults: BTreeMap::from([("b".to_string(), "2".to_string())]),
            reviewer_checklist: Vec::new(),
            ask_when_unsure: Vec::new(),
            modes: BTreeMap::new(),
        };

        let merged = merge_ego_instances(base, overlay);
        assert_eq!(merged.role, "Reviewer");
        assert_eq!(merged.tone.voice, "direct");
        assert_eq!(merged.tone.formatting, vec!["bullets"]);
        assert_eq!(merged.defaults.len(), 2);
        assert_eq!(merged.reviewer_checklist, vec!["check tests"]);
    }

    #[test]
    fn load_charter_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(dir.path());
        let err = registry.load_charter().unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn load_charter_rejects_structurally_invalid_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("charter.yaml"),
            "version: 1.0.0\nscopes:\n  global:\n    security: not-a-list\n",
        )
        .unwrap();
        let registry = registry_in(dir.path());
        let err = registry.load_charter().unwrap_err();
        assert!(matches!(err, RegistryError::SchemaValidation { .. }));
    }

    #[test]
    fn load_charter_rejects_unparsable_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("charter.yaml"), "version: [unclosed\n").unwrap();
        let registry = registry_in(dir.path());
        let err = registry.load_charter().unwrap_err();
        assert!(matches!(err, RegistryError::Yaml { .. }));
    }

    #[test]
    fn discover_ego_scopes_walks_nested_directories() {
        let dir = TempDir::new().unwrap();
        write_ego(dir.path(), "global", GLOBAL_EGO);
        write_ego(dir.path(), "teams/backend", GLOBAL_EGO);
        let registry = registry_in(dir.path());

        assert_eq!(
            registry.discover_ego_scopes(),
            vec!["global".to_string(), "teams/backend".to_string()]
        );
    }

    #[test]
    fn discover_registry_walks_up() {
        let dir = TempDir::new().unwrap();
        let registry_dir = dir.path().join(".egokit").join("policy-registry");
        std::fs::create_dir_all(&registry_dir).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_registry(&nested), Some(registry_dir));
        let outside = TempDir::new().unwrap();
        assert_eq!(discover_registry(outside.path()), None);
    }
}
