//! `ego doctor` — show the effective configuration after scope resolution.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use egokit_core::models::Severity;
use egokit_core::registry::PolicyRegistry;

use crate::resolve_registry;

#[derive(Debug, Parser)]
pub struct DoctorArgs {
    /// Policy registry path (discovered from the cwd if omitted)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Scope precedence to analyze (auto-detected if omitted)
    #[arg(long, short)]
    pub scope: Vec<String>,
}

pub fn run(args: DoctorArgs) -> Result<()> {
    let registry_path = resolve_registry(args.registry)?;
    let registry = PolicyRegistry::new(&registry_path)?;
    let charter = registry.load_charter()?;

    let scopes = if args.scope.is_empty() {
        // Auto-detect: every scope the charter declares, plus any discovered
        // ego scope file not already covered.
        let mut scopes: Vec<String> = charter.scopes.keys().cloned().collect();
        for scope in registry.discover_ego_scopes() {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        if scopes.is_empty() {
            vec!["global".to_string()]
        } else {
            scopes
        }
    } else {
        args.scope
    };

    let ego = registry.merge_ego_configs(&scopes)?;
    let mut rules = registry.merge_scope_rules(&charter, &scopes)?;

    println!("Policy Doctor");
    println!("  Policy version:  {}", charter.version);
    println!("  Active scopes:   {}", scopes.join(" → "));
    println!("  Total rules:     {}", rules.len());
    println!(
        "  Critical rules:  {}",
        rules.iter().filter(|r| r.severity == Severity::Critical).count()
    );
    println!(
        "  Warning rules:   {}",
        rules.iter().filter(|r| r.severity == Severity::Warning).count()
    );
    println!("  Ego role:        {}", ego.role);
    println!("  Ego voice:       {}", ego.tone.voice);
    println!("  Ego verbosity:   {}", ego.tone.verbosity);

    if !rules.is_empty() {
        println!("\nActive rules:");
        rules.sort_by(|a, b| {
            severity_rank(a.severity)
                .cmp(&severity_rank(b.severity))
                .then_with(|| a.id.cmp(&b.id))
        });
        for rule in &rules {
            println!("  {:8} {}: {}", rule.severity.to_string().to_uppercase(), rule.id, rule.rule);
        }
    }

    Ok(())
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}
