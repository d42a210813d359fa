//! `ego apply` — compile policies and write agent artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use egokit_core::compiler::ArtifactCompiler;
use egokit_core::models::CompilationContext;
use egokit_core::registry::PolicyRegistry;
use egokit_core::splice::find_managed_section;

use crate::{resolve_registry, scopes_or_default};

#[derive(Debug, Parser)]
pub struct ApplyArgs {
    /// Target repository path
    #[arg(long, short, default_value = ".")]
    pub repo: PathBuf,

    /// Policy registry path (discovered from the cwd if omitted)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Scope precedence, lowest first (repeatable; defaults to global)
    #[arg(long, short)]
    pub scope: Vec<String>,

    /// Show what would be generated without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Append to an existing AGENTS.md that has no managed section
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    anyhow::ensure!(
        args.repo.is_dir(),
        "Target repository not found at {}",
        args.repo.display()
    );

    let registry_path = resolve_registry(args.registry)?;
    let registry = PolicyRegistry::new(&registry_path)?;
    let scopes = scopes_or_default(args.scope);

    let charter = registry.load_charter()?;
    let rules = registry.merge_scope_rules(&charter, &scopes)?;
    let ego = registry.merge_ego_configs(&scopes)?;

    let agents_path = args.repo.join("AGENTS.md");
    let existing = std::fs::read_to_string(&agents_path).ok();

    // Appending to a hand-written AGENTS.md is the one destructive-looking
    // path; require an explicit opt-in.
    if let Some(text) = &existing
        && find_managed_section(text).is_none()
        && !args.force
        && !args.dry_run
    {
        anyhow::bail!(
            "{} exists without a managed section; re-run with --force to append the policy block",
            agents_path.display()
        );
    }

    let context = CompilationContext {
        target_repo: args.repo.clone(),
        charter,
        ego,
        active_scope: scopes.last().cloned().unwrap_or_else(|| "global".into()),
        generated_at: Utc::now(),
    };
    let compiler = ArtifactCompiler::new(context);
    let artifacts = compiler.compile_all_artifacts(&rules, existing.as_deref());

    if args.dry_run {
        println!("Dry run - artifacts that would be written to {}:", args.repo.display());
        for (path, content) in &artifacts {
            println!("\n── {path} ({} bytes)", content.len());
            let preview: String = content.lines().take(12).collect::<Vec<_>>().join("\n");
            println!("{preview}");
        }
        return Ok(());
    }

    // Artifacts are written independently; a failure here leaves earlier
    // artifacts in place.
    let agents_existed = existing.is_some();
    for (path, content) in &artifacts {
        let target = args.repo.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        tracing::info!(path = %target.display(), "wrote artifact");
    }

    let verb = if agents_existed { "updated" } else { "created" };
    println!("✓ Artifacts synced to {} (AGENTS.md {verb})", args.repo.display());
    println!("  • AGENTS.md");
    println!("  • .claude/settings.json");
    let command_count = artifacts
        .keys()
        .filter(|k| k.starts_with(".claude/commands/"))
        .count();
    println!("  • .claude/commands/ ({command_count} commands)");
    println!("  • .augment/commands/ ({command_count} commands)");
    println!("  Active scopes: {}", scopes.join(" → "));

    Ok(())
}
