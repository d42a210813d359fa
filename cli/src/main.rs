//! `ego` — policy engine CLI for AI coding agents.
//!
//! Thin shell over `egokit-core` and `egokit-imprint`: argument parsing,
//! registry discovery, and artifact writing live here; all policy semantics
//! live in the libraries.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod apply_cmd;
mod doctor_cmd;
mod imprint_cmd;
mod init_cmd;

#[derive(Debug, Parser)]
#[command(
    name = "ego",
    version,
    about = "Policy engine and scaffolding for AI coding agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize a policy registry with starter templates
    Init(init_cmd::InitArgs),
    /// Compile policies into agent configuration artifacts
    Apply(apply_cmd::ApplyArgs),
    /// Show the effective policy configuration and scope resolution
    Doctor(doctor_cmd::DoctorArgs),
    /// Analyze session transcripts for policy suggestions
    #[command(subcommand)]
    Imprint(imprint_cmd::ImprintSubcommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Init(args) => init_cmd::run(args),
        Command::Apply(args) => apply_cmd::run(args),
        Command::Doctor(args) => doctor_cmd::run(args),
        Command::Imprint(subcommand) => imprint_cmd::run(subcommand),
    }
}

/// Resolve the registry path: explicit flag, or walk up from the cwd.
pub(crate) fn resolve_registry(
    explicit: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf> {
    if let Some(path) = explicit {
        anyhow::ensure!(path.is_dir(), "Policy registry not found at {}", path.display());
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    egokit_core::discover_registry(&cwd)
        .ok_or_else(|| anyhow::anyhow!("No policy registry found (run `ego init` first)"))
}

/// Default to the global scope when none was given.
pub(crate) fn scopes_or_default(scopes: Vec<String>) -> Vec<String> {
    if scopes.is_empty() {
        vec!["global".to_string()]
    } else {
        scopes
    }
}
