//! `ego init` — scaffold a starter policy registry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory to initialize the policy registry in
    #[arg(long, short, default_value = ".")]
    pub path: PathBuf,

    /// Organization name for the generated templates
    #[arg(long, default_value = "My Organization")]
    pub org: String,

    /// Overwrite existing registry files
    #[arg(long)]
    pub force: bool,
}

const STARTER_CHARTER: &str = r#"version: 1.0.0
scopes:
  global:
    security:
      - id: SEC-001
        rule: "Never commit credentials or secrets"
        severity: critical
        detector: secret.regex.v1
        auto_fix: false
        example_violation: "api_key = 'sk-123456789abcdef'"
        example_fix: "api_key = os.environ['API_KEY']"
        tags: ["security", "credentials"]

    code_quality:
      - id: QUAL-001
        rule: "Use type hints for all function parameters and return values"
        severity: warning
        detector: python.ast.typehints.v1
        auto_fix: true
        example_violation: "def process_data(data):"
        example_fix: "def process_data(data: Dict[str, Any]) -> List[str]:"
        tags: ["python", "typing"]

    docs:
      - id: DOCS-001
        rule: "Technical documentation must avoid superlatives and marketing language"
        severity: critical
        detector: docs.style.superlatives.v1
        auto_fix: false
        example_violation: "This amazing feature is world-class"
        example_fix: "This feature provides X functionality"
        tags: ["documentation", "style"]
"#;

const STARTER_EGO: &str = r#"version: 1.0.0
ego:
  role: "Senior Software Engineer"
  tone:
    voice: "professional, precise, helpful"
    verbosity: "balanced"
    formatting:
      - "code-with-comments"
      - "bullet-lists-for-steps"
      - "examples-when-helpful"

  defaults:
    structure: "overview -> implementation -> validation -> documentation"
    code_style: "Follow established project conventions"
    documentation: "clear, concise, actionable"
    testing: "unit tests with meaningful assertions"

  reviewer_checklist:
    - "Code follows established patterns and conventions"
    - "Error handling is appropriate and informative"
    - "Documentation is clear and up-to-date"
    - "Tests cover critical functionality"
    - "Security best practices are followed"

  ask_when_unsure:
    - "Breaking changes to public APIs"
    - "Security-sensitive modifications"
    - "Database schema changes"

  modes:
    implementer:
      verbosity: "balanced"
      focus: "clean implementation with good practices"

    reviewer:
      verbosity: "detailed"
      focus: "thorough analysis and constructive feedback"

    security:
      verbosity: "detailed"
      focus: "security implications and threat modeling"
"#;

pub fn run(args: InitArgs) -> Result<()> {
    let registry_path = args.path.join(".egokit").join("policy-registry");

    if registry_path.exists() && !args.force {
        anyhow::bail!(
            "Policy registry already exists at {} (use --force to overwrite)",
            registry_path.display()
        );
    }

    std::fs::create_dir_all(registry_path.join("ego"))
        .with_context(|| format!("Failed to create {}", registry_path.display()))?;

    let charter = STARTER_CHARTER.replacen(
        "scopes:",
        &format!("# {} policy charter\nscopes:", args.org),
        1,
    );
    std::fs::write(registry_path.join("charter.yaml"), charter)
        .context("Failed to write charter.yaml")?;
    std::fs::write(registry_path.join("ego").join("global.yaml"), STARTER_EGO)
        .context("Failed to write ego/global.yaml")?;

    println!("✓ Policy registry initialized at {}", registry_path.display());
    println!("Created files:");
    println!("  • charter.yaml (starter policies)");
    println!("  • ego/global.yaml (agent configuration)");
    println!("\nNext steps:");
    println!("  1. Customize policies in charter.yaml");
    println!("  2. Adjust agent behavior in ego/global.yaml");
    println!("  3. Run `ego apply` to generate artifacts");

    Ok(())
}
