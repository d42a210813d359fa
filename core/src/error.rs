use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, validating, or merging policy registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML in {path}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("Schema validation failed for '{schema}':\n  - {}", errors.join("\n  - "))]
    SchemaValidation {
        schema: String,
        errors: Vec<String>,
    },

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Scope '{0}' not found in charter")]
    ScopeNotFound(String),

    #[error("No valid ego configurations found in scope precedence")]
    NoScopesResolved,
}

/// Type alias for Results using RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;
