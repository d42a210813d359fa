//! Root of the `egokit-core` library.
//!
//! Policy registry loading and scope merging, managed-section splicing, and
//! artifact compilation. All user-visible output must go through the caller;
//! library code only logs via the tracing stack.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod compiler;
pub mod error;
pub mod models;
pub mod registry;
pub mod schema_validator;
pub mod splice;

pub use compiler::ArtifactCompiler;
pub use error::{RegistryError, Result};
pub use models::{
    CompilationContext, EgoCharter, EgoConfig, ModeConfig, PolicyCharter, PolicyRule,
    ScopeRules, SessionConfig, Severity, ToneConfig,
};
pub use registry::{PolicyRegistry, discover_registry, merge_ego_instances};
pub use splice::{
    EGOKIT_BEGIN_MARKER, EGOKIT_END_MARKER, extract_human_content, find_managed_section, splice,
};
