//! JSON Schema validation for charter and ego documents.
//!
//! Schemas are embedded at compile time using `include_str!` for reliability
//! and to avoid filesystem dependencies at runtime. Compiled schemas are
//! cached by name for the lifetime of the owning registry instance; the cache
//! is not intended for concurrent access from multiple threads.

use std::collections::HashMap;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::{RegistryError, Result};

const CHARTER_SCHEMA: &str = include_str!("schemas/charter.schema.json");
const EGO_SCHEMA: &str = include_str!("schemas/ego.schema.json");

/// Schema validator with embedded, precompiled schemas.
pub struct SchemaValidator {
    schemas: HashMap<&'static str, JSONSchema>,
}

impl SchemaValidator {
    /// Create a validator with both embedded schemas compiled.
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();
        schemas.insert("charter", Self::compile("charter", CHARTER_SCHEMA)?);
        schemas.insert("ego", Self::compile("ego", EGO_SCHEMA)?);
        Ok(Self { schemas })
    }

    fn compile(name: &str, source: &str) -> Result<JSONSchema> {
        let schema_value: Value =
            serde_json::from_str(source).map_err(|e| RegistryError::SchemaValidation {
                schema: name.to_string(),
                errors: vec![format!("failed to parse embedded schema: {e}")],
            })?;

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| RegistryError::SchemaValidation {
                schema: name.to_string(),
                errors: vec![format!("failed to compile embedded schema: {e}")],
            })
    }

    /// Validate a raw document against the named schema.
    ///
    /// Returns `Ok(())` on success, or an error listing every validation
    /// failure with the instance path where it occurred.
    pub fn validate(&self, schema_name: &str, data: &Value) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| RegistryError::SchemaValidation {
                schema: schema_name.to_string(),
                errors: vec!["unknown schema name".to_string()],
            })?;

        let result = schema.validate(data);
        if let Err(errors) = result {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    let path = if path.is_empty() {
                        "root".to_string()
                    } else {
                        path
                    };
                    format!("{e} at '{path}'")
                })
                .collect();
            return Err(RegistryError::SchemaValidation {
                schema: schema_name.to_string(),
                errors: messages,
            });
        }

        Ok(())
    }
}
