//! JSON Schema validation for pipeline configuration.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded pipeline configuration schema (loaded at compile time).
const PIPELINE_SCHEMA_JSON: &str = include_str!("../../schema/pipeline-config.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(PIPELINE_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a pipeline configuration document against the schema.
///
/// Returns every violation, each suffixed with its instance path.
pub fn validate_pipeline_schema(config: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(config)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
