//! Blueprint guidance and pipeline configuration.
//!
//! Both are plain serde data parsed from YAML or JSON. Pipeline
//! configuration is also checked against an embedded JSON Schema before it
//! is deserialized.

mod parser;
mod schema;

pub use parser::{Blueprint, ConfigError, FormattingRequirements, PipelineConfig, ScoringConfig};
pub use schema::validate_pipeline_schema;
