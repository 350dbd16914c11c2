//! Blueprint and pipeline configuration parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_pipeline_schema;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema validation failed: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Guidance constraints a section must not contradict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Statements the report takes as given
    #[serde(default)]
    pub assumptions: Vec<String>,

    /// Phrases that must never appear
    #[serde(default)]
    pub forbidden: Vec<String>,
}

impl Blueprint {
    pub fn new<A, F, S, T>(assumptions: A, forbidden: F) -> Self
    where
        A: IntoIterator<Item = S>,
        F: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            assumptions: assumptions.into_iter().map(Into::into).collect(),
            forbidden: forbidden.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let blueprint: Blueprint = serde_yaml::from_str(yaml)?;
        blueprint.validate()?;
        Ok(blueprint)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let blueprint: Blueprint = serde_json::from_str(json)?;
        blueprint.validate()?;
        Ok(blueprint)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Lower-cased phrases whose presence contradicts the blueprint:
    /// each negated assumption (`"not " + assumption`) then each forbidden
    /// phrase.
    pub fn contradictory_phrases(&self) -> Vec<String> {
        self.assumptions
            .iter()
            .map(|assumption| format!("not {}", assumption.to_lowercase()))
            .chain(self.forbidden.iter().map(|ban| ban.to_lowercase()))
            .collect()
    }

    // An empty phrase would match every draft.
    fn validate(&self) -> Result<(), ConfigError> {
        let blank = self
            .assumptions
            .iter()
            .chain(self.forbidden.iter())
            .any(|phrase| phrase.trim().is_empty());

        if blank {
            return Err(ConfigError::ValidationError(
                "Blueprint phrases must not be blank".to_string(),
            ));
        }

        Ok(())
    }
}

/// Formatting gates applied to every drafted section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingRequirements {
    /// Headings that must appear as `# <heading>`
    pub required_headings: Vec<String>,

    /// Minimum whitespace-separated word count
    pub min_words: usize,
}

impl FormattingRequirements {
    /// No gates at all.
    pub fn none() -> Self {
        Self {
            required_headings: Vec::new(),
            min_words: 0,
        }
    }
}

impl Default for FormattingRequirements {
    fn default() -> Self {
        Self {
            required_headings: vec!["Summary".to_string()],
            min_words: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Age at which evidence stops contributing to recency
    pub recency_window_days: u32,

    /// Coverage baseline when a section sets no evidence target
    pub default_baseline: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_window_days: 180,
            default_baseline: 3,
        }
    }
}

/// Configuration for the section pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub formatting: FormattingRequirements,
    pub scoring: ScoringConfig,
}

impl PipelineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        // An empty YAML document parses as null.
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };

        validate_pipeline_schema(&value).map_err(ConfigError::SchemaError)?;
        let config: PipelineConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scoring.recency_window_days == 0 {
            return Err(ConfigError::ValidationError(
                "scoring.recency_window_days must be positive".to_string(),
            ));
        }

        if self.scoring.default_baseline == 0 {
            return Err(ConfigError::ValidationError(
                "scoring.default_baseline must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
