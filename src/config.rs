//! Pipeline configuration
//!
//! Every field is optional in the JSON file; omitted fields take the values the
//! classifier was trained with.
//!
//! ```json
//! {
//!   "binary_columns": ["Arrest", "Domestic"],
//!   "imputation": { "strategy": "fixed", "means": { "Latitude": 41.84 } },
//!   "feature_schema": ["Arrest", "Domestic", "..."]
//! }
//! ```

use crate::error::PipelineError;
use crate::imputer::ImputationStrategy;
use crate::normalizer::BINARY_COLUMNS;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Columns coerced to 0/1 by the binary normalizer
    pub binary_columns: Vec<String>,
    /// Source of the means used for numeric imputation
    pub imputation: ImputationStrategy,
    /// Override of the trained feature schema
    pub feature_schema: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binary_columns: BINARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            imputation: ImputationStrategy::default(),
            feature_schema: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// The feature schema to project onto: the override if set, else the trained one
    pub fn schema(&self) -> Result<FeatureSchema, PipelineError> {
        match &self.feature_schema {
            Some(columns) => FeatureSchema::new(columns.clone()),
            None => Ok(FeatureSchema::trained()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.binary_columns, vec!["Arrest", "Domestic"]);
        assert_eq!(config.imputation, ImputationStrategy::BatchMean);
        assert_eq!(config.schema().unwrap(), FeatureSchema::trained());
    }

    #[test]
    fn test_fixed_imputation_and_schema_override() {
        let config = PipelineConfig::from_json(
            r#"{
                "imputation": {"strategy": "fixed", "means": {"Latitude": 41.84}},
                "feature_schema": ["Arrest", "x"]
            }"#,
        )
        .unwrap();

        assert!(matches!(config.imputation, ImputationStrategy::Fixed { .. }));
        assert_eq!(config.schema().unwrap().columns(), &["Arrest", "x"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = PipelineConfig::from_json(r#"{"binary_cols": []}"#);
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }
}
