//! Linear model artifact
//!
//! A JSON export of a trained linear classifier (one weight vector and one
//! intercept per class). The predicted label is the class with the highest
//! score; ties go to the class listed first.

use crate::error::PipelineError;
use crate::schema::FeatureSchema;
use crate::types::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use super::Classifier;

/// Linear classifier loaded from a JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    feature_names: Vec<String>,
    classes: Vec<String>,
    /// `coefficients[class][feature]`
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearClassifier {
    /// Build a classifier, checking that every dimension lines up
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    ) -> Result<Self, PipelineError> {
        let model = Self {
            feature_names,
            classes,
            coefficients,
            intercepts,
        };
        model.check_shape()?;
        Ok(model)
    }

    /// Parse a model artifact from JSON
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let model: Self =
            serde_json::from_str(json).map_err(|e| PipelineError::ModelError(e.to_string()))?;
        model.check_shape()?;
        Ok(model)
    }

    /// Load a model artifact file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::ModelError(format!("cannot read {}: {e}", path.display()))
        })?;
        let model = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            classes = model.classes.len(),
            features = model.feature_names.len(),
            "loaded model artifact"
        );
        Ok(model)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn check_shape(&self) -> Result<(), PipelineError> {
        if self.classes.is_empty() {
            return Err(PipelineError::ModelError("model has no classes".to_string()));
        }
        if self.coefficients.len() != self.classes.len()
            || self.intercepts.len() != self.classes.len()
        {
            return Err(PipelineError::ModelError(format!(
                "{} classes but {} coefficient rows and {} intercepts",
                self.classes.len(),
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        if let Some((i, row)) = self
            .coefficients
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.feature_names.len())
        {
            return Err(PipelineError::ModelError(format!(
                "coefficient row {i} has {} weights for {} features",
                row.len(),
                self.feature_names.len()
            )));
        }
        Ok(())
    }

    fn score(&self, class: usize, features: &[f64]) -> f64 {
        self.intercepts[class]
            + self.coefficients[class]
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl Classifier for LinearClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, PipelineError> {
        FeatureSchema::new(self.feature_names.clone())?.check_matches(&features.columns)?;

        let labels = features
            .rows
            .iter()
            .map(|row| {
                let mut best = 0;
                let mut best_score = self.score(0, row);
                for class in 1..self.classes.len() {
                    let score = self.score(class, row);
                    if score > best_score {
                        best = class;
                        best_score = score;
                    }
                }
                self.classes[best].clone()
            })
            .collect();

        Ok(labels)
    }
}
