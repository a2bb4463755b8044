//! Classifier interface
//!
//! The model is trained elsewhere; this crate only needs something that accepts
//! a feature matrix in the trained column order and returns one label per row.

mod linear;

pub use linear::LinearClassifier;

use crate::error::PipelineError;
use crate::types::FeatureMatrix;

/// Trait for trained classifiers consuming the feature matrix
pub trait Classifier {
    /// Feature columns the model was trained on, in order
    fn feature_names(&self) -> &[String];

    /// Predict one label per matrix row, in row order
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, PipelineError>;
}
