//! Incident Features - Deterministic feature pipeline for crime-incident classification
//!
//! Turns raw incident records into the dense, column-stable feature matrix a
//! previously trained classifier expects: imputation → temporal encoding →
//! location binning → ward risk join → binary normalization → column pruning
//! → schema projection.
//!
//! ## Modules
//!
//! - **Stages**: `imputer`, `temporal`, `binner`, `georisk`, `normalizer`, `pruner`
//! - **Schema**: CSV input reader and the trained feature schema
//! - **Model**: `Classifier` trait and a JSON linear model artifact

pub mod binner;
pub mod config;
pub mod encoder;
pub mod error;
pub mod georisk;
pub mod imputer;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod pruner;
pub mod schema;
pub mod temporal;
pub mod types;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use georisk::WardRiskTable;
pub use model::{Classifier, LinearClassifier};
pub use pipeline::{encode_csv, predict_csv, FeaturePipeline, Predictions, ValidationReport};
pub use schema::{FeatureSchema, IncidentReader};
pub use polars::prelude::DataFrame;
pub use types::FeatureMatrix;

/// Crate version reported by the CLI
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "incident-features";
