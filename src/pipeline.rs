//! Pipeline orchestration
//!
//! This module provides the public API of the crate. It runs a batch of raw
//! incident records through every stage, in order:
//!
//! 1. Imputer - fill missing values
//! 2. TemporalEncoder - time-of-day and weekday features
//! 3. LocationBinner - bounded, one-hot location categories
//! 4. GeoRiskJoiner - per-ward offense risk scores
//! 5. BinaryNormalizer - 0/1 flags
//! 6. ColumnPruner - drop everything the model was not trained on
//!
//! and finally projects the result onto the trained feature schema.

use crate::binner::LocationBinner;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::georisk::{GeoRiskJoiner, WardRiskTable, WARD_COLUMN};
use crate::imputer::Imputer;
use crate::model::Classifier;
use crate::normalizer::{coerce_column, BinaryNormalizer};
use crate::pruner::{ColumnPruner, DROP_COLUMNS};
use crate::schema::{FeatureSchema, IncidentReader, PASSTHROUGH_COLUMNS};
use crate::temporal::{TemporalEncoder, DATE_COLUMN};
use crate::types::FeatureMatrix;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info};
use uuid::Uuid;

/// Columns derived by the temporal encoder and later pruned; not expected in raw input
const DERIVED_TEMPORAL_COLUMNS: [&str; 4] = ["hour", "minute", "weekday", "hourfloat"];

/// Labels predicted for one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predictions {
    /// Unique id of this prediction run
    pub run_id: String,
    /// One label per input record, in input order
    pub labels: Vec<String>,
}

/// Pipeline stage a record failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Timestamp,
    WardLookup,
    BinaryCoercion,
}

/// One record that would abort the batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    pub row: usize,
    pub stage: Stage,
    pub error: String,
}

/// Per-record validation of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub invalid_records: usize,
    /// Raw input columns the pipeline needs but the batch lacks
    pub missing_columns: Vec<String>,
    pub issues: Vec<RecordIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing_columns.is_empty() && self.issues.is_empty()
    }
}

/// Raw input columns the pipeline reads or drops
pub fn required_input_columns(binary_columns: &[String]) -> Vec<String> {
    let mut required: Vec<String> = DROP_COLUMNS
        .iter()
        .filter(|c| !DERIVED_TEMPORAL_COLUMNS.contains(c))
        .map(|c| c.to_string())
        .collect();
    for column in binary_columns
        .iter()
        .map(String::as_str)
        .chain(PASSTHROUGH_COLUMNS)
    {
        if !required.iter().any(|r| r == column) {
            required.push(column.to_string());
        }
    }
    required
}

/// Feature pipeline bound to a loaded ward risk table
pub struct FeaturePipeline {
    risk: WardRiskTable,
    imputer: Imputer,
    binary_columns: Vec<String>,
    schema: FeatureSchema,
}

impl FeaturePipeline {
    /// Pipeline with the trained defaults
    pub fn new(risk: WardRiskTable) -> Self {
        Self {
            risk,
            imputer: Imputer::default(),
            binary_columns: PipelineConfig::default().binary_columns,
            schema: FeatureSchema::trained(),
        }
    }

    /// Pipeline with settings from a configuration
    pub fn with_config(risk: WardRiskTable, config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            risk,
            imputer: Imputer::new(config.imputation.clone()),
            binary_columns: config.binary_columns.clone(),
            schema: config.schema()?,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn risk_table(&self) -> &WardRiskTable {
        &self.risk
    }

    /// Run every stage, returning the pruned frame
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame, PipelineError> {
        let rows = df.height();
        debug!(rows, columns = df.width(), "transform started");

        let df = self.imputer.impute(df)?;
        let df = TemporalEncoder::encode(df)?;
        let df = LocationBinner::bin(df)?;
        let df = GeoRiskJoiner::join(df, &self.risk)?;
        let df = BinaryNormalizer::normalize(df, &self.binary_columns)?;
        let df = ColumnPruner::prune(df)?;

        debug!(rows, columns = df.width(), "transform finished");
        Ok(df)
    }

    /// Run every stage and project onto the feature schema
    pub fn encode(&self, df: DataFrame) -> Result<FeatureMatrix, PipelineError> {
        let df = self.transform(df)?;
        self.schema.reindex(&df)
    }

    /// Encode a batch and predict a label per record
    pub fn predict(
        &self,
        df: DataFrame,
        model: &dyn Classifier,
    ) -> Result<Predictions, PipelineError> {
        self.schema.check_matches(model.feature_names())?;

        let features = self.encode(df)?;
        let labels = model.predict(&features)?;
        if labels.len() != features.n_rows() {
            return Err(PipelineError::ModelError(format!(
                "model returned {} labels for {} records",
                labels.len(),
                features.n_rows()
            )));
        }

        let predictions = Predictions {
            run_id: Uuid::new_v4().to_string(),
            labels,
        };
        info!(
            run_id = %predictions.run_id,
            records = predictions.labels.len(),
            "batch predicted"
        );
        Ok(predictions)
    }

    /// Check every record without aborting at the first failure.
    ///
    /// Imputation runs over the whole batch first, as it does in `transform`.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport, PipelineError> {
        let missing_columns: Vec<String> = required_input_columns(&self.binary_columns)
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();

        let imputed = self.imputer.impute(df.clone())?;
        let mut issues = Vec::new();
        let mut record = |stage: Stage, row: usize, error: PipelineError| {
            issues.push(RecordIssue {
                row,
                stage,
                error: error.to_string(),
            })
        };

        if let Ok(dates) = imputed.column(DATE_COLUMN) {
            for (row, result) in TemporalEncoder::parse_column(dates)?.into_iter().enumerate() {
                if let Err(e) = result {
                    record(Stage::Timestamp, row, e);
                }
            }
        }

        if let Ok(wards) = imputed.column(WARD_COLUMN) {
            for (row, result) in GeoRiskJoiner::lookup_column(wards, &self.risk)?
                .into_iter()
                .enumerate()
            {
                if let Err(e) = result {
                    record(Stage::WardLookup, row, e);
                }
            }
        }

        for column in &self.binary_columns {
            let Ok(cells) = imputed.column(column) else {
                continue;
            };
            for (row, result) in coerce_column(column, cells)?.into_iter().enumerate() {
                if let Err(e) = result {
                    record(Stage::BinaryCoercion, row, e);
                }
            }
        }

        issues.sort_by_key(|issue| issue.row);
        let mut invalid_rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
        invalid_rows.dedup();

        Ok(ValidationReport {
            total_records: df.height(),
            invalid_records: invalid_rows.len(),
            missing_columns,
            issues,
        })
    }
}

/// Read a CSV batch, encode it and predict one label per record.
///
/// # Example
/// ```ignore
/// let risk = WardRiskTable::load(Path::new("ward_dist.json"))?;
/// let model = LinearClassifier::load(Path::new("model.json"))?;
/// let pipeline = FeaturePipeline::new(risk);
/// let labels = predict_csv(File::open("incidents.csv")?, &pipeline, &model)?;
/// ```
pub fn predict_csv<R: Read>(
    input: R,
    pipeline: &FeaturePipeline,
    model: &dyn Classifier,
) -> Result<Vec<String>, PipelineError> {
    let df = IncidentReader::new().read(input)?;
    Ok(pipeline.predict(df, model)?.labels)
}

/// Read a CSV batch and encode it into the feature matrix
pub fn encode_csv<R: Read>(
    input: R,
    pipeline: &FeaturePipeline,
) -> Result<FeatureMatrix, PipelineError> {
    let df = IncidentReader::new().read(input)?;
    pipeline.encode(df)
}
