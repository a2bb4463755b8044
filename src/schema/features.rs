//! Trained feature schema
//!
//! The classifier consumes a fixed, ordered list of columns. After pruning, the
//! pipeline projects its table onto this list so that the column set and order
//! never depend on the batch contents.

use crate::binner::LocationBinner;
use crate::error::PipelineError;
use crate::georisk::OFFENSE_CATEGORIES;
use crate::temporal::TemporalEncoder;
use crate::types::{float_values, FeatureMatrix};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Raw input columns that reach the model unchanged (apart from 0/1 coercion)
pub const PASSTHROUGH_COLUMNS: [&str; 4] = ["Arrest", "Domestic", "Latitude", "Longitude"];

/// Cyclical time-of-day columns
pub const CYCLICAL_COLUMNS: [&str; 2] = ["x", "y"];

/// Ordered model input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::trained()
    }
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(PipelineError::SchemaError(format!(
                "duplicate feature {dup:?} in schema"
            )));
        }
        Ok(Self { columns })
    }

    /// The schema the classifier was trained on: passthrough flags and
    /// coordinates, `x`/`y`, weekday and hour indicators, ward risk scores,
    /// then location indicators in sorted bin order
    pub fn trained() -> Self {
        let columns = PASSTHROUGH_COLUMNS
            .iter()
            .chain(CYCLICAL_COLUMNS.iter())
            .map(|c| c.to_string())
            .chain(TemporalEncoder::weekday_encoder().column_names())
            .chain(TemporalEncoder::hour_encoder().column_names())
            .chain(OFFENSE_CATEGORIES.iter().map(|c| c.to_string()))
            .chain(LocationBinner::encoder().column_names())
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Compare against another ordered column list, describing the first difference
    pub fn check_matches(&self, other: &[String]) -> Result<(), PipelineError> {
        if self.columns.as_slice() == other {
            return Ok(());
        }
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !other.contains(c))
            .map(String::as_str)
            .collect();
        let extra: Vec<&str> = other
            .iter()
            .filter(|c| !self.columns.contains(c))
            .map(String::as_str)
            .collect();

        let detail = if missing.is_empty() && extra.is_empty() {
            "same columns in a different order".to_string()
        } else {
            format!("missing {missing:?}, unexpected {extra:?}")
        };
        Err(PipelineError::SchemaError(format!(
            "feature schema mismatch: {detail}"
        )))
    }

    /// Project a pruned frame onto this schema as a dense numeric matrix.
    ///
    /// The frame must hold exactly the schema's columns (in any order), all
    /// numeric and without missing cells.
    pub fn reindex(&self, df: &DataFrame) -> Result<FeatureMatrix, PipelineError> {
        let names: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
        let mut sorted_frame = names.clone();
        let mut sorted_schema = self.columns.clone();
        sorted_frame.sort();
        sorted_schema.sort();
        if sorted_frame != sorted_schema {
            self.check_matches(&names)?;
        }

        let selected = df.select(&self.columns)?;
        let mut rows = vec![Vec::with_capacity(self.columns.len()); df.height()];
        for series in selected.get_columns() {
            let name = series.name();
            if !series.dtype().is_numeric() {
                return Err(PipelineError::SchemaError(format!(
                    "feature {name:?} has non-numeric type {}",
                    series.dtype()
                )));
            }
            for (row, value) in float_values(series)?.into_iter().enumerate() {
                let value = value.ok_or_else(|| {
                    PipelineError::SchemaError(format!(
                        "missing value in feature {name:?} at row {row}"
                    ))
                })?;
                rows[row].push(value);
            }
        }

        Ok(FeatureMatrix {
            columns: self.columns.clone(),
            rows,
        })
    }
}
