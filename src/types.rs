//! Core types for the incident feature pipeline
//!
//! Batches flow through the stages as polars [`DataFrame`]s. This module holds
//! the dense feature matrix handed to the classifier and the few helpers the
//! stages share for reading cells.

use crate::error::PipelineError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Rendering of a missing cell in error messages
pub const MISSING_CELL: &str = "NaN";

/// Column lookup that reports a missing column as a schema error
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, PipelineError> {
    df.column(name).map_err(|_| PipelineError::missing_column(name))
}

/// Every cell of a column as text, nulls as `None`.
///
/// Booleans render as `True`/`False`, numbers as polars formats them.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>, PipelineError> {
    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect(),
        _ => series
            .cast(&DataType::Utf8)?
            .utf8()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect(),
    };
    Ok(values)
}

/// Numeric cells of a column as `f64`, nulls as `None`
pub fn float_values(series: &Series) -> Result<Vec<Option<f64>>, PipelineError> {
    Ok(series.cast(&DataType::Float64)?.f64()?.into_iter().collect())
}

/// Dense numeric model input, columns in feature-schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `name` in `row`
    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| r[col])
    }

    /// Write the matrix as CSV with a header row
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), PipelineError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
