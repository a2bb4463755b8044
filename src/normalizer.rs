//! Binary normalization
//!
//! Coerces boolean-like columns (arrest and domestic flags) to integer-valued
//! numbers. Booleans map to 0/1; numbers are truncated toward zero, so a flag
//! column mean-imputed to 0.5 reads as 0. Imputation must already have run: a
//! missing cell is a coercion error.

use crate::error::PipelineError;
use crate::types::{require_column, text_values, MISSING_CELL};
use polars::prelude::{DataFrame, NamedFrom, Series};

/// Columns holding boolean flags in the raw incident data
pub const BINARY_COLUMNS: [&str; 2] = ["Arrest", "Domestic"];

/// Coerce a single cell's text to its integer flag value
pub fn coerce_binary(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(f64::trunc)
}

/// Per-row coercion of one column
pub fn coerce_column(
    column: &str,
    series: &Series,
) -> Result<Vec<Result<f64, PipelineError>>, PipelineError> {
    Ok(text_values(series)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.as_deref()
                .and_then(coerce_binary)
                .ok_or_else(|| PipelineError::CoercionError {
                    column: column.to_string(),
                    row,
                    value: cell.unwrap_or_else(|| MISSING_CELL.to_string()),
                })
        })
        .collect())
}

/// Normalizer for boolean-like columns
pub struct BinaryNormalizer;

impl BinaryNormalizer {
    /// Coerce every named column to integer-valued `Float64`
    pub fn normalize<S: AsRef<str>>(
        mut df: DataFrame,
        columns: &[S],
    ) -> Result<DataFrame, PipelineError> {
        for column in columns {
            let column = column.as_ref();
            let bits = coerce_column(column, require_column(&df, column)?)?
                .into_iter()
                .collect::<Result<Vec<f64>, _>>()?;
            df.with_column(Series::new(column, bits))?;
        }
        Ok(df)
    }
}
