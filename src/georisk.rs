//! Ward risk join
//!
//! Attaches precomputed per-ward risk scores for a fixed set of offense
//! categories. The risk table is a side file loaded once per invocation:
//!
//! ```json
//! { "5": [0.2, 0.4, 0.1, 0.3, 0.05], "6": [...] }
//! ```
//!
//! A ward without an entry aborts the whole batch.

use crate::error::PipelineError;
use crate::types::{require_column, text_values, MISSING_CELL};
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Ward identifier column
pub const WARD_COLUMN: &str = "Ward";

/// Offense categories, in risk-vector order; also the emitted column names
pub const OFFENSE_CATEGORIES: [&str; 5] = [
    "BATTERY",
    "THEFT",
    "ASSAULT",
    "CRIMINAL DAMAGE",
    "DECEPTIVE PRACTICE",
];

/// Risk scores of one ward, one per offense category
pub type RiskVector = [f64; 5];

/// Lookup key for a ward cell: the integer-truncated ward number as a string
pub fn ward_key(cell: &str) -> Option<String> {
    let ward = cell.trim().parse::<f64>().ok()?;
    if !ward.is_finite() {
        return None;
    }
    Some(format!("{}", ward.trunc() as i64))
}

/// Per-ward risk scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WardRiskTable(BTreeMap<String, RiskVector>);

impl WardRiskTable {
    /// Parse a risk table, rejecting entries without exactly one score per category
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let raw: BTreeMap<String, Vec<f64>> = serde_json::from_str(json)
            .map_err(|e| PipelineError::RiskTableError(e.to_string()))?;

        let mut wards = BTreeMap::new();
        for (ward, scores) in raw {
            let vector: RiskVector = scores.as_slice().try_into().map_err(|_| {
                PipelineError::RiskTableError(format!(
                    "ward {ward:?} has {} scores, expected {}",
                    scores.len(),
                    OFFENSE_CATEGORIES.len()
                ))
            })?;
            wards.insert(ward, vector);
        }
        Ok(Self(wards))
    }

    /// Load a risk table from a JSON file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::RiskTableError(format!("cannot read {}: {e}", path.display()))
        })?;
        let table = Self::from_json(&json)?;
        info!(path = %path.display(), wards = table.len(), "loaded ward risk table");
        Ok(table)
    }

    pub fn insert(&mut self, ward: &str, scores: RiskVector) {
        self.0.insert(ward.to_string(), scores);
    }

    pub fn get(&self, ward: &str) -> Option<&RiskVector> {
        self.0.get(ward)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Risk vector for the ward in `row`
    pub fn lookup(&self, row: usize, cell: Option<&str>) -> Result<&RiskVector, PipelineError> {
        let key = cell.and_then(ward_key).ok_or_else(|| PipelineError::LookupError {
            row,
            key: cell.unwrap_or(MISSING_CELL).to_string(),
        })?;
        self.get(&key)
            .ok_or(PipelineError::LookupError { row, key })
    }
}

/// Joiner adding one risk column per offense category
pub struct GeoRiskJoiner;

impl GeoRiskJoiner {
    /// Look up the ward of every row, one result per row
    pub fn lookup_column<'a>(
        series: &Series,
        risk: &'a WardRiskTable,
    ) -> Result<Vec<Result<&'a RiskVector, PipelineError>>, PipelineError> {
        Ok(text_values(series)?
            .iter()
            .enumerate()
            .map(|(row, cell)| risk.lookup(row, cell.as_deref()))
            .collect())
    }

    pub fn join(mut df: DataFrame, risk: &WardRiskTable) -> Result<DataFrame, PipelineError> {
        let vectors: Vec<RiskVector> = Self::lookup_column(require_column(&df, WARD_COLUMN)?, risk)?
            .into_iter()
            .map(|v| v.copied())
            .collect::<Result<_, _>>()?;

        for (i, category) in OFFENSE_CATEGORIES.iter().enumerate() {
            let scores: Vec<f64> = vectors.iter().map(|v| v[i]).collect();
            df.with_column(Series::new(category, scores))?;
        }

        debug!(rows = vectors.len(), "ward risk scores joined");
        Ok(df)
    }
}
