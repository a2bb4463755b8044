//! Missing-value imputation
//!
//! Two phases run over the whole batch:
//! 1. Numeric columns get missing cells replaced by a column mean.
//! 2. Whatever is still missing takes the last valid value above it (forward fill).
//!
//! With the default strategy the means come from the batch itself, so the same
//! record can be imputed differently depending on its neighbours. The `Fixed`
//! strategy uses persisted training-time means instead.

use crate::error::PipelineError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Persisted per-column means
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMeans(BTreeMap<String, f64>);

impl ColumnMeans {
    /// Compute the mean of every numeric column of a (training) batch
    pub fn fit(df: &DataFrame) -> Self {
        let means = df
            .get_columns()
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .filter_map(|s| s.mean().map(|m| (s.name().to_string(), m)))
            .collect();
        Self(means)
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    pub fn insert(&mut self, column: &str, mean: f64) {
        self.0.insert(column.to_string(), mean);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load means from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize means to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Where phase-one means come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Mean of the current batch
    #[default]
    BatchMean,
    /// Training-time means; columns not listed fall back to the batch mean
    Fixed { means: ColumnMeans },
}

/// Missing-value imputer
#[derive(Debug, Clone, Default)]
pub struct Imputer {
    strategy: ImputationStrategy,
}

impl Imputer {
    pub fn new(strategy: ImputationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &ImputationStrategy {
        &self.strategy
    }

    /// Fill missing cells: mean fill for numeric columns, then forward fill
    pub fn impute(&self, df: DataFrame) -> Result<DataFrame, PipelineError> {
        let columns = df
            .get_columns()
            .iter()
            .map(|series| self.impute_column(series))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DataFrame::new(columns)?)
    }

    fn impute_column(&self, series: &Series) -> Result<Series, PipelineError> {
        if series.null_count() == 0 {
            return Ok(series.clone());
        }
        let name = series.name();
        let missing = series.null_count();

        let filled = match self.fixed_mean(series) {
            Some(mean) if series.null_count() == series.len() => {
                Series::new(name, vec![mean; series.len()])
            }
            Some(mean) => series
                .cast(&DataType::Float64)?
                .f64()?
                .fill_null_with_values(mean)?
                .into_series(),
            None if series.dtype().is_numeric() => series
                .cast(&DataType::Float64)?
                .fill_null(FillNullStrategy::Mean)?,
            None => series.clone(),
        };
        if filled.null_count() < missing {
            debug!(column = name, filled = missing - filled.null_count(), "mean-imputed numeric column");
        }

        let filled = filled.fill_null(FillNullStrategy::Forward(None))?;
        if filled.null_count() > 0 {
            debug!(
                column = name,
                unfilled = filled.null_count(),
                "leading cells left missing after forward fill"
            );
        }
        Ok(filled)
    }

    /// Persisted mean for a numeric (or entirely missing) column, if the strategy has one
    fn fixed_mean(&self, series: &Series) -> Option<f64> {
        match &self.strategy {
            ImputationStrategy::BatchMean => None,
            ImputationStrategy::Fixed { means } => {
                let all_missing = series.null_count() == series.len();
                if series.dtype().is_numeric() || all_missing {
                    means.get(series.name())
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("Latitude", &[Some(41.0), None, Some(43.0)]),
            Series::new("Location Description", &[Some("STREET"), None, Some("ALLEY")]),
            Series::new("Arrest", &[None, Some(true), None]),
        ])
        .unwrap()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_batch_mean_fill() {
        let df = Imputer::default().impute(make_frame()).unwrap();
        assert_eq!(floats(&df, "Latitude"), vec![Some(41.0), Some(42.0), Some(43.0)]);
    }

    #[test]
    fn test_forward_fill_for_text() {
        let df = Imputer::default().impute(make_frame()).unwrap();
        let locations: Vec<Option<&str>> = df
            .column("Location Description")
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(locations, vec![Some("STREET"), Some("STREET"), Some("ALLEY")]);
    }

    #[test]
    fn test_leading_missing_stays_missing() {
        let df = Imputer::default().impute(make_frame()).unwrap();
        let arrest: Vec<Option<bool>> = df.column("Arrest").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(arrest, vec![None, Some(true), Some(true)]);
    }

    #[test]
    fn test_all_missing_column_untouched() {
        let beat = Series::full_null("Beat", 2, &DataType::Utf8);
        let df = Imputer::default().impute(DataFrame::new(vec![beat]).unwrap()).unwrap();
        assert_eq!(df.column("Beat").unwrap().null_count(), 2);
    }

    #[test]
    fn test_batch_dependence() {
        // Same record, different neighbours, different imputed value
        let a = DataFrame::new(vec![Series::new("Latitude", &[None, Some(10.0)])]).unwrap();
        let b = DataFrame::new(vec![Series::new("Latitude", &[None, Some(10.0), Some(20.0)])]).unwrap();

        let a = Imputer::default().impute(a).unwrap();
        let b = Imputer::default().impute(b).unwrap();
        assert_eq!(floats(&a, "Latitude")[0], Some(10.0));
        assert_eq!(floats(&b, "Latitude")[0], Some(15.0));
    }

    #[test]
    fn test_fixed_means_override_batch() {
        let mut means = ColumnMeans::default();
        means.insert("Latitude", 41.8);

        let imputer = Imputer::new(ImputationStrategy::Fixed { means });
        let df = imputer.impute(make_frame()).unwrap();
        assert_eq!(floats(&df, "Latitude")[1], Some(41.8));
    }

    #[test]
    fn test_fixed_means_fill_all_missing_column() {
        let mut means = ColumnMeans::default();
        means.insert("Beat", 1200.0);

        let beat = Series::full_null("Beat", 1, &DataType::Utf8);
        let df = Imputer::new(ImputationStrategy::Fixed { means })
            .impute(DataFrame::new(vec![beat]).unwrap())
            .unwrap();
        assert_eq!(floats(&df, "Beat"), vec![Some(1200.0)]);
    }

    #[test]
    fn test_column_means_fit_and_serialization() {
        let means = ColumnMeans::fit(&make_frame());
        assert_eq!(means.len(), 1);
        assert_eq!(means.get("Latitude"), Some(42.0));

        let json = means.to_json().unwrap();
        assert_eq!(json, r#"{"Latitude":42.0}"#);
        assert_eq!(ColumnMeans::from_json(&json).unwrap(), means);
    }

    #[test]
    fn test_strategy_config_shape() {
        let strategy: ImputationStrategy =
            serde_json::from_str(r#"{"strategy":"fixed","means":{"Ward":20.0}}"#).unwrap();
        match strategy {
            ImputationStrategy::Fixed { means } => assert_eq!(means.get("Ward"), Some(20.0)),
            other => panic!("unexpected strategy {other:?}"),
        }
    }
}
