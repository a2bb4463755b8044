//! Column pruning
//!
//! Removes raw identifiers, intermediate temporal fields, the location text,
//! projected coordinates and administrative fields that the model was not
//! trained on.

use crate::error::PipelineError;
use polars::prelude::DataFrame;
use tracing::debug;

/// Columns removed before the table reaches the model
pub const DROP_COLUMNS: [&str; 21] = [
    "ID",
    "hour",
    "minute",
    "Beat",
    "hourfloat",
    "weekday",
    "Location Description",
    "Date",
    "Year",
    "Updated On",
    "District",
    "Ward",
    "Community Area",
    "X Coordinate",
    "Y Coordinate",
    "Block",
    "Case Number",
    "IUCR",
    "FBI Code",
    "Description",
    "Location",
];

pub struct ColumnPruner;

impl ColumnPruner {
    /// Drop every column of the drop list; an absent one signals upstream schema drift
    pub fn prune(mut df: DataFrame) -> Result<DataFrame, PipelineError> {
        for column in DROP_COLUMNS {
            df = df.drop(column).map_err(|_| {
                PipelineError::SchemaError(format!("expected column {column:?} to drop is absent"))
            })?;
        }
        debug!(remaining = df.width(), "columns pruned");
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};
    use pretty_assertions::assert_eq;

    fn frame_with(columns: &[&str]) -> DataFrame {
        DataFrame::new(columns.iter().map(|c| Series::new(c, &[0.0])).collect()).unwrap()
    }

    #[test]
    fn test_prune_leaves_features() {
        let mut columns: Vec<&str> = DROP_COLUMNS.to_vec();
        columns.extend(["Arrest", "Latitude"]);

        let df = ColumnPruner::prune(frame_with(&columns)).unwrap();
        assert_eq!(df.get_column_names(), vec!["Arrest", "Latitude"]);
    }

    #[test]
    fn test_absent_column_is_schema_error() {
        let columns: Vec<&str> = DROP_COLUMNS.iter().copied().filter(|c| *c != "Beat").collect();
        match ColumnPruner::prune(frame_with(&columns)) {
            Err(PipelineError::SchemaError(msg)) => assert!(msg.contains("Beat")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
