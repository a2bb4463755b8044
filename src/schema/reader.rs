//! CSV input reader
//!
//! Reads a delimited incident file into a polars [`DataFrame`]. By default the
//! first column is treated as an unnamed row index and discarded.
//!
//! Every column is read as text and then typed as a whole: a column whose
//! present cells are all `True`/`False` becomes boolean, one whose present cells
//! all parse as numbers becomes `Float64`, anything else stays text.

use crate::error::PipelineError;
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

/// Cell contents read as missing
pub const NULL_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Reader turning incident CSV files into data frames
#[derive(Debug, Clone)]
pub struct IncidentReader {
    index_column: bool,
}

impl Default for IncidentReader {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentReader {
    /// Reader for comma-separated files with a leading index column
    pub fn new() -> Self {
        Self { index_column: true }
    }

    /// Keep the first column as a regular column
    pub fn without_index_column(mut self) -> Self {
        self.index_column = false;
        self
    }

    /// Read a batch from any reader
    pub fn read<R: Read>(&self, mut input: R) -> Result<DataFrame, PipelineError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.parse(bytes)
    }

    /// Read a batch from a CSV string
    pub fn read_str(&self, csv: &str) -> Result<DataFrame, PipelineError> {
        self.read(csv.as_bytes())
    }

    /// Read a batch from a CSV file
    pub fn read_path(&self, path: &Path) -> Result<DataFrame, PipelineError> {
        let df = self.read(File::open(path)?)?;
        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "read incident file"
        );
        Ok(df)
    }

    fn parse(&self, bytes: Vec<u8>) -> Result<DataFrame, PipelineError> {
        let null_values = NULL_VALUES.iter().map(|v| v.to_string()).collect();
        let mut df = CsvReader::new(Cursor::new(bytes))
            .has_header(true)
            .infer_schema(Some(0))
            .with_null_values(Some(NullValues::AllColumns(null_values)))
            .finish()?;

        if self.index_column && df.width() > 0 {
            let index = df.get_column_names()[0].to_string();
            df = df.drop(&index)?;
        }

        let columns = df
            .get_columns()
            .iter()
            .map(type_column)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DataFrame::new(columns)?)
    }
}

/// Give a text column the narrowest type all of its present cells fit
fn type_column(series: &Series) -> Result<Series, PipelineError> {
    let text = series.utf8()?;
    let present = text.len() - text.null_count();
    if present == 0 {
        return Ok(series.clone());
    }

    let is_flag = |v: &str| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false");
    if text.into_iter().flatten().all(is_flag) {
        let flags: Vec<Option<bool>> = text
            .into_iter()
            .map(|v| v.map(|s| s.eq_ignore_ascii_case("true")))
            .collect();
        debug!(column = series.name(), "typed as boolean");
        return Ok(Series::new(series.name(), flags));
    }

    let numbers = series.cast(&DataType::Float64)?;
    if numbers.null_count() == text.null_count() {
        debug!(column = series.name(), "typed as float");
        return Ok(numbers);
    }

    Ok(series.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
,ID,Date,Location Description,Arrest,Ward
0,11034701,2020-01-15 14:30:00,STREET,True,5.0
1,11034702,2020-01-16 01:05:00,,False,
";

    #[test]
    fn test_index_column_dropped() {
        let df = IncidentReader::new().read_str(SAMPLE).unwrap();
        assert_eq!(
            df.get_column_names(),
            vec!["ID", "Date", "Location Description", "Arrest", "Ward"]
        );
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_column_typing() {
        let df = IncidentReader::new().read_str(SAMPLE).unwrap();
        assert_eq!(df.column("ID").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Ward").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Arrest").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Utf8);

        let wards: Vec<Option<f64>> = df.column("Ward").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(wards, vec![Some(5.0), None]);

        let locations: Vec<Option<&str>> = df
            .column("Location Description")
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(locations, vec![Some("STREET"), None]);
    }

    #[test]
    fn test_null_markers() {
        let csv = ",Ward,Location Description\n0,N/A,NULL\n1,None,<NA>\n2,7,#N/A\n";
        let df = IncidentReader::new().read_str(csv).unwrap();

        assert_eq!(df.column("Ward").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Ward").unwrap().null_count(), 2);
        assert_eq!(df.column("Location Description").unwrap().null_count(), 3);
    }

    #[test]
    fn test_mixed_column_stays_text() {
        let csv = ",Block\n0,041XX W MADISON ST\n1,17\n";
        let df = IncidentReader::new().read_str(csv).unwrap();
        assert_eq!(df.column("Block").unwrap().dtype(), &DataType::Utf8);
    }

    #[test]
    fn test_without_index_column() {
        let df = IncidentReader::new()
            .without_index_column()
            .read_str("ID,Ward\n1,5\n")
            .unwrap();
        assert_eq!(df.get_column_names(), vec!["ID", "Ward"]);
    }

    #[test]
    fn test_missing_file() {
        let result = IncidentReader::new().read_path(Path::new("/nonexistent/incidents.csv"));
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
