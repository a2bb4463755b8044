//! One-hot encoding
//!
//! Indicator columns are always produced for the encoder's full, fixed category
//! list, so the resulting column set never depends on which categories happen
//! to appear in a batch.

use crate::error::PipelineError;
use polars::prelude::*;

/// Separator between prefix and category in indicator column names
pub const PREFIX_SEPARATOR: &str = "_";

/// Name of the indicator column for `category` under `prefix`
pub fn indicator_name(prefix: &str, category: &str) -> String {
    format!("{prefix}{PREFIX_SEPARATOR}{category}")
}

/// One-hot encoder over a fixed, ordered category list
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    prefix: String,
    categories: Vec<String>,
    drop_first: bool,
}

impl OneHotEncoder {
    pub fn new<I, S>(prefix: &str, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.to_string(),
            categories: categories.into_iter().map(Into::into).collect(),
            drop_first: false,
        }
    }

    /// Omit the first category as the reference level
    pub fn drop_first(mut self) -> Self {
        self.drop_first = true;
        self
    }

    fn encoded_categories(&self) -> &[String] {
        if self.drop_first && !self.categories.is_empty() {
            &self.categories[1..]
        } else {
            &self.categories
        }
    }

    /// Indicator column names, in encoding order
    pub fn column_names(&self) -> Vec<String> {
        self.encoded_categories()
            .iter()
            .map(|c| indicator_name(&self.prefix, c))
            .collect()
    }

    /// Encode one category per row into `Float64` indicator columns of 0/1.
    ///
    /// A row whose category is the reference level, not in the list at all, or
    /// missing gets zeros everywhere.
    pub fn encode(&self, values: &Series) -> Result<Vec<Series>, PipelineError> {
        let values = values.cast(&DataType::Utf8)?;
        let values = values.utf8()?;

        self.encoded_categories()
            .iter()
            .map(|category| {
                let mut indicator = values
                    .equal(category.as_str())
                    .into_series()
                    .cast(&DataType::Float64)?
                    .fill_null(FillNullStrategy::Zero)?;
                indicator.rename(&indicator_name(&self.prefix, category));
                Ok(indicator)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn floats(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_full_category_range_emitted() {
        let encoder = OneHotEncoder::new("c", ["a", "b", "c"]);
        let columns = encoder.encode(&Series::new("c", &["b", "b"])).unwrap();

        let names: Vec<&str> = columns.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["c_a", "c_b", "c_c"]);
        assert_eq!(floats(&columns[0]), vec![Some(0.0), Some(0.0)]);
        assert_eq!(floats(&columns[1]), vec![Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_drop_first_reference_level() {
        let encoder = OneHotEncoder::new("wd", ["0", "1", "2"]).drop_first();
        assert_eq!(encoder.column_names(), vec!["wd_1", "wd_2"]);

        let columns = encoder.encode(&Series::new("wd", &["0", "2"])).unwrap();
        // Reference level encodes as all zeros
        assert_eq!(floats(&columns[0]), vec![Some(0.0), Some(0.0)]);
        assert_eq!(floats(&columns[1]), vec![Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_unknown_or_missing_category_is_all_zero() {
        let encoder = OneHotEncoder::new("h", ["1", "2"]);
        let columns = encoder.encode(&Series::new("h", &[Some("99"), None])).unwrap();
        for column in &columns {
            assert_eq!(floats(column), vec![Some(0.0), Some(0.0)]);
        }
    }
}
