//! Location description binning
//!
//! Collapses the free-text location field onto a fixed vocabulary of the most
//! frequent locations. Everything else is pooled into `OTHER`, and the bounded
//! result is one-hot encoded with no reference level dropped.

use crate::encoder::OneHotEncoder;
use crate::error::PipelineError;
use crate::types::{require_column, text_values};
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::debug;

/// Raw location column
pub const LOCATION_COLUMN: &str = "Location Description";

/// Indicator prefix for location bins
pub const LOCATION_PREFIX: &str = "_type";

/// Bin for every location outside the vocabulary
pub const OTHER_BIN: &str = "OTHER";

/// Recognized location descriptions
pub const LOCATION_VOCABULARY: [&str; 26] = [
    "APARTMENT",
    "RESIDENCE",
    "STREET",
    "SIDEWALK",
    "PARKING LOT / GARAGE (NON RESIDENTIAL)",
    "SMALL RETAIL STORE",
    "RESIDENCE - PORCH / HALLWAY",
    "DEPARTMENT STORE",
    "GROCERY FOOD STORE",
    "OTHER (SPECIFY)",
    "ALLEY",
    "COMMERCIAL / BUSINESS OFFICE",
    "RESTAURANT",
    "CHURCH / SYNAGOGUE / PLACE OF WORSHIP",
    "VEHICLE NON-COMMERCIAL",
    "GAS STATION",
    "RESIDENCE - YARD (FRONT / BACK)",
    "RESIDENCE - GARAGE",
    "HOTEL / MOTEL",
    "DRUG STORE",
    "CONVENIENCE STORE",
    "CTA TRAIN",
    "HOSPITAL BUILDING / GROUNDS",
    "NURSING / RETIREMENT HOME",
    "CHA APARTMENT",
    "CTA BUS",
];

/// Every bin, sorted the way a dummy encoder orders categories
pub fn location_bins() -> Vec<&'static str> {
    let mut bins: Vec<&'static str> = LOCATION_VOCABULARY.to_vec();
    bins.push(OTHER_BIN);
    bins.sort_unstable();
    bins
}

/// Bin a single location cell
pub fn bin_location(cell: Option<&str>) -> &'static str {
    cell.and_then(|s| LOCATION_VOCABULARY.iter().find(|v| **v == s).copied())
        .unwrap_or(OTHER_BIN)
}

/// Binner for the location description column
pub struct LocationBinner;

impl LocationBinner {
    pub fn encoder() -> OneHotEncoder {
        OneHotEncoder::new(LOCATION_PREFIX, location_bins())
    }

    /// Replace the location column with its bins and add one indicator per bin
    pub fn bin(mut df: DataFrame) -> Result<DataFrame, PipelineError> {
        let bins: Vec<&'static str> = text_values(require_column(&df, LOCATION_COLUMN)?)?
            .iter()
            .map(|cell| bin_location(cell.as_deref()))
            .collect();

        let pooled = bins.iter().filter(|b| **b == OTHER_BIN).count();
        debug!(pooled, rows = bins.len(), "location descriptions binned");

        let binned = Series::new(LOCATION_COLUMN, bins);
        for indicator in Self::encoder().encode(&binned)? {
            df.with_column(indicator)?;
        }
        df.with_column(binned)?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::TakeRandom;
    use pretty_assertions::assert_eq;

    fn frame_with_locations(values: &[Option<&str>]) -> DataFrame {
        DataFrame::new(vec![Series::new(LOCATION_COLUMN, values)]).unwrap()
    }

    fn number(df: &DataFrame, name: &str) -> Option<f64> {
        df.column(name).unwrap().f64().unwrap().get(0)
    }

    #[test]
    fn test_known_location_kept() {
        assert_eq!(bin_location(Some("STREET")), "STREET");
        assert_eq!(bin_location(Some("CTA BUS")), "CTA BUS");
    }

    #[test]
    fn test_unknown_location_pooled() {
        assert_eq!(bin_location(Some("AIRPORT TERMINAL")), OTHER_BIN);
        assert_eq!(bin_location(Some("street")), OTHER_BIN);
        assert_eq!(bin_location(None), OTHER_BIN);
        assert_eq!(bin_location(Some("3.0")), OTHER_BIN);
    }

    #[test]
    fn test_vocabulary_closure() {
        let inputs = [
            Some("STREET"),
            Some("OTHER"),
            Some("OTHER (SPECIFY)"),
            Some("BOAT / WATERCRAFT"),
            Some(""),
            Some(" STREET"),
            None,
        ];
        let df = LocationBinner::bin(frame_with_locations(&inputs)).unwrap();

        for value in df.column(LOCATION_COLUMN).unwrap().utf8().unwrap() {
            let value = value.unwrap();
            assert!(
                value == OTHER_BIN || LOCATION_VOCABULARY.contains(&value),
                "unexpected bin {value:?}"
            );
        }
    }

    #[test]
    fn test_one_hot_covers_every_bin() {
        let df = LocationBinner::bin(frame_with_locations(&[Some("ALLEY")])).unwrap();

        // 26 vocabulary entries + OTHER, plus the binned column itself
        assert_eq!(df.width(), 28);
        assert_eq!(number(&df, "_type_ALLEY"), Some(1.0));
        assert_eq!(number(&df, "_type_OTHER"), Some(0.0));

        let set: f64 = location_bins()
            .iter()
            .map(|b| number(&df, &format!("_type_{b}")).unwrap())
            .sum();
        assert_eq!(set, 1.0);
    }

    #[test]
    fn test_bins_sorted() {
        let bins = location_bins();
        assert_eq!(bins.len(), 27);
        assert_eq!(bins[0], "ALLEY");
        assert!(bins.windows(2).all(|w| w[0] < w[1]));
    }
}
