//! Temporal feature extraction
//!
//! Derives time-of-day and weekday features from the incident timestamp:
//! - `hour`, `minute`, `weekday` (0 = Monday) and `hourfloat`
//! - A cyclical `x`/`y` (sine/cosine) encoding of the time of day, so that
//!   23:59 and 00:01 land next to each other
//! - Weekday indicators `wd_1..wd_6` and hour indicators `h_1..h_23`, with
//!   Monday and hour 0 as reference levels

use crate::encoder::OneHotEncoder;
use crate::error::PipelineError;
use crate::types::{require_column, text_values, MISSING_CELL};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::{DataFrame, NamedFrom, Series};
use std::f64::consts::PI;
use tracing::debug;

/// Raw timestamp column
pub const DATE_COLUMN: &str = "Date";

/// Weekday indicator prefix
pub const WEEKDAY_PREFIX: &str = "wd";

/// Hour indicator prefix
pub const HOUR_PREFIX: &str = "h";

/// Date-time layouts accepted for the timestamp column, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Time-of-day components of one timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
}

impl TimeOfDay {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            hour: dt.hour(),
            minute: dt.minute(),
            weekday: dt.weekday().num_days_from_monday(),
        }
    }

    /// Fractional hour of the day
    pub fn hourfloat(&self) -> f64 {
        self.hour as f64 + self.minute as f64 / 60.0
    }

    /// Position on the 24h unit circle as `(x, y) = (sin θ, cos θ)`
    pub fn cyclical(&self) -> (f64, f64) {
        cyclical_encoding(self.hourfloat())
    }
}

/// Map an hour in `[0, 24)` onto the unit circle
pub fn cyclical_encoding(hourfloat: f64) -> (f64, f64) {
    let theta = 2.0 * PI * hourfloat / 24.0;
    (theta.sin(), theta.cos())
}

/// Parse a timestamp in any accepted layout (timezone offsets are dropped)
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Encoder adding temporal features from the `Date` column
pub struct TemporalEncoder;

impl TemporalEncoder {
    /// Weekday indicators (Monday dropped)
    pub fn weekday_encoder() -> OneHotEncoder {
        OneHotEncoder::new(WEEKDAY_PREFIX, (0..7).map(|d| d.to_string())).drop_first()
    }

    /// Hour indicators (hour 0 dropped)
    pub fn hour_encoder() -> OneHotEncoder {
        OneHotEncoder::new(HOUR_PREFIX, (0..24).map(|h| h.to_string())).drop_first()
    }

    /// Parse the timestamp of a single cell
    pub fn parse_cell(row: usize, cell: Option<&str>) -> Result<TimeOfDay, PipelineError> {
        cell.and_then(parse_timestamp)
            .map(|dt| TimeOfDay::from_datetime(&dt))
            .ok_or_else(|| PipelineError::ParseError {
                row,
                value: cell.unwrap_or(MISSING_CELL).to_string(),
            })
    }

    /// Parse every timestamp of a column, one result per row
    pub fn parse_column(
        series: &Series,
    ) -> Result<Vec<Result<TimeOfDay, PipelineError>>, PipelineError> {
        Ok(text_values(series)?
            .iter()
            .enumerate()
            .map(|(row, cell)| Self::parse_cell(row, cell.as_deref()))
            .collect())
    }

    /// Add `hour, minute, weekday, hourfloat, x, y`, weekday and hour indicators
    pub fn encode(mut df: DataFrame) -> Result<DataFrame, PipelineError> {
        let times = Self::parse_column(require_column(&df, DATE_COLUMN)?)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let number_column = |name: &str, f: &dyn Fn(&TimeOfDay) -> f64| -> Series {
            Series::new(name, times.iter().map(f).collect::<Vec<f64>>())
        };

        df.with_column(number_column("hour", &|t| t.hour as f64))?;
        df.with_column(number_column("minute", &|t| t.minute as f64))?;
        df.with_column(number_column("weekday", &|t| t.weekday as f64))?;
        df.with_column(number_column("hourfloat", &|t| t.hourfloat()))?;
        df.with_column(number_column("x", &|t| t.cyclical().0))?;
        df.with_column(number_column("y", &|t| t.cyclical().1))?;

        let weekdays = Series::new(
            WEEKDAY_PREFIX,
            times.iter().map(|t| t.weekday.to_string()).collect::<Vec<_>>(),
        );
        for indicator in Self::weekday_encoder().encode(&weekdays)? {
            df.with_column(indicator)?;
        }

        let hours = Series::new(
            HOUR_PREFIX,
            times.iter().map(|t| t.hour.to_string()).collect::<Vec<_>>(),
        );
        for indicator in Self::hour_encoder().encode(&hours)? {
            df.with_column(indicator)?;
        }

        debug!(rows = df.height(), "temporal features added");
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::TakeRandom;
    use pretty_assertions::assert_eq;

    fn frame_with_dates(dates: &[Option<&str>]) -> DataFrame {
        DataFrame::new(vec![Series::new(DATE_COLUMN, dates)]).unwrap()
    }

    fn number(df: &DataFrame, name: &str, row: usize) -> Option<f64> {
        df.column(name).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2020-01-15 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-15T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("01/15/2020 02:30:00 PM"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-15T14:30:00-06:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2020-01-15"),
            NaiveDate::from_ymd_opt(2020, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_encode_features() {
        // 2020-01-15 is a Wednesday
        let df = TemporalEncoder::encode(frame_with_dates(&[Some("2020-01-15 14:30:00")])).unwrap();

        assert_eq!(number(&df, "hour", 0), Some(14.0));
        assert_eq!(number(&df, "minute", 0), Some(30.0));
        assert_eq!(number(&df, "weekday", 0), Some(2.0));
        assert_eq!(number(&df, "hourfloat", 0), Some(14.5));

        let theta = 2.0 * PI * 14.5 / 24.0;
        assert_eq!(number(&df, "x", 0), Some(theta.sin()));
        assert_eq!(number(&df, "y", 0), Some(theta.cos()));

        assert_eq!(number(&df, "wd_2", 0), Some(1.0));
        assert_eq!(number(&df, "wd_1", 0), Some(0.0));
        assert_eq!(number(&df, "h_14", 0), Some(1.0));
        assert_eq!(number(&df, "h_13", 0), Some(0.0));
    }

    #[test]
    fn test_indicator_columns_are_batch_independent() {
        let df = TemporalEncoder::encode(frame_with_dates(&[Some("2020-01-13 00:05:00")])).unwrap();

        // Monday at hour 0: both reference levels, every indicator zero
        for d in 1..7 {
            let name = format!("wd_{d}");
            assert_eq!(number(&df, &name, 0), Some(0.0), "{name}");
        }
        for h in 1..24 {
            let name = format!("h_{h}");
            assert_eq!(number(&df, &name, 0), Some(0.0), "{name}");
        }
        assert!(df.column("wd_0").is_err());
        assert!(df.column("h_0").is_err());
    }

    #[test]
    fn test_midnight_continuity() {
        let late = TimeOfDay { hour: 23, minute: 59, weekday: 0 }.cyclical();
        let early = TimeOfDay { hour: 0, minute: 1, weekday: 0 }.cyclical();
        let distance = ((late.0 - early.0).powi(2) + (late.1 - early.1).powi(2)).sqrt();
        assert!(distance < 0.01);
    }

    #[test]
    fn test_cyclical_round_trip() {
        for minutes in 0..(24 * 60) {
            let hourfloat = minutes as f64 / 60.0;
            let (x, y) = cyclical_encoding(hourfloat);
            let recovered = x.atan2(y).rem_euclid(2.0 * PI);
            let expected = 2.0 * PI * hourfloat / 24.0;
            let diff = (recovered - expected).abs();
            assert!(
                diff < 1e-9 || (2.0 * PI - diff) < 1e-9,
                "hourfloat {hourfloat}: {recovered} vs {expected}"
            );
        }
    }

    #[test]
    fn test_unparseable_timestamp() {
        let result = TemporalEncoder::encode(frame_with_dates(&[Some("2020-01-15 14:30:00"), Some("garbage")]));
        match result {
            Err(PipelineError::ParseError { row, value }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "garbage");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_timestamp_is_parse_error() {
        assert!(matches!(
            TemporalEncoder::encode(frame_with_dates(&[None])),
            Err(PipelineError::ParseError { row: 0, .. })
        ));
    }

    #[test]
    fn test_missing_date_column() {
        let df = DataFrame::new(vec![Series::new("Ward", &[5.0])]).unwrap();
        assert!(matches!(
            TemporalEncoder::encode(df),
            Err(PipelineError::SchemaError(_))
        ));
    }
}
