//! Hourly readings from a flat CSV export.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use super::{EnergySource, SourceError};
use crate::readings::{HourlyReading, parse_timestamp};

/// One row of the hourly file. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct HourlyRow {
    date: String,
    pv_diff: f64,
    load_diff: f64,
}

/// Reads `date,pv_diff,load_diff` rows; `;` separated files are accepted too.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<Vec<HourlyReading>, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(detect_delimiter(content))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut readings = Vec::new();
        for row in rdr.deserialize() {
            let row: HourlyRow = row.map_err(|source| SourceError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let timestamp = parse_timestamp(&row.date)?;
            readings.push(HourlyReading::new(timestamp, row.pv_diff, row.load_diff));
        }
        Ok(readings)
    }
}

impl EnergySource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn hourly_readings(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<HourlyReading>, SourceError> {
        let content = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut readings = self.parse(&content)?;
        let total = readings.len();
        readings.retain(|r| {
            start.is_none_or(|s| r.timestamp >= s) && end.is_none_or(|e| r.timestamp < e)
        });
        debug!(
            path = %self.path.display(),
            rows = total,
            kept = readings.len(),
            "read hourly csv"
        );
        Ok(readings)
    }
}

/// `;` when the header line has more semicolons than commas, `,` otherwise.
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let count = |c: char| header.matches(c).count();
    if count(';') > count(',') { b';' } else { b',' }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> CsvSource {
        CsvSource::new("memory.csv")
    }

    #[test]
    fn parses_comma_separated_rows() {
        let content = "date,pv_diff,load_diff\n\
                       2025-06-01 12:00,2.5,0.75\n\
                       2025-06-01 13:00,3.0,1.0\n";
        let readings = source().parse(content).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].pv_kwh, 2.5);
        assert_eq!(readings[1].load_kwh, 1.0);
        assert_eq!(readings[1].hour_of_day(), 13);
    }

    #[test]
    fn parses_semicolon_separated_rows_with_extra_columns() {
        let content = "date;pv_diff;load_diff;import\n\
                       2025-06-01T08:00:00;0.4;0.6;0.2\n";
        let readings = source().parse(content).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].pv_kwh, 0.4);
        assert_eq!(readings[0].hour_of_day(), 8);
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let content = "date,pv_diff\n2025-06-01 12:00,2.5\n";
        let err = source().parse(content).unwrap_err();
        assert!(matches!(err, SourceError::Csv { .. }));
    }

    #[test]
    fn bad_timestamp_is_a_series_error() {
        let content = "date,pv_diff,load_diff\nnoon,2.5,0.75\n";
        let err = source().parse(content).unwrap_err();
        assert!(matches!(err, SourceError::Series(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let src = CsvSource::new("/nonexistent/pv-sizer/hourly.csv");
        let err = src.hourly_readings(None, None).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("a;b;c\n1,5;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }
}
