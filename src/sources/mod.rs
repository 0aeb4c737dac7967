//! Providers of hourly PV/load readings.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::{SizingConfig, SourceKind};
use crate::readings::{HourlyReading, HourlySeries, SeriesError};

pub mod csv_file;
pub mod synthetic;

pub use csv_file::CsvSource;
pub use synthetic::SyntheticSource;

/// Failure while fetching readings.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Anything that can produce hourly readings for a `[start, end)` window.
///
/// Implementations return energies in kWh per hour, local wall-clock
/// timestamps, and may return readings in any order.
pub trait EnergySource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Readings whose timestamp lies in `[start, end)`; missing bounds are open.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the underlying data cannot be read or parsed.
    fn hourly_readings(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<HourlyReading>, SourceError>;

    /// Fetches and validates a full series.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] on read failures or invalid readings.
    fn series(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<HourlySeries, SourceError> {
        let readings = self.hourly_readings(start, end)?;
        Ok(HourlySeries::new(readings)?)
    }
}

/// Builds the source selected by `kind`, using the rest of `config` for its
/// parameters.
pub fn from_config(config: &SizingConfig, kind: SourceKind) -> Box<dyn EnergySource> {
    match kind {
        SourceKind::Csv => Box::new(CsvSource::new(config.source.path.clone())),
        SourceKind::Synthetic => Box::new(SyntheticSource::from_config(&config.source)),
    }
}
