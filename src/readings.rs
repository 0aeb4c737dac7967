//! Hourly PV/load readings and the validated series the simulator consumes.

use chrono::{DateTime, NaiveDateTime, Timelike};
use thiserror::Error;

/// Timestamp layouts accepted for local wall-clock hours, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Rendering used for every timestamp written back to CSV.
pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One hour of PV production and household consumption.
///
/// Energies are hourly deltas in kWh, never cumulative meter totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyReading {
    /// Local wall-clock start of the hour.
    pub timestamp: NaiveDateTime,
    /// PV energy produced during the hour (kWh).
    pub pv_kwh: f64,
    /// Energy consumed by the household during the hour (kWh).
    pub load_kwh: f64,
}

impl HourlyReading {
    pub fn new(timestamp: NaiveDateTime, pv_kwh: f64, load_kwh: f64) -> Self {
        Self {
            timestamp,
            pv_kwh,
            load_kwh,
        }
    }

    /// Local hour of day, 0–23.
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Rejected input while building an [`HourlySeries`].
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("reading at {timestamp}: {field} must be a finite, non-negative kWh value (got {value})")]
    InvalidEnergy {
        timestamp: NaiveDateTime,
        field: &'static str,
        value: f64,
    },

    #[error("duplicate reading for hour {0}")]
    DuplicateHour(NaiveDateTime),

    #[error("cannot parse timestamp \"{0}\"")]
    Timestamp(String),
}

/// Chronologically ordered, validated hourly readings for one historical window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    readings: Vec<HourlyReading>,
}

impl HourlySeries {
    /// Sorts the readings by timestamp and validates them.
    ///
    /// # Errors
    ///
    /// Returns a [`SeriesError`] for a negative or non-finite energy, or when
    /// two readings share the same hour.
    pub fn new(mut readings: Vec<HourlyReading>) -> Result<Self, SeriesError> {
        for r in &readings {
            check_energy(r, "pv_kwh", r.pv_kwh)?;
            check_energy(r, "load_kwh", r.load_kwh)?;
        }
        readings.sort_by_key(|r| r.timestamp);
        if let Some(pair) = readings
            .windows(2)
            .find(|pair| pair[0].timestamp == pair[1].timestamp)
        {
            return Err(SeriesError::DuplicateHour(pair[1].timestamp));
        }
        Ok(Self { readings })
    }

    pub fn readings(&self) -> &[HourlyReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// First and last timestamps of the series.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.readings.first()?.timestamp, self.readings.last()?.timestamp))
    }

    /// Returns a copy with every PV value multiplied by `factor`; load is untouched.
    pub fn scaled_pv(&self, factor: f64) -> Self {
        Self {
            readings: self
                .readings
                .iter()
                .map(|r| HourlyReading::new(r.timestamp, r.pv_kwh * factor, r.load_kwh))
                .collect(),
        }
    }

    /// Keeps readings in `[start, end)`; an absent bound is open.
    pub fn window(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self {
            readings: self
                .readings
                .iter()
                .filter(|r| start.is_none_or(|s| r.timestamp >= s))
                .filter(|r| end.is_none_or(|e| r.timestamp < e))
                .copied()
                .collect(),
        }
    }
}

fn check_energy(r: &HourlyReading, field: &'static str, value: f64) -> Result<(), SeriesError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SeriesError::InvalidEnergy {
            timestamp: r.timestamp,
            field,
            value,
        })
    }
}

/// Parses a local timestamp.
///
/// RFC 3339 input keeps its wall-clock time in the offset it was written in,
/// which is what the off-peak hour test needs.
///
/// # Errors
///
/// Returns [`SeriesError::Timestamp`] if no supported layout matches.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, SeriesError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| SeriesError::Timestamp(raw.to_string()))
}
