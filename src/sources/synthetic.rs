//! Seeded synthetic PV and household-load profiles.
//!
//! Used by the `demo` presets and by tests; no hardware or export file needed.

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use super::{EnergySource, SourceError};
use crate::config::SourceConfig;
use crate::readings::HourlyReading;

/// Hour of day at which the sinusoidal load peaks.
const LOAD_PEAK_HOUR: f64 = 19.0;

/// Generates `days` of hourly readings from a fixed seed.
///
/// PV follows a half-sine between sunrise and sunset with multiplicative
/// gaussian noise. Load is a daily sinusoid peaking in the evening with
/// additive gaussian noise. Both are clamped at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSource {
    pub seed: u64,
    pub days: u32,
    pub pv_kw_peak: f64,
    pub sunrise_hour: u32,
    pub sunset_hour: u32,
    pub pv_noise_std: f64,
    pub base_load_kw: f64,
    pub load_amp_kw: f64,
    pub load_noise_std: f64,
}

impl SyntheticSource {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            seed: config.seed,
            days: config.days,
            pv_kw_peak: config.pv_kw_peak.max(0.0),
            sunrise_hour: config.sunrise_hour,
            sunset_hour: config.sunset_hour,
            pv_noise_std: config.pv_noise_std.max(0.0),
            base_load_kw: config.base_load_kw.max(0.0),
            load_amp_kw: config.load_amp_kw,
            load_noise_std: config.load_noise_std.max(0.0),
        }
    }

    /// First generated hour when no start bound is given.
    pub fn default_start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// Position of `hour` within the daylight window, as a half-sine in [0, 1].
    fn daylight_frac(&self, hour: u32) -> f64 {
        if hour < self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let span = f64::from(self.sunset_hour - self.sunrise_hour);
        let pos = (f64::from(hour - self.sunrise_hour) + 0.5) / span;
        (PI * pos).sin()
    }

    fn pv_kwh(&self, rng: &mut StdRng, hour: u32) -> f64 {
        let frac = self.daylight_frac(hour);
        if frac <= 0.0 {
            return 0.0;
        }
        let noise_mult = 1.0 + gaussian_noise(rng, self.pv_noise_std);
        (self.pv_kw_peak * frac * noise_mult).max(0.0)
    }

    fn load_kwh(&self, rng: &mut StdRng, hour: u32) -> f64 {
        let angle = 2.0 * PI * (f64::from(hour) - LOAD_PEAK_HOUR) / 24.0;
        let kw = self.base_load_kw
            + self.load_amp_kw * angle.cos()
            + gaussian_noise(rng, self.load_noise_std);
        kw.max(0.0)
    }
}

impl EnergySource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn hourly_readings(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<HourlyReading>, SourceError> {
        let start = start.unwrap_or_else(Self::default_start);
        let mut first = start
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(start);
        if first < start {
            first += Duration::hours(1);
        }

        let mut pv_rng = StdRng::seed_from_u64(self.seed);
        let mut load_rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));

        let readings: Vec<HourlyReading> = (0..i64::from(self.days) * 24)
            .map(|i| first + Duration::hours(i))
            .take_while(|ts| end.is_none_or(|e| *ts < e))
            .map(|ts| {
                let hour = ts.hour();
                let pv = self.pv_kwh(&mut pv_rng, hour);
                let load = self.load_kwh(&mut load_rng, hour);
                HourlyReading::new(ts, pv, load)
            })
            .collect();

        debug!(seed = self.seed, hours = readings.len(), "generated synthetic readings");
        Ok(readings)
    }
}

/// Samples zero-mean gaussian noise with the given standard deviation.
///
/// Uses the Box-Muller transform; returns 0 when `std_dev <= 0`.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z0 * std_dev
}
