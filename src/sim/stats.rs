//! Post-hoc energy indicators from a simulated window.

use std::fmt;

use crate::readings::HourlyReading;

use super::types::SimulatedHour;

/// Totals below this are treated as zero when computing shares (kWh).
const ZERO_TOTAL_KWH: f64 = 1e-9;

/// Energy totals and the two headline indicators of a simulated window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyStats {
    /// Total PV production (kWh).
    pub pv_total: f64,
    /// Total household consumption (kWh).
    pub load_total: f64,
    /// Total grid import, including off-peak battery charging (kWh).
    pub import_total: f64,
    /// Total grid export (kWh).
    pub export_total: f64,
    /// Autoconsumption: share of PV used on-site (%).
    pub ac_pct: f64,
    /// Coverage: share of load met without grid import (%).
    pub tc_pct: f64,
}

impl EnergyStats {
    /// Computes the indicators from raw totals.
    pub fn from_totals(pv_total: f64, load_total: f64, import_total: f64, export_total: f64) -> Self {
        Self {
            pv_total,
            load_total,
            import_total,
            export_total,
            ac_pct: share_pct(pv_total - export_total, pv_total),
            tc_pct: share_pct(load_total - import_total, load_total),
        }
    }

    /// Reduces a simulated window.
    pub fn from_hours(hours: &[SimulatedHour]) -> Self {
        let (pv, load, import, export) = hours.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, h| {
            (acc.0 + h.pv, acc.1 + h.load, acc.2 + h.import, acc.3 + h.export)
        });
        Self::from_totals(pv, load, import, export)
    }

    /// Current situation computed straight from the readings: each hour's PV
    /// serves its own load and the rest is imported or exported.
    pub fn from_readings(readings: &[HourlyReading]) -> Self {
        let (pv, load, import, export) = readings.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, r| {
            let self_used = r.pv_kwh.min(r.load_kwh);
            (
                acc.0 + r.pv_kwh,
                acc.1 + r.load_kwh,
                acc.2 + (r.load_kwh - self_used).max(0.0),
                acc.3 + (r.pv_kwh - self_used).max(0.0),
            )
        });
        Self::from_totals(pv, load, import, export)
    }
}

fn share_pct(part: f64, total: f64) -> f64 {
    if total.abs() < ZERO_TOTAL_KWH {
        0.0
    } else {
        (100.0 * part / total).clamp(0.0, 100.0)
    }
}

impl fmt::Display for EnergyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PV production:    {:.1} kWh", self.pv_total)?;
        writeln!(f, "Consumption:      {:.1} kWh", self.load_total)?;
        writeln!(f, "Grid import:      {:.1} kWh", self.import_total)?;
        writeln!(f, "Grid export:      {:.1} kWh", self.export_total)?;
        writeln!(f, "Autoconsumption:  {:.1}%", self.ac_pct)?;
        write!(f, "Coverage:         {:.1}%", self.tc_pct)
    }
}
