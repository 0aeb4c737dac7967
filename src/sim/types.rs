//! Per-hour simulation output.

use std::fmt;

use chrono::NaiveDateTime;

use crate::readings::TIMESTAMP_OUTPUT_FORMAT;

/// Energy split of one simulated hour. All values are kWh and non-negative.
///
/// Conservation holds for every hour:
/// - `pv = pv_direct + pv_to_batt + export`
/// - `load = pv_direct + batt_to_load + grid_to_load`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedHour {
    /// Start of the hour.
    pub timestamp: NaiveDateTime,
    /// PV production.
    pub pv: f64,
    /// Household consumption.
    pub load: f64,
    /// PV consumed directly by the load.
    pub pv_direct: f64,
    /// PV sent into the battery (before charge losses).
    pub pv_to_batt: f64,
    /// Energy delivered by the battery to the load (after discharge losses).
    pub batt_to_load: f64,
    /// Grid energy drawn to charge the battery during off-peak hours.
    pub grid_to_batt: f64,
    /// Grid energy drawn to serve the load.
    pub grid_to_load: f64,
    /// Total grid import: `grid_to_load + grid_to_batt`.
    pub import: f64,
    /// PV sent to the grid.
    pub export: f64,
    /// Battery state of charge at the end of the hour (kWh).
    pub soc: f64,
}

impl SimulatedHour {
    /// Pass-through split used when there is no battery.
    pub fn pass_through(timestamp: NaiveDateTime, pv: f64, load: f64) -> Self {
        let pv_direct = pv.min(load);
        let export = (pv - pv_direct).max(0.0);
        let grid_to_load = (load - pv_direct).max(0.0);
        Self {
            timestamp,
            pv,
            load,
            pv_direct,
            pv_to_batt: 0.0,
            batt_to_load: 0.0,
            grid_to_batt: 0.0,
            grid_to_load,
            import: grid_to_load,
            export,
            soc: 0.0,
        }
    }
}

impl fmt::Display for SimulatedHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | pv={:.3} load={:.3} | direct={:.3} pv>bat={:.3} bat>load={:.3} \
             grid>bat={:.3} | import={:.3} export={:.3} | soc={:.3} kWh",
            self.timestamp.format(TIMESTAMP_OUTPUT_FORMAT),
            self.pv,
            self.load,
            self.pv_direct,
            self.pv_to_batt,
            self.batt_to_load,
            self.grid_to_batt,
            self.import,
            self.export,
            self.soc,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readings::parse_timestamp;

    #[test]
    fn pass_through_surplus_is_exported() {
        let ts = parse_timestamp("2025-06-01 12:00").unwrap();
        let h = SimulatedHour::pass_through(ts, 2.0, 1.0);
        assert_eq!(h.pv_direct, 1.0);
        assert_eq!(h.export, 1.0);
        assert_eq!(h.import, 0.0);
    }

    #[test]
    fn pass_through_deficit_is_imported() {
        let ts = parse_timestamp("2025-06-01 20:00").unwrap();
        let h = SimulatedHour::pass_through(ts, 0.25, 1.0);
        assert_eq!(h.pv_direct, 0.25);
        assert_eq!(h.grid_to_load, 0.75);
        assert_eq!(h.import, 0.75);
        assert_eq!(h.export, 0.0);
    }

    #[test]
    fn display_does_not_panic() {
        let ts = parse_timestamp("2025-06-01 20:00").unwrap();
        let s = format!("{}", SimulatedHour::pass_through(ts, 0.25, 1.0));
        assert!(s.starts_with("2025-06-01 20:00"));
    }
}
