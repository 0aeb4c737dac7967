//! Hourly energy-flow simulator.
//!
//! Each hour is resolved by a fixed plan of allocation steps applied to an
//! [`HourLedger`]: PV first serves the load, then the battery, and a mode
//! decision taken right after PV charging settles whether the battery may
//! discharge or is topped up from the grid instead. The two never happen in
//! the same hour.

use tracing::debug;

use crate::config::ConfigError;
use crate::readings::HourlyReading;

use super::battery::BatteryConfig;
use super::types::SimulatedHour;

/// Residual below which a gap to the off-peak target is treated as closed (kWh).
const TARGET_TOLERANCE_KWH: f64 = 1e-9;

/// Battery behaviour for the remainder of an hour, decided after PV charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HourMode {
    /// Battery discharges into the remaining load.
    Discharge,
    /// Off-peak hour where discharging is not allowed or would cross the
    /// target; battery idles.
    Hold,
    /// Off-peak hour below target; battery charges from the grid.
    GridCharge,
}

/// One allocation step of the hourly plan.
#[derive(Debug, Clone, Copy)]
enum Step {
    DirectUse,
    PvToBattery,
    ChooseMode,
    BatteryToLoad,
    GridToBattery,
}

const HOUR_PLAN: [Step; 5] = [
    Step::DirectUse,
    Step::PvToBattery,
    Step::ChooseMode,
    Step::BatteryToLoad,
    Step::GridToBattery,
];

/// Running balances of a single hour.
#[derive(Debug)]
struct HourLedger {
    off_peak: bool,
    mode: HourMode,
    pv_left: f64,
    load_left: f64,
    pv_direct: f64,
    pv_to_batt: f64,
    batt_to_load: f64,
    grid_to_batt: f64,
}

impl HourLedger {
    fn open(reading: &HourlyReading, off_peak: bool) -> Self {
        Self {
            off_peak,
            mode: HourMode::Discharge,
            pv_left: reading.pv_kwh,
            load_left: reading.load_kwh,
            pv_direct: 0.0,
            pv_to_batt: 0.0,
            batt_to_load: 0.0,
            grid_to_batt: 0.0,
        }
    }
}

/// Replays hourly readings through a battery model.
///
/// The battery configuration is validated once in [`FlowSimulator::new`];
/// [`FlowSimulator::run`] is then total over any well-formed series and holds
/// no state between calls.
#[derive(Debug, Clone)]
pub struct FlowSimulator {
    config: BatteryConfig,
    off_peak_mask: [bool; 24],
    charge_limit: f64,
    discharge_limit: f64,
}

impl FlowSimulator {
    /// Creates a simulator for the given battery.
    ///
    /// # Errors
    ///
    /// Returns the first violated battery constraint.
    pub fn new(config: BatteryConfig) -> Result<Self, ConfigError> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err);
        }
        Ok(Self {
            off_peak_mask: config.off_peak.hour_mask(),
            charge_limit: config.charge_limit_kw.unwrap_or(f64::INFINITY),
            discharge_limit: config.discharge_limit_kw.unwrap_or(f64::INFINITY),
            config,
        })
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    /// Simulates every reading in order, carrying the state of charge across
    /// the whole window.
    pub fn run(&self, readings: &[HourlyReading]) -> Vec<SimulatedHour> {
        debug!(
            capacity_kwh = self.config.capacity_kwh,
            hours = readings.len(),
            "simulating energy flow"
        );

        if self.config.capacity_kwh <= 0.0 {
            return readings
                .iter()
                .map(|r| SimulatedHour::pass_through(r.timestamp, r.pv_kwh, r.load_kwh))
                .collect();
        }

        let mut soc = self.config.capacity_kwh * self.config.initial_soc;
        readings
            .iter()
            .map(|reading| {
                let hour = self.step(reading, soc);
                soc = hour.soc;
                hour
            })
            .collect()
    }

    /// Resolves one hour starting from `soc` (kWh).
    fn step(&self, reading: &HourlyReading, mut soc: f64) -> SimulatedHour {
        let off_peak = self.off_peak_mask[reading.hour_of_day() as usize % 24];
        let mut ledger = HourLedger::open(reading, off_peak);

        for step in HOUR_PLAN {
            match step {
                Step::DirectUse => {
                    let direct = ledger.pv_left.min(ledger.load_left);
                    ledger.pv_direct = direct;
                    ledger.pv_left -= direct;
                    ledger.load_left -= direct;
                }
                Step::PvToBattery => {
                    let stored = self.storable(ledger.pv_left, soc);
                    soc += stored * self.config.efficiency;
                    ledger.pv_to_batt = stored;
                    ledger.pv_left -= stored;
                }
                Step::ChooseMode => {
                    ledger.mode = self.choose_mode(ledger.off_peak, ledger.load_left, soc);
                }
                Step::BatteryToLoad if ledger.mode == HourMode::Discharge => {
                    let delivered = self.deliverable(ledger.load_left, soc);
                    soc -= delivered / self.config.efficiency;
                    ledger.batt_to_load = delivered;
                    ledger.load_left -= delivered;
                }
                Step::GridToBattery if ledger.mode == HourMode::GridCharge => {
                    let drawn = self.grid_chargeable(soc);
                    soc += drawn * self.config.efficiency;
                    ledger.grid_to_batt = drawn;
                }
                Step::BatteryToLoad | Step::GridToBattery => {}
            }
        }

        self.settle(reading, ledger, soc)
    }

    /// Off-peak hours never end below the target: a discharge that would
    /// cross it is skipped and the load goes to the grid instead.
    fn choose_mode(&self, off_peak: bool, load_left: f64, soc: f64) -> HourMode {
        if !off_peak {
            return HourMode::Discharge;
        }
        let target = self.config.off_peak.target_soc * self.config.capacity_kwh;
        if target - soc > TARGET_TOLERANCE_KWH {
            return HourMode::GridCharge;
        }
        if !self.config.off_peak.allow_discharge {
            return HourMode::Hold;
        }
        let after = soc - self.deliverable(load_left, soc) / self.config.efficiency;
        if target - after > TARGET_TOLERANCE_KWH {
            HourMode::Hold
        } else {
            HourMode::Discharge
        }
    }

    /// PV-side energy the battery can absorb this hour.
    fn storable(&self, pv_left: f64, soc: f64) -> f64 {
        let headroom = (self.config.soc_max_kwh() - soc).max(0.0) / self.config.efficiency;
        pv_left.min(self.charge_limit).min(headroom).max(0.0)
    }

    /// Load-side energy the battery can deliver this hour.
    fn deliverable(&self, load_left: f64, soc: f64) -> f64 {
        let available = (soc - self.config.soc_min_kwh()).max(0.0) * self.config.efficiency;
        load_left.min(self.discharge_limit).min(available).max(0.0)
    }

    /// Grid-side energy needed to reach the off-peak target this hour.
    fn grid_chargeable(&self, soc: f64) -> f64 {
        let target = self.config.off_peak.target_soc * self.config.capacity_kwh;
        let gap = (target.min(self.config.soc_max_kwh()) - soc).max(0.0) / self.config.efficiency;
        gap.min(self.config.off_peak.charge_limit_kw).max(0.0)
    }

    fn settle(&self, reading: &HourlyReading, ledger: HourLedger, soc: f64) -> SimulatedHour {
        let grid_to_load = ledger.load_left.max(0.0);
        SimulatedHour {
            timestamp: reading.timestamp,
            pv: reading.pv_kwh,
            load: reading.load_kwh,
            pv_direct: ledger.pv_direct,
            pv_to_batt: ledger.pv_to_batt,
            batt_to_load: ledger.batt_to_load,
            grid_to_batt: ledger.grid_to_batt,
            grid_to_load,
            import: grid_to_load + ledger.grid_to_batt,
            export: ledger.pv_left.max(0.0),
            soc: soc.clamp(self.config.soc_min_kwh(), self.config.soc_max_kwh()),
        }
    }
}
