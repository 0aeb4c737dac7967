use serde::Deserialize;

use crate::config::ConfigError;

/// Stationary battery parameters shared by every simulated scenario.
///
/// The capacity is not part of the configuration file: the scenario search
/// stamps each candidate size onto a copy of this template with
/// [`BatteryConfig::with_capacity`]. A capacity of zero means "no battery".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable capacity (kWh).
    #[serde(skip)]
    pub capacity_kwh: f64,
    /// Efficiency applied on both the charge and the discharge leg (0, 1].
    pub efficiency: f64,
    /// Fraction of capacity that is never discharged [0, 1).
    pub soc_reserve: f64,
    /// State of charge at the start of the window, as a fraction of capacity.
    pub initial_soc: f64,
    /// Maximum PV charging power (kW); unlimited when unset.
    pub charge_limit_kw: Option<f64>,
    /// Maximum discharging power (kW); unlimited when unset.
    pub discharge_limit_kw: Option<f64>,
    /// Grid-assisted charging during off-peak hours.
    pub off_peak: OffPeakConfig,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 0.0,
            efficiency: 0.90,
            soc_reserve: 0.0,
            initial_soc: 0.0,
            charge_limit_kw: None,
            discharge_limit_kw: None,
            off_peak: OffPeakConfig::default(),
        }
    }
}

/// Off-peak grid charging rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffPeakConfig {
    pub enabled: bool,
    /// Local hours of day (0–23) during which grid charging is allowed.
    pub hours: Vec<u32>,
    /// State of charge to reach from the grid, as a fraction of capacity.
    pub target_soc: f64,
    /// Maximum grid charging power (kW).
    pub charge_limit_kw: f64,
    /// Whether the battery may still discharge during off-peak hours.
    pub allow_discharge: bool,
}

impl Default for OffPeakConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hours: vec![22, 23, 0, 1, 2, 3, 4, 5],
            target_soc: 0.8,
            charge_limit_kw: 3.0,
            allow_discharge: false,
        }
    }
}

impl OffPeakConfig {
    /// Hour-of-day lookup table; all false when off-peak charging is disabled.
    pub fn hour_mask(&self) -> [bool; 24] {
        let mut mask = [false; 24];
        if self.enabled {
            for &h in &self.hours {
                if let Some(slot) = mask.get_mut(h as usize) {
                    *slot = true;
                }
            }
        }
        mask
    }
}

impl BatteryConfig {
    /// Returns a copy of this template with the given capacity.
    pub fn with_capacity(&self, capacity_kwh: f64) -> Self {
        Self {
            capacity_kwh,
            ..self.clone()
        }
    }

    /// Floor of the state of charge (kWh).
    pub fn soc_min_kwh(&self) -> f64 {
        self.capacity_kwh * self.soc_reserve
    }

    /// Ceiling of the state of charge (kWh).
    pub fn soc_max_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    /// Checks every battery constraint and returns the violations.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.capacity_kwh.is_finite() && self.capacity_kwh >= 0.0) {
            errors.push(ConfigError::new("battery.capacity_kwh", "must be finite and >= 0"));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            errors.push(ConfigError::new("battery.efficiency", "must be in (0.0, 1.0]"));
        }
        if !(0.0..1.0).contains(&self.soc_reserve) {
            errors.push(ConfigError::new("battery.soc_reserve", "must be in [0.0, 1.0)"));
        }
        // Starting exactly at the reserve is accepted: the default battery
        // starts empty with no reserve.
        if !(0.0..=1.0).contains(&self.initial_soc) {
            errors.push(ConfigError::new("battery.initial_soc", "must be in [0.0, 1.0]"));
        } else if self.initial_soc < self.soc_reserve {
            errors.push(ConfigError::new(
                "battery.initial_soc",
                "must be >= battery.soc_reserve",
            ));
        }
        if let Some(limit) = self.charge_limit_kw {
            if !(limit.is_finite() && limit > 0.0) {
                errors.push(ConfigError::new("battery.charge_limit_kw", "must be > 0 when set"));
            }
        }
        if let Some(limit) = self.discharge_limit_kw {
            if !(limit.is_finite() && limit > 0.0) {
                errors.push(ConfigError::new(
                    "battery.discharge_limit_kw",
                    "must be > 0 when set",
                ));
            }
        }

        let op = &self.off_peak;
        if op.enabled {
            if op.hours.is_empty() {
                errors.push(ConfigError::new(
                    "battery.off_peak.hours",
                    "must list at least one hour when off-peak charging is enabled",
                ));
            }
            if let Some(h) = op.hours.iter().find(|&&h| h > 23) {
                errors.push(ConfigError::new(
                    "battery.off_peak.hours",
                    format!("hour {h} is outside 0..=23"),
                ));
            }
            if !(op.target_soc > self.soc_reserve && op.target_soc <= 1.0) {
                errors.push(ConfigError::new(
                    "battery.off_peak.target_soc",
                    "must be in (battery.soc_reserve, 1.0]",
                ));
            }
            if !(op.charge_limit_kw.is_finite() && op.charge_limit_kw > 0.0) {
                errors.push(ConfigError::new("battery.off_peak.charge_limit_kw", "must be > 0"));
            }
        }

        errors
    }
}
