//! TOML/JSON sizing configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::readings::parse_timestamp;
use crate::sim::battery::BatteryConfig;
use crate::sim::search::{SearchConfig, SearchGrid, Targets};

/// Top-level configuration parsed from TOML or JSON.
///
/// Every field has a default matching the `demo` preset. Load a file with
/// [`SizingConfig::from_file`] or pick a built-in with
/// [`SizingConfig::from_preset`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizingConfig {
    /// Historical window to replay.
    #[serde(default)]
    pub period: PeriodConfig,
    /// Where the hourly readings come from.
    #[serde(default)]
    pub source: SourceConfig,
    /// The existing PV installation.
    #[serde(default)]
    pub installation: InstallationConfig,
    /// Battery template, including the off-peak rules.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Candidate PV factors and battery sizes.
    #[serde(default)]
    pub search: SearchGrid,
    /// Acceptance thresholds.
    #[serde(default)]
    pub targets: Targets,
    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Historical window, as local timestamps. Missing bounds are open.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodConfig {
    /// Inclusive start.
    pub start: Option<String>,
    /// Exclusive end.
    pub end: Option<String>,
}

impl PeriodConfig {
    /// Parsed `[start, end)` bounds.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the bound that does not parse.
    pub fn bounds(&self) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), ConfigError> {
        let parse = |field: &str, raw: &Option<String>| {
            raw.as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(|e| ConfigError::new(field, e.to_string()))
        };
        Ok((parse("period.start", &self.start)?, parse("period.end", &self.end)?))
    }
}

/// Kind of reading source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Hourly CSV export with `date,pv_diff,load_diff` columns.
    Csv,
    /// Seeded synthetic PV and load profiles.
    Synthetic,
}

/// Reading source parameters.
///
/// The synthetic parameters are ignored by the CSV source and vice versa.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Hourly CSV input.
    pub path: PathBuf,
    /// Master random seed.
    pub seed: u64,
    /// Number of days to generate (must be > 0).
    pub days: u32,
    /// Peak PV output of the installation at noon (kW).
    pub pv_kw_peak: f64,
    /// Hour of day PV production starts (inclusive).
    pub sunrise_hour: u32,
    /// Hour of day PV production stops (exclusive).
    pub sunset_hour: u32,
    /// Multiplicative noise on PV output (fraction).
    pub pv_noise_std: f64,
    /// Average household consumption (kW).
    pub base_load_kw: f64,
    /// Daily swing of household consumption (kW).
    pub load_amp_kw: f64,
    /// Additive noise on consumption (kW).
    pub load_noise_std: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            path: PathBuf::from("data/hourly.csv"),
            seed: 42,
            days: 30,
            pv_kw_peak: 2.6,
            sunrise_hour: 6,
            sunset_hour: 20,
            pv_noise_std: 0.15,
            base_load_kw: 0.8,
            load_amp_kw: 0.4,
            load_noise_std: 0.05,
        }
    }
}

/// The PV installation already on the roof.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallationConfig {
    /// Installed nameplate power (kWp).
    pub pv_actual_kw: f64,
}

impl Default for InstallationConfig {
    fn default() -> Self {
        Self { pv_actual_kw: 4.0 }
    }
}

/// Output file locations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub hourly_csv: PathBuf,
    pub daily_csv: PathBuf,
    pub scenarios_csv: PathBuf,
    pub detail_csv: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            hourly_csv: PathBuf::from("out/hourly.csv"),
            daily_csv: PathBuf::from("out/daily.csv"),
            scenarios_csv: PathBuf::from("out/scenarios.csv"),
            detail_csv: PathBuf::from("out/detail.csv"),
        }
    }
}

impl OutputConfig {
    /// Same file names placed under `dir`.
    pub fn rooted_at(&self, dir: &Path) -> Self {
        let join = |p: &Path| dir.join(p.file_name().unwrap_or(p.as_os_str()));
        Self {
            hourly_csv: join(&self.hourly_csv),
            daily_csv: join(&self.daily_csv),
            scenarios_csv: join(&self.scenarios_csv),
            detail_csv: join(&self.detail_csv),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.efficiency"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl SizingConfig {
    /// Synthetic month of data with the default battery and targets.
    pub fn demo() -> Self {
        Self {
            period: PeriodConfig::default(),
            source: SourceConfig::default(),
            installation: InstallationConfig::default(),
            battery: BatteryConfig::default(),
            search: SearchGrid::default(),
            targets: Targets::default(),
            output: OutputConfig::default(),
        }
    }

    /// Demo data with night-time grid charging enabled.
    pub fn offpeak() -> Self {
        let mut cfg = Self::demo();
        cfg.battery.soc_reserve = 0.1;
        cfg.battery.initial_soc = 0.1;
        cfg.battery.off_peak.enabled = true;
        cfg.output = OutputConfig::default().rooted_at(Path::new("out/offpeak"));
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "offpeak"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "offpeak" => Ok(Self::offpeak()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration file; `.json` files are read as JSON, anything
    /// else as TOML.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the JSON is invalid or contains unknown fields.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::new("json", e.to_string()))
    }

    /// Inputs of the scenario search.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            battery: self.battery.clone(),
            grid: self.search.clone(),
            targets: self.targets,
            pv_actual_kw: self.installation.pv_actual_kw,
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        match self.period.bounds() {
            Ok((Some(start), Some(end))) if start >= end => {
                errors.push(ConfigError::new("period.end", "must be after period.start"));
            }
            Ok(_) => {}
            Err(e) => errors.push(e),
        }

        let src = &self.source;
        match src.kind {
            SourceKind::Csv => {
                if src.path.as_os_str().is_empty() {
                    errors.push(ConfigError::new("source.path", "must not be empty"));
                }
            }
            SourceKind::Synthetic => {
                if src.days == 0 {
                    errors.push(ConfigError::new("source.days", "must be > 0"));
                }
                if src.sunrise_hour >= src.sunset_hour {
                    errors.push(ConfigError::new(
                        "source.sunrise_hour",
                        "must be < source.sunset_hour",
                    ));
                }
                if src.sunset_hour > 24 {
                    errors.push(ConfigError::new("source.sunset_hour", "must be <= 24"));
                }
                for (field, value) in [
                    ("source.pv_kw_peak", src.pv_kw_peak),
                    ("source.pv_noise_std", src.pv_noise_std),
                    ("source.base_load_kw", src.base_load_kw),
                    ("source.load_amp_kw", src.load_amp_kw),
                    ("source.load_noise_std", src.load_noise_std),
                ] {
                    if !(value.is_finite() && value >= 0.0) {
                        errors.push(ConfigError::new(field, "must be finite and >= 0"));
                    }
                }
            }
        }

        errors.extend(self.search_config().validate());
        errors
    }
}
