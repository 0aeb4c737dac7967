//! Shared test fixtures for integration tests.

use std::path::PathBuf;

use pv_sizer::config::SourceConfig;
use pv_sizer::readings::HourlySeries;
use pv_sizer::sim::battery::{BatteryConfig, OffPeakConfig};
use pv_sizer::sources::{EnergySource, SyntheticSource};

/// Synthetic series (demo profile) of `days` days.
pub fn synthetic_series(seed: u64, days: u32) -> HourlySeries {
    let source = SyntheticSource::from_config(&SourceConfig {
        seed,
        days,
        ..SourceConfig::default()
    });
    source.series(None, None).expect("synthetic source never fails")
}

/// Default battery template (90% efficiency, 10% reserve, half full at start).
pub fn default_battery() -> BatteryConfig {
    BatteryConfig {
        efficiency: 0.9,
        soc_reserve: 0.1,
        initial_soc: 0.5,
        ..BatteryConfig::default()
    }
}

/// Default battery with night-time grid charging to 80%.
pub fn off_peak_battery(allow_discharge: bool) -> BatteryConfig {
    BatteryConfig {
        off_peak: OffPeakConfig {
            enabled: true,
            allow_discharge,
            ..OffPeakConfig::default()
        },
        ..default_battery()
    }
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pv-sizer-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir should be writable");
    dir
}
