//! Scenario search over PV scaling factors and battery sizes.

use std::num::NonZeroUsize;
use std::thread;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::readings::HourlySeries;

use super::battery::BatteryConfig;
use super::flow::FlowSimulator;
use super::stats::EnergyStats;
use super::types::SimulatedHour;

/// Candidate PV factors and battery sizes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchGrid {
    /// Multipliers applied to the historical PV production (> 0).
    pub pv_factors: Vec<f64>,
    /// Battery capacities to try (kWh, >= 0; 0 means no battery).
    pub battery_sizes_kwh: Vec<f64>,
    /// Worker threads for the cross-product; defaults to the available parallelism.
    pub workers: Option<usize>,
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self {
            pv_factors: vec![1.0, 1.2, 1.5, 1.8, 2.0, 2.2, 2.4, 2.6, 3.0],
            battery_sizes_kwh: vec![
                0.0, 5.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0, 26.0, 28.0, 30.0,
            ],
            workers: None,
        }
    }
}

/// Acceptance thresholds, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Targets {
    pub ac_min: f64,
    /// 100 means no ceiling.
    pub ac_max: f64,
    pub tc_min: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            ac_min: 85.0,
            ac_max: 100.0,
            tc_min: 80.0,
        }
    }
}

impl Targets {
    /// Whether a scenario meets every threshold.
    pub fn accepts(&self, result: &ScenarioResult) -> bool {
        (self.ac_min..=self.ac_max).contains(&result.ac_pct) && result.tc_pct >= self.tc_min
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let pct = 0.0..=100.0;
        if !pct.contains(&self.ac_min) {
            errors.push(ConfigError::new("targets.ac_min", "must be in [0, 100]"));
        }
        if !pct.contains(&self.ac_max) {
            errors.push(ConfigError::new("targets.ac_max", "must be in [0, 100]"));
        } else if self.ac_max < self.ac_min {
            errors.push(ConfigError::new("targets.ac_max", "must be >= targets.ac_min"));
        }
        if !pct.contains(&self.tc_min) {
            errors.push(ConfigError::new("targets.tc_min", "must be in [0, 100]"));
        }
        errors
    }
}

/// Everything the scenario search needs, validated once in [`ScenarioSearch::new`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchConfig {
    /// Battery template; its capacity is replaced by each candidate size.
    pub battery: BatteryConfig,
    pub grid: SearchGrid,
    pub targets: Targets,
    /// Nameplate power of the existing PV installation (kWp).
    pub pv_actual_kw: f64,
}

impl SearchConfig {
    /// Validates all fields and returns a list of errors.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.battery.with_capacity(0.0).validate();

        let grid = &self.grid;
        if grid.pv_factors.is_empty() {
            errors.push(ConfigError::new("search.pv_factors", "must contain at least one value"));
        }
        if let Some(v) = grid.pv_factors.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            errors.push(ConfigError::new(
                "search.pv_factors",
                format!("value {v} must be finite and > 0"),
            ));
        }
        if grid.battery_sizes_kwh.is_empty() {
            errors.push(ConfigError::new(
                "search.battery_sizes_kwh",
                "must contain at least one value",
            ));
        }
        if let Some(v) = grid
            .battery_sizes_kwh
            .iter()
            .find(|v| !(v.is_finite() && **v >= 0.0))
        {
            errors.push(ConfigError::new(
                "search.battery_sizes_kwh",
                format!("value {v} must be finite and >= 0"),
            ));
        }
        if grid.workers == Some(0) {
            errors.push(ConfigError::new("search.workers", "must be >= 1 when set"));
        }

        errors.extend(self.targets.validate());

        if !(self.pv_actual_kw.is_finite() && self.pv_actual_kw >= 0.0) {
            errors.push(ConfigError::new(
                "installation.pv_actual_kw",
                "must be finite and >= 0",
            ));
        }
        errors
    }
}

/// Outcome of one (PV factor, battery size) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioResult {
    pub pv_factor: f64,
    pub battery_kwh: f64,
    pub pv_total: f64,
    pub load_total: f64,
    pub import_total: f64,
    pub export_total: f64,
    pub ac_pct: f64,
    pub tc_pct: f64,
}

impl ScenarioResult {
    pub fn new(pv_factor: f64, battery_kwh: f64, stats: EnergyStats) -> Self {
        Self {
            pv_factor,
            battery_kwh,
            pv_total: stats.pv_total,
            load_total: stats.load_total,
            import_total: stats.import_total,
            export_total: stats.export_total,
            ac_pct: stats.ac_pct,
            tc_pct: stats.tc_pct,
        }
    }

    /// Totals and indicators of this scenario.
    pub fn stats(&self) -> EnergyStats {
        EnergyStats {
            pv_total: self.pv_total,
            load_total: self.load_total,
            import_total: self.import_total,
            export_total: self.export_total,
            ac_pct: self.ac_pct,
            tc_pct: self.tc_pct,
        }
    }
}

/// Complete result set of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// No battery, unscaled PV: the current situation.
    pub baseline: ScenarioResult,
    /// Every combination, ordered by PV factor then battery size.
    pub results: Vec<ScenarioResult>,
    /// First passing combination, if any.
    pub best: Option<ScenarioResult>,
    targets: Targets,
}

impl SearchOutcome {
    pub fn targets(&self) -> Targets {
        self.targets
    }

    /// Combinations meeting the targets, in search order.
    pub fn passing(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| self.targets.accepts(r))
    }
}

/// Metadata attached to a detailed hourly export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioMeta {
    pub label: String,
    pub pv_factor: f64,
    pub battery_kwh: f64,
    pub efficiency: f64,
    pub initial_soc: f64,
    /// Nameplate PV power of the scenario: installed kWp times the factor.
    pub pv_kw: f64,
}

/// Hour-by-hour record of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDetail {
    pub meta: ScenarioMeta,
    pub hours: Vec<SimulatedHour>,
}

/// Evaluates the PV factor × battery size cross-product and picks the first
/// combination that meets the targets.
///
/// Factors and sizes are sorted ascending and de-duplicated, so "first" means
/// smallest PV factor, then smallest battery.
#[derive(Debug, Clone)]
pub struct ScenarioSearch {
    battery: BatteryConfig,
    pv_factors: Vec<f64>,
    simulators: Vec<FlowSimulator>,
    no_battery: FlowSimulator,
    targets: Targets,
    pv_actual_kw: f64,
    workers: usize,
}

impl ScenarioSearch {
    /// Builds a search from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint of [`SearchConfig::validate`].
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err);
        }

        let pv_factors = sorted_unique(config.grid.pv_factors);
        let simulators = sorted_unique(config.grid.battery_sizes_kwh)
            .into_iter()
            .map(|kwh| FlowSimulator::new(config.battery.with_capacity(kwh)))
            .collect::<Result<Vec<_>, _>>()?;
        let no_battery = FlowSimulator::new(config.battery.with_capacity(0.0))?;
        let workers = config.grid.workers.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });

        Ok(Self {
            battery: config.battery,
            pv_factors,
            simulators,
            no_battery,
            targets: config.targets,
            pv_actual_kw: config.pv_actual_kw,
            workers,
        })
    }

    pub fn pv_factors(&self) -> &[f64] {
        &self.pv_factors
    }

    pub fn battery_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.simulators.iter().map(|s| s.config().capacity_kwh)
    }

    pub fn targets(&self) -> Targets {
        self.targets
    }

    /// Zero-battery result on the unscaled series.
    pub fn baseline(&self, series: &HourlySeries) -> ScenarioResult {
        let hours = self.no_battery.run(series.readings());
        ScenarioResult::new(1.0, 0.0, EnergyStats::from_hours(&hours))
    }

    /// Runs the full cross-product.
    pub fn run(&self, series: &HourlySeries) -> SearchOutcome {
        let scaled: Vec<HourlySeries> = self
            .pv_factors
            .iter()
            .map(|&factor| series.scaled_pv(factor))
            .collect();
        let pairs: Vec<(usize, usize)> = (0..scaled.len())
            .flat_map(|f| (0..self.simulators.len()).map(move |b| (f, b)))
            .collect();

        info!(
            hours = series.len(),
            scenarios = pairs.len(),
            workers = self.workers,
            "evaluating scenarios"
        );
        let results = self.evaluate_all(&scaled, &pairs);
        let best = results.iter().find(|r| self.targets.accepts(r)).copied();

        match &best {
            Some(b) => info!(
                pv_factor = b.pv_factor,
                battery_kwh = b.battery_kwh,
                ac_pct = b.ac_pct,
                tc_pct = b.tc_pct,
                "selected scenario"
            ),
            None => warn!(
                ac_min = self.targets.ac_min,
                ac_max = self.targets.ac_max,
                tc_min = self.targets.tc_min,
                "no scenario meets the targets"
            ),
        }

        SearchOutcome {
            baseline: self.baseline(series),
            results,
            best,
            targets: self.targets,
        }
    }

    /// Evaluates `pairs` on contiguous chunks, one scoped thread per chunk,
    /// and concatenates the chunks in order.
    fn evaluate_all(&self, scaled: &[HourlySeries], pairs: &[(usize, usize)]) -> Vec<ScenarioResult> {
        let evaluate = |&(f, b): &(usize, usize)| {
            let hours = self.simulators[b].run(scaled[f].readings());
            ScenarioResult::new(
                self.pv_factors[f],
                self.simulators[b].config().capacity_kwh,
                EnergyStats::from_hours(&hours),
            )
        };

        let workers = self.workers.clamp(1, pairs.len().max(1));
        if workers == 1 {
            return pairs.iter().map(evaluate).collect();
        }

        let chunk = pairs.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = pairs
                .chunks(chunk)
                .map(|part| scope.spawn(move || part.iter().map(evaluate).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    /// Hourly record of one scenario, selected or forced by the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the factor or size is out of range.
    pub fn detail(
        &self,
        series: &HourlySeries,
        pv_factor: f64,
        battery_kwh: f64,
        label: impl Into<String>,
    ) -> Result<ScenarioDetail, ConfigError> {
        if !(pv_factor.is_finite() && pv_factor > 0.0) {
            return Err(ConfigError::new("pv_factor", "must be finite and > 0"));
        }
        let simulator = FlowSimulator::new(self.battery.with_capacity(battery_kwh))?;
        let hours = simulator.run(series.scaled_pv(pv_factor).readings());
        Ok(ScenarioDetail {
            meta: ScenarioMeta {
                label: label.into(),
                pv_factor,
                battery_kwh,
                efficiency: self.battery.efficiency,
                initial_soc: self.battery.initial_soc,
                pv_kw: self.pv_actual_kw * pv_factor,
            },
            hours,
        })
    }
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readings::{HourlyReading, parse_timestamp};

    /// Noon surplus of 2 kWh, evening demand of 2 kWh.
    fn day() -> HourlySeries {
        HourlySeries::new(vec![
            HourlyReading::new(parse_timestamp("2025-06-01 12:00").unwrap(), 2.0, 0.0),
            HourlyReading::new(parse_timestamp("2025-06-01 20:00").unwrap(), 0.0, 2.0),
        ])
        .unwrap()
    }

    fn config(targets: Targets, workers: usize) -> SearchConfig {
        SearchConfig {
            battery: BatteryConfig {
                efficiency: 1.0,
                ..BatteryConfig::default()
            },
            grid: SearchGrid {
                pv_factors: vec![2.0, 1.0],
                battery_sizes_kwh: vec![2.0, 0.0, 1.0],
                workers: Some(workers),
            },
            targets,
            pv_actual_kw: 4.0,
        }
    }

    fn targets(ac_min: f64, ac_max: f64, tc_min: f64) -> Targets {
        Targets {
            ac_min,
            ac_max,
            tc_min,
        }
    }

    #[test]
    fn candidates_are_sorted() {
        let search = ScenarioSearch::new(config(Targets::default(), 1)).unwrap();
        assert_eq!(search.pv_factors(), &[1.0, 2.0]);
        assert_eq!(search.battery_sizes().collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn results_follow_factor_then_size_order() {
        let search = ScenarioSearch::new(config(Targets::default(), 1)).unwrap();
        let outcome = search.run(&day());
        let order: Vec<(f64, f64)> = outcome
            .results
            .iter()
            .map(|r| (r.pv_factor, r.battery_kwh))
            .collect();
        assert_eq!(
            order,
            vec![(1.0, 0.0), (1.0, 1.0), (1.0, 2.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)]
        );
        assert_eq!(outcome.results[1].ac_pct, 50.0);
        assert_eq!(outcome.results[1].tc_pct, 50.0);
    }

    #[test]
    fn first_passing_result_is_selected() {
        let search = ScenarioSearch::new(config(targets(40.0, 100.0, 50.0), 1)).unwrap();
        let best = search.run(&day()).best.unwrap();
        assert_eq!((best.pv_factor, best.battery_kwh), (1.0, 1.0));
    }

    #[test]
    fn ac_ceiling_excludes_full_autoconsumption() {
        let search = ScenarioSearch::new(config(targets(40.0, 90.0, 60.0), 1)).unwrap();
        let outcome = search.run(&day());
        // (1.0, 2.0) reaches 100% AC; (2.0, 2.0) stores half the PV: AC 50%, TC 100%.
        let best = outcome.best.unwrap();
        assert_eq!((best.pv_factor, best.battery_kwh), (2.0, 2.0));
        assert_eq!(outcome.passing().count(), 1);
    }

    #[test]
    fn no_passing_result_is_not_an_error() {
        let mut cfg = config(targets(100.0, 100.0, 100.0), 1);
        cfg.grid.battery_sizes_kwh = vec![0.0];
        let outcome = ScenarioSearch::new(cfg).unwrap().run(&day());
        assert!(outcome.best.is_none());
        assert_eq!(outcome.passing().count(), 0);
        assert_eq!(outcome.results.len(), 2);
    }

    #[test]
    fn baseline_is_the_current_situation() {
        let search = ScenarioSearch::new(config(Targets::default(), 1)).unwrap();
        let series = day();
        let baseline = search.run(&series).baseline;
        let direct = EnergyStats::from_readings(series.readings());
        assert_eq!(baseline, ScenarioResult::new(1.0, 0.0, direct));
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let series = day();
        let single = ScenarioSearch::new(config(Targets::default(), 1)).unwrap().run(&series);
        let many = ScenarioSearch::new(config(Targets::default(), 4)).unwrap().run(&series);
        assert_eq!(single, many);
    }

    #[test]
    fn detail_carries_metadata() {
        let search = ScenarioSearch::new(config(Targets::default(), 1)).unwrap();
        let detail = search.detail(&day(), 2.0, 1.0, "best").unwrap();
        assert_eq!(detail.meta.pv_kw, 8.0);
        assert_eq!(detail.meta.battery_kwh, 1.0);
        assert_eq!(detail.hours.len(), 2);
        assert_eq!(detail.hours[0].pv, 4.0);
    }

    #[test]
    fn detail_rejects_negative_battery() {
        let search = ScenarioSearch::new(config(Targets::default(), 1)).unwrap();
        let err = search.detail(&day(), 1.0, -1.0, "forced").unwrap_err();
        assert_eq!(err.field, "battery.capacity_kwh");
    }

    #[test]
    fn invalid_grid_is_rejected() {
        let mut cfg = config(Targets::default(), 1);
        cfg.grid.pv_factors = vec![1.0, 0.0];
        assert_eq!(ScenarioSearch::new(cfg).unwrap_err().field, "search.pv_factors");

        let mut cfg = config(Targets::default(), 1);
        cfg.grid.battery_sizes_kwh.clear();
        assert_eq!(ScenarioSearch::new(cfg).unwrap_err().field, "search.battery_sizes_kwh");
    }

    #[test]
    fn inverted_ac_band_is_rejected() {
        let errors = targets(90.0, 80.0, 50.0).validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "targets.ac_max");
    }
}
