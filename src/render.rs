//! Plain-text console rendering: definitions, daily bars and hourly column charts.

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::ConfigError;
use crate::readings::HourlyReading;
use crate::sim::daily::DailyTotals;
use crate::sim::types::SimulatedHour;

/// Glyph for PV consumed on-site.
const DIRECT: char = '█';
/// Glyph for energy moving through the battery.
const BATTERY: char = '▓';
/// Glyph for energy exchanged with the grid.
const GRID: char = '░';

pub const DEFINITIONS: &str = "\
* Autoconsumption (AC) = share of PV production used on-site, directly or through the battery
* Coverage (TC)        = share of total consumption supplied by PV, directly or through the battery";

/// Renders `(ratio, glyph)` segments into a bar of exactly `width` cells.
///
/// Ratios are clamped to [0, 1]; any remainder is padded with spaces.
fn bar(parts: &[(f64, char)], width: usize) -> String {
    let mut out = String::with_capacity(width * 3);
    let mut used = 0;
    for &(ratio, glyph) in parts {
        let cells = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
        let cells = cells.min(width - used);
        out.extend(std::iter::repeat_n(glyph, cells));
        used += cells;
    }
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total } else { 0.0 }
}

/// Two 100% bars per day: how consumption was covered and where PV went.
pub fn daily_bars(days: &[DailyTotals], max_days: Option<usize>, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Daily profiles (bars = 100%)  load: {DIRECT} PV direct {BATTERY} battery {GRID} import  \
         | PV: {DIRECT} direct {BATTERY} to battery {GRID} export"
    );
    for d in days.iter().take(max_days.unwrap_or(usize::MAX)) {
        let load_parts = [
            share(d.pv_direct, d.load),
            share(d.batt_to_load, d.load),
            share(d.grid_to_load, d.load),
        ];
        let pv_parts = [
            share(d.pv_direct, d.pv),
            share(d.pv_to_batt, d.pv),
            share(d.export, d.pv),
        ];
        let glyphs = [DIRECT, BATTERY, GRID];
        let zip = |p: [f64; 3]| -> Vec<(f64, char)> { p.into_iter().zip(glyphs).collect() };
        let pct = |p: [f64; 3]| {
            format!("{:.0}%/{:.0}%/{:.0}%", p[0] * 100.0, p[1] * 100.0, p[2] * 100.0)
        };
        let _ = writeln!(out, "{}  Load: {} {}", d.date, bar(&zip(load_parts), width), pct(load_parts));
        let _ = writeln!(out, "            PV  : {} {}", bar(&zip(pv_parts), width), pct(pv_parts));
    }
    out
}

/// Tallest chart accepted, in character rows.
const MAX_LEVELS: usize = 200;

/// Layout of the hourly column charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    /// Top of the Y axis (kWh).
    pub max_kwh: f64,
    /// Energy per character row (kWh).
    pub step_kwh: f64,
    /// Characters per hour column.
    pub col_width: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            max_kwh: 5.0,
            step_kwh: 0.5,
            col_width: 2,
        }
    }
}

impl ChartOptions {
    /// # Errors
    ///
    /// Returns a `ConfigError` for a non-positive scale, a chart taller than
    /// `MAX_LEVELS` rows, or a zero column width.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_kwh.is_finite() && self.max_kwh > 0.0) {
            return Err(ConfigError::new("max_kwh", "must be > 0"));
        }
        if !(self.step_kwh.is_finite() && self.step_kwh > 0.0) {
            return Err(ConfigError::new("step_kwh", "must be > 0"));
        }
        if self.max_kwh / self.step_kwh > MAX_LEVELS as f64 {
            return Err(ConfigError::new(
                "step_kwh",
                format!("max_kwh / step_kwh must be <= {MAX_LEVELS}"),
            ));
        }
        if self.col_width == 0 {
            return Err(ConfigError::new("col_width", "must be >= 1"));
        }
        Ok(())
    }

    fn levels(&self) -> usize {
        ((self.max_kwh / self.step_kwh).ceil() as usize).clamp(1, MAX_LEVELS)
    }
}

/// Calendar days present in the hours, ascending.
pub fn available_days(hours: &[SimulatedHour]) -> Vec<NaiveDate> {
    hours
        .iter()
        .map(|h| h.timestamp.date())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

type HourStacks = [[f64; 3]; 24];

/// Per-hour consumption stacks (PV direct, battery, import) and production
/// stacks (PV direct, to battery, export) of one day; missing hours are zero.
fn day_stacks(hours: &[SimulatedHour], day: NaiveDate) -> (HourStacks, HourStacks) {
    let mut load = [[0.0; 3]; 24];
    let mut pv = [[0.0; 3]; 24];
    for h in hours.iter().filter(|h| h.timestamp.date() == day) {
        let slot = HourlyReading::new(h.timestamp, h.pv, h.load).hour_of_day() as usize;
        load[slot] = [h.pv_direct, h.batt_to_load, h.grid_to_load];
        pv[slot] = [h.pv_direct, h.pv_to_batt, h.export];
    }
    (load, pv)
}

/// Converts one hour's stack into per-level glyphs, bottom first.
///
/// When the stack overflows the axis, the largest segment is shortened.
fn column(stack: &[f64; 3], opts: &ChartOptions) -> Vec<char> {
    let levels = opts.levels();
    let mut cells: Vec<usize> = stack
        .iter()
        .map(|v| (v.max(0.0) / opts.step_kwh).round() as usize)
        .collect();
    let total: usize = cells.iter().sum();
    if total > levels {
        if let Some(largest) = (0..cells.len()).max_by_key(|&i| cells[i]) {
            cells[largest] = cells[largest].saturating_sub(total - levels);
        }
    }

    let mut col: Vec<char> = cells
        .iter()
        .zip([DIRECT, BATTERY, GRID])
        .flat_map(|(&n, glyph)| std::iter::repeat_n(glyph, n))
        .collect();
    col.resize(levels, ' ');
    col.truncate(levels);
    col
}

fn chart(title: &str, legend: &str, stacks: &HourStacks, opts: &ChartOptions) -> String {
    const GAP: usize = 1;
    let columns: Vec<Vec<char>> = stacks.iter().map(|s| column(s, opts)).collect();

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    for level in (0..opts.levels()).rev() {
        let _ = write!(out, "{:>4.1}│", (level + 1) as f64 * opts.step_kwh);
        for col in &columns {
            out.extend(std::iter::repeat_n(col[level], opts.col_width));
            out.extend(std::iter::repeat_n(' ', GAP));
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }

    let _ = write!(out, "   0└");
    let unit = opts.col_width + GAP;
    for h in 0..24 {
        let _ = write!(out, "{:<unit$}", format!("{h:02}"));
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
    let _ = writeln!(out, "Legend: {legend}");
    out
}

/// Two stacked column charts for `day`: how consumption was covered and
/// where PV production went, hour by hour.
pub fn day_chart(hours: &[SimulatedHour], day: NaiveDate, opts: &ChartOptions) -> String {
    let (load, pv) = day_stacks(hours, day);
    let mut out = chart(
        &format!("Electricity consumption, {day}"),
        &format!("{DIRECT} PV direct  {BATTERY} battery to load  {GRID} import"),
        &load,
        opts,
    );
    out.push('\n');
    out.push_str(&chart(
        &format!("Solar production, {day}"),
        &format!("{DIRECT} PV direct  {BATTERY} PV to battery  {GRID} export"),
        &pv,
        opts,
    ));
    out
}
