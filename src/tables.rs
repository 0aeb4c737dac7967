use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::sim::search::{ScenarioResult, Targets};
use crate::sim::stats::EnergyStats;

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

fn right(value: String) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

fn pct_cell(value: f64, threshold: f64) -> Cell {
    right(format!("{value:.1}")).fg(if value >= threshold { Color::Green } else { Color::Reset })
}

/// Energy totals and indicators of one simulated window.
#[must_use]
pub fn build_summary_table(title: &str, stats: &EnergyStats) -> Table {
    let mut table = new_table();
    table.set_header(vec![Cell::new(title).add_attribute(Attribute::Bold), Cell::new("")]);
    for (label, value) in [
        ("PV production", format!("{:.1} kWh", stats.pv_total)),
        ("Consumption", format!("{:.1} kWh", stats.load_total)),
        ("Grid import", format!("{:.1} kWh", stats.import_total)),
        ("Grid export", format!("{:.1} kWh", stats.export_total)),
        ("Autoconsumption (AC)", format!("{:.1} %", stats.ac_pct)),
        ("Coverage (TC)", format!("{:.1} %", stats.tc_pct)),
    ] {
        table.add_row(vec![Cell::new(label), right(value)]);
    }
    table
}

/// Scenario rows with AC/TC highlighted against the targets.
#[must_use]
pub fn build_scenarios_table<'a>(
    results: impl IntoIterator<Item = &'a ScenarioResult>,
    targets: &Targets,
) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "PV factor",
        "Battery",
        "PV total",
        "Load",
        "Import",
        "Export",
        "AC %",
        "TC %",
    ]);
    for r in results {
        table.add_row(vec![
            right(format!("×{:.2}", r.pv_factor)),
            right(format!("{:.1} kWh", r.battery_kwh)),
            right(format!("{:.1}", r.pv_total)),
            right(format!("{:.1}", r.load_total)),
            right(format!("{:.1}", r.import_total)),
            right(format!("{:.1}", r.export_total)),
            pct_cell(r.ac_pct, targets.ac_min),
            pct_cell(r.tc_pct, targets.tc_min),
        ]);
    }
    table
}

/// Recommended installation, compared with the current situation.
#[must_use]
pub fn build_selection_table(
    best: &ScenarioResult,
    baseline: &ScenarioResult,
    pv_actual_kw: f64,
) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Selection").add_attribute(Attribute::Bold),
        Cell::new("Current"),
        Cell::new("Proposed").add_attribute(Attribute::Bold),
    ]);
    let rows = [
        (
            "PV power",
            format!("{pv_actual_kw:.2} kWp"),
            format!("{:.2} kWp (×{:.2})", pv_actual_kw * best.pv_factor, best.pv_factor),
        ),
        (
            "Battery",
            "none".to_string(),
            format!("{:.1} kWh", best.battery_kwh),
        ),
        (
            "Grid import",
            format!("{:.1} kWh", baseline.import_total),
            format!("{:.1} kWh", best.import_total),
        ),
        (
            "Grid export",
            format!("{:.1} kWh", baseline.export_total),
            format!("{:.1} kWh", best.export_total),
        ),
        (
            "Autoconsumption",
            format!("{:.1} %", baseline.ac_pct),
            format!("{:.1} %", best.ac_pct),
        ),
        (
            "Coverage",
            format!("{:.1} %", baseline.tc_pct),
            format!("{:.1} %", best.tc_pct),
        ),
    ];
    for (label, current, proposed) in rows {
        table.add_row(vec![
            Cell::new(label),
            right(current).add_attribute(Attribute::Dim),
            right(proposed).fg(Color::Green),
        ]);
    }
    table
}
