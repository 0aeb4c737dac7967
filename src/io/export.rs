//! CSV export for hourly, daily, scenario and detail tables.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::readings::TIMESTAMP_OUTPUT_FORMAT;
use crate::sim::daily::DailyTotals;
use crate::sim::search::{ScenarioDetail, ScenarioResult};
use crate::sim::types::SimulatedHour;

const HOURLY_HEADER: &str = "date,pv_diff,load_diff,import,export";
const DAILY_HEADER: &str = "date,pv_day_kWh,load_day_kWh,import_kWh,export_kWh,balance_kWh";
const SCENARIOS_HEADER: &str =
    "pv_factor,battery_kWh,pv_tot_kWh,load_tot_kWh,import_kWh,export_kWh,AC_%,TC_%";
pub(crate) const DETAIL_HEADER: &str =
    "date,pv,load,pv_direct,pv_to_batt,batt_to_load,grid_to_batt,import,export,soc";

/// Opens `path` for writing, creating missing parent directories.
fn create(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn header(wtr: &mut csv::Writer<impl Write>, line: &str) -> csv::Result<()> {
    wtr.write_record(line.split(','))
}

/// Writes the hourly report of the current situation to `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_hourly_csv(hours: &[SimulatedHour], path: &Path) -> io::Result<()> {
    write_hourly_csv(hours, create(path)?)
}

/// Writes `date,pv_diff,load_diff,import,export` rows to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_hourly_csv(hours: &[SimulatedHour], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    header(&mut wtr, HOURLY_HEADER)?;
    for h in hours {
        wtr.write_record(&[
            h.timestamp.format(TIMESTAMP_OUTPUT_FORMAT).to_string(),
            h.pv.to_string(),
            h.load.to_string(),
            format!("{:.4}", h.import),
            format!("{:.4}", h.export),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the per-day totals to `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_daily_csv(days: &[DailyTotals], path: &Path) -> io::Result<()> {
    write_daily_csv(days, create(path)?)
}

/// Writes one row per calendar day to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_daily_csv(days: &[DailyTotals], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    header(&mut wtr, DAILY_HEADER)?;
    for d in days {
        wtr.write_record(&[
            d.date.to_string(),
            format!("{:.3}", d.pv),
            format!("{:.3}", d.load),
            format!("{:.3}", d.import),
            format!("{:.3}", d.export),
            format!("{:.3}", d.balance()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every evaluated scenario to `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_scenarios_csv(results: &[ScenarioResult], path: &Path) -> io::Result<()> {
    write_scenarios_csv(results, create(path)?)
}

/// Writes the scenario table to any writer, in the order given.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_scenarios_csv(results: &[ScenarioResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    header(&mut wtr, SCENARIOS_HEADER)?;
    for r in results {
        wtr.write_record(&[
            r.pv_factor.to_string(),
            r.battery_kwh.to_string(),
            format!("{:.2}", r.pv_total),
            format!("{:.2}", r.load_total),
            format!("{:.2}", r.import_total),
            format!("{:.2}", r.export_total),
            format!("{:.2}", r.ac_pct),
            format!("{:.2}", r.tc_pct),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the hourly record of one scenario to `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_detail_csv(detail: &ScenarioDetail, path: &Path) -> io::Result<()> {
    write_detail_csv(detail, create(path)?)
}

/// Writes `#`-prefixed metadata lines followed by the hourly table.
///
/// Scenario keys are written in shortest round-trip form so the reader gets
/// back the exact candidate.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_detail_csv(detail: &ScenarioDetail, mut writer: impl Write) -> io::Result<()> {
    let m = &detail.meta;
    writeln!(writer, "# label={}", m.label)?;
    writeln!(writer, "# pv_factor={}", m.pv_factor)?;
    writeln!(writer, "# battery_kwh={}", m.battery_kwh)?;
    writeln!(writer, "# efficiency={}", m.efficiency)?;
    writeln!(writer, "# initial_soc={}", m.initial_soc)?;
    writeln!(writer, "# pv_kw={}", m.pv_kw)?;

    let mut wtr = csv::Writer::from_writer(writer);
    header(&mut wtr, DETAIL_HEADER)?;
    for h in &detail.hours {
        wtr.write_record(&[
            h.timestamp.format(TIMESTAMP_OUTPUT_FORMAT).to_string(),
            format!("{:.4}", h.pv),
            format!("{:.4}", h.load),
            format!("{:.4}", h.pv_direct),
            format!("{:.4}", h.pv_to_batt),
            format!("{:.4}", h.batt_to_load),
            format!("{:.4}", h.grid_to_batt),
            format!("{:.4}", h.import),
            format!("{:.4}", h.export),
            format!("{:.4}", h.soc),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
