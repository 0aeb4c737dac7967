use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};

use pv_sizer::config::SourceKind;

#[derive(Parser)]
#[command(name = "pv-sizer", author, version, propagate_version = true)]
#[command(about = "Size a home PV + battery installation from hourly history")]
#[command(
    long_about = "Replays hourly PV production and household consumption through a battery \
    model and searches PV scaling factors and battery sizes for the smallest installation \
    that meets autoconsumption and coverage targets.\n\
    \nExamples:\n  \
    pv-sizer report --bars 7                     # Current situation from the demo source\n  \
    pv-sizer --config home.toml simulate         # Scenario search on your own data\n  \
    pv-sizer simulate --pv-factor 1.5 --battery 10\n  \
    pv-sizer plot --day 2025-06-03"
)]
pub struct Args {
    /// Configuration file (TOML, or JSON for `.json` files).
    #[arg(long, global = true, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in configuration preset (demo, offpeak).
    #[arg(long, global = true)]
    pub preset: Option<String>,

    /// Override the seed of the synthetic source.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Write every output file into this directory instead of the configured paths.
    #[arg(long, global = true, env = "PV_SIZER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch readings, write the hourly and daily reports, and show the current situation.
    Report(ReportArgs),

    /// Run the scenario search and write the scenario and detail tables.
    Simulate(SimulateArgs),

    /// Draw the hourly energy split of one day from a detail file.
    Plot(PlotArgs),
}

#[derive(ClapArgs)]
pub struct ReportArgs {
    /// Reading source; defaults to the configured one.
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Print daily percentage bars for the first N days.
    #[arg(long, value_name = "DAYS")]
    pub bars: Option<usize>,
}

#[derive(ClapArgs)]
pub struct SimulateArgs {
    /// Hourly CSV to simulate; defaults to the report output, then to the configured source.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Number of passing scenarios to list.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Force the detail export for this PV factor instead of the best scenario.
    #[arg(long, requires = "battery")]
    pub pv_factor: Option<f64>,

    /// Battery size (kWh) of the forced detail export.
    #[arg(long, requires = "pv_factor", value_name = "KWH")]
    pub battery: Option<f64>,

    /// Print daily percentage bars of the exported scenario for the first N days.
    #[arg(long, value_name = "DAYS")]
    pub bars: Option<usize>,
}

#[derive(ClapArgs)]
pub struct PlotArgs {
    /// Detail CSV; defaults to the configured detail output.
    #[arg(long)]
    pub detail: Option<PathBuf>,

    /// Day to draw; defaults to the first day in the file.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub day: Option<NaiveDate>,

    /// Top of the Y axis (kWh).
    #[arg(long, default_value_t = 5.0)]
    pub max_kwh: f64,

    /// Energy per character row (kWh).
    #[arg(long, default_value_t = 0.5)]
    pub step_kwh: f64,

    /// Characters per hour column.
    #[arg(long, default_value_t = 2)]
    pub col_width: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("pv-sizer").chain(args.iter().copied()))
    }

    #[test]
    fn report_with_defaults() {
        let args = parse(&["report"]).unwrap();
        assert!(args.config.is_none() && args.preset.is_none());
        match args.command {
            Command::Report(r) => {
                assert!(r.source.is_none());
                assert!(r.bars.is_none());
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn global_options_after_subcommand() {
        let args = parse(&["report", "--source", "csv", "--preset", "offpeak", "--seed", "7"]).unwrap();
        assert_eq!(args.preset.as_deref(), Some("offpeak"));
        assert_eq!(args.seed, Some(7));
        match args.command {
            Command::Report(r) => assert_eq!(r.source, Some(SourceKind::Csv)),
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn config_and_preset_are_mutually_exclusive() {
        assert!(parse(&["--config", "a.toml", "--preset", "demo", "report"]).is_err());
    }

    #[test]
    fn forced_scenario_needs_both_values() {
        assert!(parse(&["simulate", "--pv-factor", "1.5"]).is_err());
        assert!(parse(&["simulate", "--battery", "10"]).is_err());
        let args = parse(&["simulate", "--pv-factor", "1.5", "--battery", "10"]).unwrap();
        match args.command {
            Command::Simulate(s) => {
                assert_eq!(s.pv_factor, Some(1.5));
                assert_eq!(s.battery, Some(10.0));
                assert_eq!(s.limit, 10);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn plot_parses_day() {
        let args = parse(&["plot", "--day", "2025-06-03", "--col-width", "3"]).unwrap();
        match args.command {
            Command::Plot(p) => {
                assert_eq!(p.day, NaiveDate::from_ymd_opt(2025, 6, 3));
                assert_eq!(p.col_width, 3);
                assert_eq!(p.max_kwh, 5.0);
            }
            _ => panic!("expected plot"),
        }
        assert!(parse(&["plot", "--day", "June"]).is_err());
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(parse(&["report", "--source", "websocket"]).is_err());
    }
}
