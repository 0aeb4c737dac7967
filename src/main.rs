//! pv-sizer entry point: CLI wiring and config-driven command dispatch.

mod cli;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pv_sizer::config::SizingConfig;
use pv_sizer::io::detail::read_detail_csv;
use pv_sizer::io::export::{
    export_daily_csv, export_detail_csv, export_hourly_csv, export_scenarios_csv,
};
use pv_sizer::readings::{HourlySeries, TIMESTAMP_OUTPUT_FORMAT};
use pv_sizer::render::{self, ChartOptions, DEFINITIONS};
use pv_sizer::sim::daily::DailyTotals;
use pv_sizer::sim::flow::FlowSimulator;
use pv_sizer::sim::search::ScenarioSearch;
use pv_sizer::sim::stats::EnergyStats;
use pv_sizer::sources::{self, CsvSource, EnergySource};
use pv_sizer::tables::{build_scenarios_table, build_selection_table, build_summary_table};

use crate::cli::{Args, Command, PlotArgs, ReportArgs, SimulateArgs};

/// Width of the daily percentage bars, in characters.
const BAR_WIDTH: usize = 30;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match &args.command {
        Command::Report(report_args) => report(&config, report_args),
        Command::Simulate(simulate_args) => simulate(&config, simulate_args),
        Command::Plot(plot_args) => plot(&config, plot_args),
    }
}

/// `--config` takes priority, then `--preset`, then the demo preset.
fn load_config(args: &Args) -> Result<SizingConfig> {
    let mut config = match (&args.config, &args.preset) {
        (Some(path), _) => SizingConfig::from_file(path)?,
        (None, Some(name)) => SizingConfig::from_preset(name)?,
        (None, None) => SizingConfig::demo(),
    };

    if let Some(seed) = args.seed {
        config.source.seed = seed;
    }
    if let Some(dir) = &args.output_dir {
        config.output = config.output.rooted_at(dir);
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        bail!("invalid configuration ({} error(s))", errors.len());
    }
    Ok(config)
}

fn fetch(config: &SizingConfig, source: &dyn EnergySource) -> Result<HourlySeries> {
    let (start, end) = config.period.bounds()?;
    let series = source
        .series(start, end)
        .with_context(|| format!("failed to load readings from the {} source", source.name()))?;
    let Some((first, last)) = series.span() else {
        bail!("the {} source returned no readings for the configured period", source.name());
    };
    info!(
        source = source.name(),
        hours = series.len(),
        first = %first.format(TIMESTAMP_OUTPUT_FORMAT),
        last = %last.format(TIMESTAMP_OUTPUT_FORMAT),
        "loaded readings"
    );
    Ok(series)
}

fn period_label(series: &HourlySeries) -> String {
    series.span().map_or_else(String::new, |(first, last)| {
        format!(
            " {} to {}",
            first.format(TIMESTAMP_OUTPUT_FORMAT),
            last.format(TIMESTAMP_OUTPUT_FORMAT)
        )
    })
}

fn report(config: &SizingConfig, args: &ReportArgs) -> Result<()> {
    let kind = args.source.unwrap_or(config.source.kind);
    let series = fetch(config, sources::from_config(config, kind).as_ref())?;

    let hours = FlowSimulator::new(config.battery.with_capacity(0.0))?.run(series.readings());
    let days = DailyTotals::from_hours(&hours);

    let out = &config.output;
    export_hourly_csv(&hours, &out.hourly_csv)
        .with_context(|| format!("failed to write {}", out.hourly_csv.display()))?;
    export_daily_csv(&days, &out.daily_csv)
        .with_context(|| format!("failed to write {}", out.daily_csv.display()))?;
    info!(
        hourly = %out.hourly_csv.display(),
        daily = %out.daily_csv.display(),
        "reports written"
    );

    let stats = EnergyStats::from_readings(series.readings());
    let title = format!(
        "Current situation{} ({:.2} kWp)",
        period_label(&series),
        config.installation.pv_actual_kw
    );
    println!("{}", build_summary_table(&title, &stats));
    if let Some(n) = args.bars {
        println!("\n{}", render::daily_bars(&days, Some(n), BAR_WIDTH));
    }
    println!("\n{DEFINITIONS}");
    Ok(())
}

fn simulate(config: &SizingConfig, args: &SimulateArgs) -> Result<()> {
    let series = match &args.input {
        Some(path) => fetch(config, &CsvSource::new(path))?,
        None if config.output.hourly_csv.is_file() => {
            fetch(config, &CsvSource::new(&config.output.hourly_csv))?
        }
        None => fetch(config, sources::from_config(config, config.source.kind).as_ref())?,
    };

    let search = ScenarioSearch::new(config.search_config())?;
    let outcome = search.run(&series);

    let out = &config.output;
    export_scenarios_csv(&outcome.results, &out.scenarios_csv)
        .with_context(|| format!("failed to write {}", out.scenarios_csv.display()))?;
    info!(
        path = %out.scenarios_csv.display(),
        scenarios = outcome.results.len(),
        "scenario table written"
    );

    let title = format!("Current situation{}", period_label(&series));
    println!("{}", build_summary_table(&title, &outcome.baseline.stats()));

    let targets = outcome.targets();
    let passing = outcome.passing().count();
    println!(
        "\nPassing scenarios: {passing} of {} (AC in [{:.0}, {:.0}] %, TC >= {:.0} %)",
        outcome.results.len(),
        targets.ac_min,
        targets.ac_max,
        targets.tc_min
    );
    if passing > 0 {
        println!("{}", build_scenarios_table(outcome.passing().take(args.limit), &targets));
    }

    match &outcome.best {
        Some(best) => println!(
            "\n{}",
            build_selection_table(best, &outcome.baseline, config.installation.pv_actual_kw)
        ),
        None => println!(
            "\nNo scenario meets the targets. Relax [targets] or widen \
             [search] pv_factors / battery_sizes_kwh."
        ),
    }

    let chosen = match (args.pv_factor, args.battery, &outcome.best) {
        (Some(factor), Some(kwh), _) => Some((factor, kwh, "forced")),
        (_, _, Some(best)) => Some((best.pv_factor, best.battery_kwh, "best")),
        _ => None,
    };
    if let Some((factor, kwh, label)) = chosen {
        let detail = search.detail(&series, factor, kwh, label)?;
        export_detail_csv(&detail, &out.detail_csv)
            .with_context(|| format!("failed to write {}", out.detail_csv.display()))?;
        info!(
            path = %out.detail_csv.display(),
            label,
            pv_factor = factor,
            battery_kwh = kwh,
            "detail written"
        );
        if let Some(n) = args.bars {
            let days = DailyTotals::from_hours(&detail.hours);
            println!("\n{}", render::daily_bars(&days, Some(n), BAR_WIDTH));
        }
    }

    println!("\n{DEFINITIONS}");
    Ok(())
}

fn plot(config: &SizingConfig, args: &PlotArgs) -> Result<()> {
    let opts = ChartOptions {
        max_kwh: args.max_kwh,
        step_kwh: args.step_kwh,
        col_width: args.col_width,
    };
    opts.validate()?;

    let path = args.detail.as_ref().unwrap_or(&config.output.detail_csv);
    let detail = read_detail_csv(path)
        .with_context(|| format!("failed to read detail file {}", path.display()))?;

    let days = render::available_days(&detail.hours);
    let day = match args.day {
        None => *days
            .first()
            .ok_or_else(|| anyhow!("no data found in {}", path.display()))?,
        Some(day) if days.contains(&day) => day,
        Some(day) => {
            let available: Vec<String> = days.iter().map(ToString::to_string).collect();
            bail!(
                "{day} is not in {}; available: {}",
                path.display(),
                available.join(", ")
            );
        }
    };

    let meta = &detail.meta;
    if !meta.label.is_empty() {
        println!(
            "Scenario \"{}\": PV x{:.2} ({:.2} kWp), battery {:.1} kWh\n",
            meta.label, meta.pv_factor, meta.pv_kw, meta.battery_kwh
        );
    }
    print!("{}", render::day_chart(&detail.hours, day, &opts));
    Ok(())
}
