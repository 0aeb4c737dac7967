mod common;

use pv_sizer::io::detail::read_detail_csv;
use pv_sizer::io::export::{export_detail_csv, export_hourly_csv, write_scenarios_csv};
use pv_sizer::sim::flow::FlowSimulator;
use pv_sizer::sim::search::{ScenarioSearch, SearchConfig, SearchGrid, Targets};
use pv_sizer::sources::{CsvSource, EnergySource};

fn config(workers: usize) -> SearchConfig {
    SearchConfig {
        battery: common::default_battery(),
        grid: SearchGrid {
            pv_factors: vec![1.0, 1.25, 1.5, 2.0, 2.5],
            battery_sizes_kwh: vec![0.0, 5.0, 10.0, 15.0, 20.0],
            workers: Some(workers),
        },
        targets: Targets {
            ac_min: 60.0,
            ac_max: 100.0,
            tc_min: 60.0,
        },
        pv_actual_kw: 4.0,
    }
}

fn scenarios_csv(workers: usize) -> Vec<u8> {
    let series = common::synthetic_series(42, 21);
    let outcome = ScenarioSearch::new(config(workers))
        .expect("valid search")
        .run(&series);
    let mut buf = Vec::new();
    write_scenarios_csv(&outcome.results, &mut buf).expect("in-memory write");
    buf
}

#[test]
fn results_do_not_depend_on_worker_count() {
    let single = scenarios_csv(1);
    assert_eq!(single, scenarios_csv(1), "repeat run differs");
    for workers in [2, 3, 8, 64] {
        assert_eq!(single, scenarios_csv(workers), "differs with {workers} workers");
    }
}

#[test]
fn best_is_the_smallest_passing_combination() {
    let series = common::synthetic_series(42, 21);
    let outcome = ScenarioSearch::new(config(4)).expect("valid search").run(&series);
    assert_eq!(outcome.results.len(), 25);

    let best = outcome.best.expect("demo data should have a passing scenario");
    let targets = outcome.targets();
    assert!(targets.accepts(&best));
    for r in outcome.passing() {
        assert!(
            (best.pv_factor, best.battery_kwh) <= (r.pv_factor, r.battery_kwh),
            "({}, {}) passes but sorts before the selection",
            r.pv_factor,
            r.battery_kwh
        );
    }
    for r in &outcome.results {
        let inside = r.ac_pct >= targets.ac_min && r.ac_pct <= targets.ac_max && r.tc_pct >= targets.tc_min;
        assert_eq!(inside, targets.accepts(r));
    }
}

#[test]
fn impossible_targets_select_nothing() {
    let series = common::synthetic_series(42, 7);
    let mut cfg = config(2);
    cfg.targets.tc_min = 100.0;
    cfg.targets.ac_min = 100.0;
    let outcome = ScenarioSearch::new(cfg).expect("valid search").run(&series);
    assert!(outcome.best.is_none());
    assert_eq!(outcome.passing().count(), 0);
    assert_eq!(outcome.results.len(), 25);
}

#[test]
fn baseline_matches_unscaled_zero_battery_row() {
    let series = common::synthetic_series(3, 7);
    let outcome = ScenarioSearch::new(config(2)).expect("valid search").run(&series);
    let first = outcome.results[0];
    assert_eq!((first.pv_factor, first.battery_kwh), (1.0, 0.0));
    assert_eq!(outcome.baseline, first);
}

#[test]
fn off_peak_detail_charges_from_the_grid_at_night() {
    let series = common::synthetic_series(42, 7);
    let cfg = SearchConfig {
        battery: common::off_peak_battery(false),
        ..config(2)
    };
    let search = ScenarioSearch::new(cfg).expect("valid search");
    let detail = search
        .detail(&series, 1.5, 10.0, "forced")
        .expect("valid scenario");

    assert_eq!(detail.meta.label, "forced");
    assert_eq!(detail.meta.pv_factor, 1.5);
    assert_eq!(detail.meta.battery_kwh, 10.0);
    assert!((detail.meta.pv_kw - 6.0).abs() < 1e-12);
    assert_eq!(detail.hours.len(), series.len());
    assert!(detail.hours.iter().any(|h| h.grid_to_batt > 0.0));

    let plain = ScenarioSearch::new(config(2))
        .expect("valid search")
        .detail(&series, 1.5, 10.0, "forced")
        .expect("valid scenario");
    assert!(plain.hours.iter().all(|h| h.grid_to_batt == 0.0));
}

#[test]
fn tables_keep_non_round_candidates_exact() {
    let series = common::synthetic_series(42, 3);
    let cfg = SearchConfig {
        grid: SearchGrid {
            pv_factors: vec![1.125, 1.12],
            battery_sizes_kwh: vec![12.25, 12.2],
            workers: Some(1),
        },
        ..config(1)
    };
    let search = ScenarioSearch::new(cfg).expect("valid search");
    let outcome = search.run(&series);

    let mut buf = Vec::new();
    write_scenarios_csv(&outcome.results, &mut buf).expect("in-memory write");
    let mut rdr = csv::Reader::from_reader(buf.as_slice());
    let keys: Vec<(f64, f64)> = rdr
        .records()
        .map(|rec| {
            let rec = rec.expect("valid row");
            (rec[0].parse().expect("factor"), rec[1].parse().expect("size"))
        })
        .collect();
    assert_eq!(
        keys,
        vec![(1.12, 12.2), (1.12, 12.25), (1.125, 12.2), (1.125, 12.25)]
    );

    let dir = common::scratch_dir("detail-keys");
    let path = dir.join("detail.csv");
    let detail = search
        .detail(&series, 1.125, 12.25, "forced")
        .expect("valid scenario");
    export_detail_csv(&detail, &path).expect("detail written");
    let back = read_detail_csv(&path).expect("detail read back");
    assert_eq!(back.meta, detail.meta);
}

#[test]
fn hourly_report_reloads_the_same_readings() {
    let series = common::synthetic_series(5, 4);
    let hours = FlowSimulator::new(common::default_battery().with_capacity(0.0))
        .expect("valid battery")
        .run(series.readings());

    let dir = common::scratch_dir("hourly-reload");
    let path = dir.join("hourly.csv");
    export_hourly_csv(&hours, &path).expect("hourly written");
    let reloaded = CsvSource::new(&path).series(None, None).expect("hourly read back");
    assert_eq!(reloaded.readings(), series.readings());
}
