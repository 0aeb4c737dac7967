mod common;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn pv_sizer(args: &[&str], out_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pv-sizer"))
        .args(args)
        .arg("--output-dir")
        .arg(out_dir)
        .env_remove("PV_SIZER_OUTPUT_DIR")
        .env("RUST_LOG", "warn")
        .output()
        .expect("pv-sizer process should run")
}

fn succeed(args: &[&str], out_dir: &Path) -> String {
    let output = pv_sizer(args, out_dir);
    assert!(
        output.status.success(),
        "pv-sizer {args:?} failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

fn fail(args: &[&str], out_dir: &Path) -> String {
    let output = pv_sizer(args, out_dir);
    assert!(!output.status.success(), "pv-sizer {args:?} should fail");
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
        .lines()
        .count()
}

#[test]
fn report_simulate_plot_on_the_demo_preset() {
    let dir = common::scratch_dir("cli-demo");

    let stdout = succeed(&["report", "--preset", "demo", "--bars", "3"], &dir);
    assert!(stdout.contains("Current situation"), "stdout: {stdout}");
    assert!(stdout.contains("Autoconsumption"), "stdout: {stdout}");
    assert_eq!(line_count(&dir.join("hourly.csv")), 30 * 24 + 1);
    assert_eq!(line_count(&dir.join("daily.csv")), 30 + 1);

    let stdout = succeed(
        &["simulate", "--preset", "demo", "--pv-factor", "1.5", "--battery", "10"],
        &dir,
    );
    assert!(stdout.contains("Passing scenarios:"), "stdout: {stdout}");
    let scenarios = fs::read_to_string(dir.join("scenarios.csv")).expect("scenarios written");
    assert!(scenarios.starts_with("pv_factor,battery_kWh,"));
    let detail = fs::read_to_string(dir.join("detail.csv")).expect("detail written");
    assert!(detail.contains("# label=forced"), "detail: {detail}");

    let stdout = succeed(&["plot", "--day", "2025-06-03"], &dir);
    assert!(stdout.contains("Scenario \"forced\""), "stdout: {stdout}");
    assert!(stdout.contains("2025-06-03"), "stdout: {stdout}");

    let stderr = fail(&["plot", "--day", "2024-01-01"], &dir);
    assert!(stderr.contains("available"), "stderr: {stderr}");
}

#[test]
fn simulate_is_reproducible() {
    let first = common::scratch_dir("cli-repro-a");
    let second = common::scratch_dir("cli-repro-b");
    succeed(&["simulate", "--seed", "9"], &first);
    succeed(&["simulate", "--seed", "9"], &second);

    let a = fs::read(first.join("scenarios.csv")).expect("first run output");
    let b = fs::read(second.join("scenarios.csv")).expect("second run output");
    assert_eq!(a, b);
}

#[test]
fn csv_config_runs_end_to_end() {
    let dir = common::scratch_dir("cli-csv");
    let stdout = succeed(&["--config", "configs/sample_csv.toml", "report"], &dir);
    assert!(stdout.contains("3.00 kWp"), "stdout: {stdout}");
    assert_eq!(line_count(&dir.join("hourly.csv")), 72 + 1);
    assert_eq!(line_count(&dir.join("daily.csv")), 3 + 1);

    let stdout = succeed(&["--config", "configs/sample_csv.toml", "simulate"], &dir);
    assert!(stdout.contains("Passing scenarios:"), "stdout: {stdout}");
    // 3 PV factors x 3 battery sizes plus the header
    assert_eq!(line_count(&dir.join("scenarios.csv")), 10);
}

#[test]
fn json_config_is_accepted() {
    let dir = common::scratch_dir("cli-json");
    let stdout = succeed(&["--config", "configs/offpeak.json", "simulate"], &dir);
    assert!(stdout.contains("Passing scenarios:"), "stdout: {stdout}");
    assert_eq!(line_count(&dir.join("scenarios.csv")), 3 * 4 + 1);
}

#[test]
fn shipped_configs_parse_and_validate() {
    use pv_sizer::config::SizingConfig;

    for path in ["configs/demo.toml", "configs/sample_csv.toml", "configs/offpeak.json"] {
        let cfg = SizingConfig::from_file(Path::new(path))
            .unwrap_or_else(|e| panic!("{path} should parse: {e}"));
        assert!(cfg.validate().is_empty(), "{path}: {:?}", cfg.validate());
    }
}

#[test]
fn invalid_configuration_is_reported_by_field() {
    let dir = common::scratch_dir("cli-invalid");
    let stderr = fail(&["--config", "configs/invalid_battery.toml", "report"], &dir);
    assert!(stderr.contains("battery.efficiency"), "stderr: {stderr}");
    assert!(stderr.contains("battery.initial_soc"), "stderr: {stderr}");
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
    assert!(!dir.join("hourly.csv").exists());
}

#[test]
fn unknown_fields_and_presets_are_rejected() {
    let dir = common::scratch_dir("cli-unknown");
    let config = dir.join("typo.toml");
    fs::write(&config, "[battery]\nefficency = 0.9\n").expect("write config");
    let config = config.to_string_lossy().into_owned();

    let stderr = fail(&["--config", &config, "report"], &dir);
    assert!(stderr.contains("efficency"), "stderr: {stderr}");

    let stderr = fail(&["--preset", "nope", "report"], &dir);
    assert!(stderr.contains("unknown preset"), "stderr: {stderr}");
}
