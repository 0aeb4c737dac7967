//! Reads a detail CSV back for plotting.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::readings::parse_timestamp;
use crate::sim::search::{ScenarioDetail, ScenarioMeta};
use crate::sim::types::SimulatedHour;
use crate::sources::SourceError;

#[derive(Debug, Deserialize)]
struct DetailRow {
    date: String,
    pv: f64,
    load: f64,
    pv_direct: f64,
    pv_to_batt: f64,
    batt_to_load: f64,
    grid_to_batt: f64,
    import: f64,
    export: f64,
    soc: f64,
}

/// Loads a file written by [`super::export::export_detail_csv`].
///
/// # Errors
///
/// Returns a [`SourceError`] if the file cannot be read or a row is malformed.
pub fn read_detail_csv(path: &Path) -> Result<ScenarioDetail, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_detail(&content).map_err(|e| match e {
        SourceError::Csv { source, .. } => SourceError::Csv {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn parse_detail(content: &str) -> Result<ScenarioDetail, SourceError> {
    let meta = parse_meta(content);
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut hours = Vec::new();
    for row in rdr.deserialize() {
        let row: DetailRow = row.map_err(|source| SourceError::Csv {
            path: Default::default(),
            source,
        })?;
        hours.push(SimulatedHour {
            timestamp: parse_timestamp(&row.date)?,
            pv: row.pv,
            load: row.load,
            pv_direct: row.pv_direct,
            pv_to_batt: row.pv_to_batt,
            batt_to_load: row.batt_to_load,
            grid_to_batt: row.grid_to_batt,
            grid_to_load: (row.import - row.grid_to_batt).max(0.0),
            import: row.import,
            export: row.export,
            soc: row.soc,
        });
    }
    Ok(ScenarioDetail { meta, hours })
}

/// Collects `# key=value` lines; unknown keys and unparsable values are skipped.
fn parse_meta(content: &str) -> ScenarioMeta {
    let mut meta = ScenarioMeta::default();
    let pairs = content
        .lines()
        .map_while(|line| line.strip_prefix('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()));

    for (key, value) in pairs {
        let number = value.parse::<f64>().ok();
        match (key, number) {
            ("label", _) => meta.label = value.to_string(),
            ("pv_factor", Some(v)) => meta.pv_factor = v,
            ("battery_kwh", Some(v)) => meta.battery_kwh = v,
            ("efficiency", Some(v)) => meta.efficiency = v,
            ("initial_soc", Some(v)) => meta.initial_soc = v,
            ("pv_kw", Some(v)) => meta.pv_kw = v,
            _ => {}
        }
    }
    meta
}
