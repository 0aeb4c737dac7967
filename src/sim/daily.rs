//! Per-calendar-day totals of a simulated window.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::types::SimulatedHour;

/// Energy totals of one calendar day (kWh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub pv: f64,
    pub load: f64,
    pub pv_direct: f64,
    pub pv_to_batt: f64,
    pub batt_to_load: f64,
    pub grid_to_batt: f64,
    /// Import that served the load; `import` also counts grid charging.
    pub grid_to_load: f64,
    pub import: f64,
    pub export: f64,
}

impl DailyTotals {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            pv: 0.0,
            load: 0.0,
            pv_direct: 0.0,
            pv_to_batt: 0.0,
            batt_to_load: 0.0,
            grid_to_batt: 0.0,
            grid_to_load: 0.0,
            import: 0.0,
            export: 0.0,
        }
    }

    /// Net PV surplus of the day; negative when consumption dominates.
    pub fn balance(&self) -> f64 {
        self.pv - self.load
    }

    /// Groups hours by date, in chronological order.
    pub fn from_hours(hours: &[SimulatedHour]) -> Vec<Self> {
        let mut days: BTreeMap<NaiveDate, Self> = BTreeMap::new();
        for h in hours {
            let date = h.timestamp.date();
            let day = days.entry(date).or_insert_with(|| Self::empty(date));
            day.pv += h.pv;
            day.load += h.load;
            day.pv_direct += h.pv_direct;
            day.pv_to_batt += h.pv_to_batt;
            day.batt_to_load += h.batt_to_load;
            day.grid_to_batt += h.grid_to_batt;
            day.grid_to_load += h.grid_to_load;
            day.import += h.import;
            day.export += h.export;
        }
        days.into_values().collect()
    }
}
