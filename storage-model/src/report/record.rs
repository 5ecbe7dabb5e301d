use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::report::outcome::{DaySummary, DayWarning};

/// One hour of the final schedule, with the grid and CO2 figures derived from it.
///
/// This is the column contract of the exported results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./report.ts")]
pub struct HourRecord {
    #[schema(value_type = String)]
    pub datetime: NaiveDateTime,
    /// 1-based day index.
    pub day: usize,
    pub generation: f64,
    pub consumption: f64,
    pub battery_charge: f64,
    pub battery_discharge: f64,
    pub state_of_charge: f64,
    pub surplus: f64,
    pub unmet_demand: f64,
    pub carbon_intensity: Option<f64>,
    /// Grid draw without a battery: `max(consumption - generation, 0)`.
    pub grid_baseline: f64,
    /// Grid draw once the battery discharge is applied.
    pub grid_optimized: f64,
    pub co2_emitted: Option<f64>,
    pub co2_optimized: Option<f64>,
    pub co2_avoided: Option<f64>,
}

/// Run-level figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./report.ts")]
pub struct ReportTotals {
    /// Baseline emissions in gCO2-eq, `None` without carbon intensity data.
    pub co2_emitted: Option<f64>,
    pub co2_optimized: Option<f64>,
    pub co2_avoided: Option<f64>,
    /// Solar energy consumed in the same hour it was generated.
    pub direct_use: f64,
    /// Energy delivered to the load from the battery.
    pub battery_use: f64,
    /// Total solar generation.
    pub potential_solar: f64,
    /// Self-consumption ratio "Ra" in percent.
    pub self_consumption_ratio: f64,
    pub failed_days: usize,
}

/// Everything the batch run produces, in day order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./report.ts")]
pub struct AggregateReport {
    pub records: Vec<HourRecord>,
    pub days: Vec<DaySummary>,
    pub warnings: Vec<DayWarning>,
    pub totals: ReportTotals,
}

impl AggregateReport {
    /// Hour records of a single 1-based day.
    pub fn day_records(&self, day: usize) -> Vec<&HourRecord> {
        self.records.iter().filter(|record| record.day == day).collect()
    }
}
