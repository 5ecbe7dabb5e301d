use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::battery::BatteryLimits;

/// Hourly site measurements spanning one or more days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSeries {
    pub timestamps: Vec<NaiveDateTime>,
    /// Solar generation per hour in kWh.
    pub generation: Vec<f64>,
    /// Site consumption per hour in kWh.
    pub consumption: Vec<f64>,
    /// Grid carbon intensity per hour in gCO2-eq/kWh, already aligned to `timestamps`.
    pub carbon_intensity: Option<Vec<f64>>,
}

impl SiteSeries {
    /// Builds a series with consecutive hourly timestamps starting at `start`.
    pub fn hourly(
        start: NaiveDateTime,
        generation: Vec<f64>,
        consumption: Vec<f64>,
        carbon_intensity: Option<Vec<f64>>,
    ) -> Self {
        let timestamps = (0..generation.len())
            .map(|hour| start + TimeDelta::hours(hour as i64))
            .collect();
        Self {
            timestamps,
            generation,
            consumption,
            carbon_intensity,
        }
    }

    pub fn len(&self) -> usize {
        self.generation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }
}

/// One independent optimization unit: a single day of hourly data plus battery limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlice {
    /// 1-based day index within the run.
    pub day: usize,
    pub timestamps: Vec<NaiveDateTime>,
    pub generation: Vec<f64>,
    pub consumption: Vec<f64>,
    pub carbon_intensity: Option<Vec<f64>>,
    pub limits: BatteryLimits,
}

impl DaySlice {
    pub fn hours(&self) -> usize {
        self.generation.len()
    }
}
