use storage_model::{BatteryLimits, DaySlice, Encoding};

use crate::daily::error::InputShapeError;
use crate::daily::objective::ObjectiveKind;
use crate::daily::physical;

/// A single day's optimization problem, with the derived surplus and unmet demand
/// computed once up front.
///
/// Every hourly series has the length of `generation`; construction fails otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationProblem {
    generation: Vec<f64>,
    consumption: Vec<f64>,
    carbon_intensity: Option<Vec<f64>>,
    surplus: Vec<f64>,
    unmet_demand: Vec<f64>,
    limits: BatteryLimits,
    objective: ObjectiveKind,
    encoding: Encoding,
}

impl OptimizationProblem {
    pub fn new(
        generation: Vec<f64>,
        consumption: Vec<f64>,
        carbon_intensity: Option<Vec<f64>>,
        limits: BatteryLimits,
        objective: ObjectiveKind,
        encoding: Encoding,
    ) -> Result<Self, InputShapeError> {
        let expected = generation.len();
        check_length("consumption", expected, consumption.len())?;
        if let Some(intensity) = &carbon_intensity {
            check_length("carbon intensity", expected, intensity.len())?;
        }

        let surplus = physical::surplus(&generation, &consumption);
        let unmet_demand = physical::unmet_demand(&generation, &consumption);
        Ok(Self {
            generation,
            consumption,
            carbon_intensity,
            surplus,
            unmet_demand,
            limits,
            objective,
            encoding,
        })
    }

    pub fn from_slice(
        slice: &DaySlice,
        objective: ObjectiveKind,
        encoding: Encoding,
    ) -> Result<Self, InputShapeError> {
        check_length("timestamps", slice.hours(), slice.timestamps.len())?;
        Self::new(
            slice.generation.clone(),
            slice.consumption.clone(),
            slice.carbon_intensity.clone(),
            slice.limits,
            objective,
            encoding,
        )
    }

    pub fn hours(&self) -> usize {
        self.surplus.len()
    }

    pub fn carbon_intensity(&self) -> Option<&[f64]> {
        self.carbon_intensity.as_deref()
    }

    /// `max(generation - consumption, 0)` per hour.
    pub fn surplus(&self) -> &[f64] {
        &self.surplus
    }

    /// `max(consumption - generation, 0)` per hour.
    pub fn unmet_demand(&self) -> &[f64] {
        &self.unmet_demand
    }

    pub fn limits(&self) -> BatteryLimits {
        self.limits
    }

    pub fn objective(&self) -> ObjectiveKind {
        self.objective
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Box bounds applied to every decision value.
    pub fn variable_bounds(&self) -> (f64, f64) {
        let power = self.limits.max_power;
        match self.encoding {
            Encoding::Split => (0.0, power),
            Encoding::Signed => (-power, power),
        }
    }

    /// Per-hour value of one kWh discharged.
    ///
    /// The CO2 objective weighs by carbon intensity. Without intensity data every hour
    /// weighs 1, which is the self-consumption objective.
    pub fn objective_weights(&self) -> Vec<f64> {
        match (self.objective, self.carbon_intensity()) {
            (ObjectiveKind::Co2, Some(intensity)) => intensity.to_vec(),
            _ => vec![1.0; self.hours()],
        }
    }

    /// Largest magnitude in the problem data, used to scale feasibility tolerances.
    pub fn scale(&self) -> f64 {
        let limits = [
            self.limits.max_battery_capacity,
            self.limits.max_power,
            self.limits.daily_cycle_limit,
        ];
        self.generation
            .iter()
            .chain(&self.consumption)
            .chain(&limits)
            .map(|value| value.abs())
            .filter(|value| value.is_finite())
            .fold(0.0, f64::max)
    }
}

fn check_length(
    series: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), InputShapeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(InputShapeError::LengthMismatch {
            series,
            expected,
            actual,
        })
    }
}
