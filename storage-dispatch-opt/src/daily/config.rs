use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use storage_model::{BatteryLimits, Encoding};

use crate::daily::day_opt::SolverOptions;
use crate::daily::objective::ObjectiveKind;

/// Configuration struct holding all run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub hours_per_day: usize, // Length of one optimization period

    // Battery parameters
    pub max_battery_capacity: f64, // Usable capacity in kWh
    pub max_power: f64,            // Charge and discharge power limit in kW
    pub daily_cycle_limit: f64,    // Maximum kWh charged (and discharged) per day

    // Problem shape
    pub objective: ObjectiveKind,
    pub encoding: Encoding,

    // Solver parameters
    pub max_iterations: usize, // Sequential solver iteration cap per day
    pub tolerance: f64,        // Convergence and feasibility tolerance

    pub workers: usize, // Parallel day workers, 0 uses every available core
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        let limits = BatteryLimits::default();
        let solver = SolverOptions::default();
        Self {
            hours_per_day: 24,
            max_battery_capacity: limits.max_battery_capacity,
            max_power: limits.max_power,
            daily_cycle_limit: limits.daily_cycle_limit,
            objective: ObjectiveKind::Co2,
            encoding: Encoding::Split,
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
            workers: 0,
        }
    }
}

impl OptimizationConfig {
    /// Reads a TOML file. Keys that are not present keep their default.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn limits(&self) -> BatteryLimits {
        BatteryLimits {
            max_battery_capacity: self.max_battery_capacity,
            max_power: self.max_power,
            daily_cycle_limit: self.daily_cycle_limit,
        }
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }

    /// Number of worker threads to run, resolving `0` to the machine's parallelism.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = OptimizationConfig::default();
        assert_eq!(config.hours_per_day, 24);
        assert_eq!(config.limits(), BatteryLimits::default());
        assert_eq!(config.objective, ObjectiveKind::Co2);
        assert_eq!(config.encoding, Encoding::Split);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.tolerance, 1e-6);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "objective = \"self-consumption\"").unwrap();
        writeln!(file, "encoding = \"signed\"").unwrap();
        writeln!(file, "max_power = 50.0").unwrap();
        writeln!(file, "workers = 2").unwrap();

        let config = OptimizationConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.objective, ObjectiveKind::SelfConsumption);
        assert_eq!(config.encoding, Encoding::Signed);
        assert_eq!(config.max_power, 50.0);
        assert_eq!(config.max_battery_capacity, 100.0);
        assert_eq!(config.hours_per_day, 24);
        assert_eq!(config.worker_count(), 2);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "objective = \"cheapest\"").unwrap();
        assert!(OptimizationConfig::from_toml_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = OptimizationConfig::from_toml_file("does/not/exist.toml");
        assert!(result.is_err());
    }
}
