pub mod decision;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;

/// Physical and operational limits of the battery, shared by every hour of a day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./battery.ts")]
pub struct BatteryLimits {
    /// Usable storage capacity in kWh.
    pub max_battery_capacity: f64,
    /// Rated power in kW, applied to both charging and discharging.
    pub max_power: f64,
    /// Maximum energy charged (and discharged) within one day, in kWh.
    pub daily_cycle_limit: f64,
}

impl Default for BatteryLimits {
    fn default() -> Self {
        Self {
            max_battery_capacity: 100.0,
            max_power: 100.0,
            daily_cycle_limit: 100.0,
        }
    }
}

/// Layout of a [`decision::DecisionVector`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, TS,
)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "./battery.ts")]
pub enum Encoding {
    /// `2H` non-negative values: hourly charge followed by hourly discharge.
    #[default]
    #[schema(rename = "split")]
    Split,
    /// `H` values: positive entries charge, negative entries discharge.
    #[schema(rename = "signed")]
    Signed,
}

impl Encoding {
    /// Number of decision values needed to describe `hours` hours.
    pub fn len_for(self, hours: usize) -> usize {
        match self {
            Encoding::Split => 2 * hours,
            Encoding::Signed => hours,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Split => "split",
            Encoding::Signed => "signed",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(Encoding::Split),
            "signed" => Ok(Encoding::Signed),
            other => Err(format!(
                "unknown encoding '{}', expected 'split' or 'signed'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_lengths() {
        assert_eq!(Encoding::Split.len_for(24), 48);
        assert_eq!(Encoding::Signed.len_for(24), 24);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("split".parse::<Encoding>(), Ok(Encoding::Split));
        assert_eq!(" Signed ".parse::<Encoding>(), Ok(Encoding::Signed));
        assert!("packed".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_default_limits() {
        let limits = BatteryLimits::default();
        assert_eq!(limits.max_battery_capacity, 100.0);
        assert_eq!(limits.max_power, 100.0);
        assert_eq!(limits.daily_cycle_limit, 100.0);
    }
}
