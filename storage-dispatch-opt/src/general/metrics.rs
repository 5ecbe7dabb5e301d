use chrono::NaiveDateTime;
use storage_model::{HourRecord, ReportTotals};

/// Grid import without a battery.
pub fn grid_baseline(generation: f64, consumption: f64) -> f64 {
    (consumption - generation).max(0.0)
}

/// Grid import once battery discharge has covered part of the deficit.
pub fn grid_optimized(baseline: f64, discharge: f64) -> f64 {
    (baseline - discharge).max(0.0)
}

/// Share of the solar production that ends up covering local demand, in percent.
///
/// Returns 0 when there is no solar production at all.
pub fn self_consumption_ratio(direct_use: f64, battery_use: f64, potential_solar: f64) -> f64 {
    if potential_solar > 0.0 {
        (direct_use + battery_use) / potential_solar * 100.0
    } else {
        0.0
    }
}

/// Measured and scheduled quantities of one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourFlows {
    pub datetime: NaiveDateTime,
    pub day: usize,
    pub generation: f64,
    pub consumption: f64,
    pub charge: f64,
    pub discharge: f64,
    pub state_of_charge: f64,
    pub carbon_intensity: Option<f64>,
}

pub fn hour_record(flows: HourFlows) -> HourRecord {
    let baseline = grid_baseline(flows.generation, flows.consumption);
    let optimized = grid_optimized(baseline, flows.discharge);
    let co2_emitted = flows.carbon_intensity.map(|ci| baseline * ci);
    let co2_optimized = flows.carbon_intensity.map(|ci| optimized * ci);
    let co2_avoided = co2_emitted.zip(co2_optimized).map(|(e, o)| e - o);

    HourRecord {
        datetime: flows.datetime,
        day: flows.day,
        generation: flows.generation,
        consumption: flows.consumption,
        battery_charge: flows.charge,
        battery_discharge: flows.discharge,
        state_of_charge: flows.state_of_charge,
        surplus: (flows.generation - flows.consumption).max(0.0),
        unmet_demand: baseline,
        carbon_intensity: flows.carbon_intensity,
        grid_baseline: baseline,
        grid_optimized: optimized,
        co2_emitted,
        co2_optimized,
        co2_avoided,
    }
}

/// Run totals. CO2 sums are `None` unless every hour carries a carbon intensity.
pub fn totals(records: &[HourRecord], failed_days: usize) -> ReportTotals {
    let co2_emitted: Option<f64> = records.iter().map(|r| r.co2_emitted).sum();
    let co2_optimized: Option<f64> = records.iter().map(|r| r.co2_optimized).sum();
    let co2_avoided: Option<f64> = records.iter().map(|r| r.co2_avoided).sum();

    let direct_use: f64 = records
        .iter()
        .map(|r| r.generation.min(r.consumption))
        .sum();
    let battery_use: f64 = records.iter().map(|r| r.battery_discharge).sum();
    let potential_solar: f64 = records.iter().map(|r| r.generation).sum();

    ReportTotals {
        co2_emitted,
        co2_optimized,
        co2_avoided,
        direct_use,
        battery_use,
        potential_solar,
        self_consumption_ratio: self_consumption_ratio(direct_use, battery_use, potential_solar),
        failed_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn flows(generation: f64, consumption: f64, discharge: f64, ci: Option<f64>) -> HourFlows {
        HourFlows {
            datetime: NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
            day: 1,
            generation,
            consumption,
            charge: 0.0,
            discharge,
            state_of_charge: 0.0,
            carbon_intensity: ci,
        }
    }

    #[test]
    fn test_grid_figures() {
        assert_eq!(grid_baseline(2.0, 5.0), 3.0);
        assert_eq!(grid_baseline(6.0, 5.0), 0.0);
        assert_eq!(grid_optimized(3.0, 1.0), 2.0);
        assert_eq!(grid_optimized(3.0, 4.0), 0.0);
    }

    #[test]
    fn test_hour_record_co2() {
        let record = hour_record(flows(2.0, 5.0, 1.0, Some(100.0)));
        assert_eq!(record.grid_baseline, 3.0);
        assert_eq!(record.grid_optimized, 2.0);
        assert_eq!(record.co2_emitted, Some(300.0));
        assert_eq!(record.co2_optimized, Some(200.0));
        assert_eq!(record.co2_avoided, Some(100.0));
        assert_eq!(record.unmet_demand, 3.0);
        assert_eq!(record.surplus, 0.0);

        let record = hour_record(flows(2.0, 5.0, 1.0, None));
        assert_eq!(record.co2_avoided, None);
    }

    #[test]
    fn test_ratio_without_solar_is_zero() {
        assert_eq!(self_consumption_ratio(0.0, 0.0, 0.0), 0.0);
        assert_eq!(self_consumption_ratio(3.0, 1.0, 8.0), 50.0);
    }

    #[test]
    fn test_totals() {
        let records = vec![
            hour_record(flows(10.0, 4.0, 0.0, Some(50.0))),
            hour_record(flows(0.0, 5.0, 4.0, Some(200.0))),
        ];
        let totals = totals(&records, 0);

        assert_eq!(totals.co2_emitted, Some(1000.0));
        assert_eq!(totals.co2_optimized, Some(200.0));
        assert_eq!(totals.co2_avoided, Some(800.0));
        assert_eq!(totals.direct_use, 4.0);
        assert_eq!(totals.battery_use, 4.0);
        assert_eq!(totals.potential_solar, 10.0);
        assert_eq!(totals.self_consumption_ratio, 80.0);
    }

    #[test]
    fn test_totals_without_intensity() {
        let records = vec![
            hour_record(flows(10.0, 4.0, 0.0, Some(50.0))),
            hour_record(flows(0.0, 5.0, 4.0, None)),
        ];
        let totals = totals(&records, 1);
        assert_eq!(totals.co2_emitted, None);
        assert_eq!(totals.failed_days, 1);
    }
}
