//! Physical feasibility of a day's schedule.
//!
//! Every constraint is expressed as a margin that must be `>= 0` for the schedule to be
//! admissible. The same margins are used to validate what the solver returns.

use storage_model::{DecisionVector, Encoding};

use crate::daily::problem::OptimizationProblem;

pub fn surplus(generation: &[f64], consumption: &[f64]) -> Vec<f64> {
    generation
        .iter()
        .zip(consumption)
        .map(|(g, c)| (g - c).max(0.0))
        .collect()
}

pub fn unmet_demand(generation: &[f64], consumption: &[f64]) -> Vec<f64> {
    generation
        .iter()
        .zip(consumption)
        .map(|(g, c)| (c - g).max(0.0))
        .collect()
}

/// Charging can only use local surplus: `surplus_t - charge_t`.
///
/// In the signed layout this is `surplus_t - x_t`, which is slack for discharge hours.
pub fn surplus_margin(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    let flow = match decision.encoding() {
        Encoding::Split => decision.charge(),
        Encoding::Signed => decision.values().to_vec(),
    };
    problem
        .surplus()
        .iter()
        .zip(flow)
        .map(|(surplus, flow)| surplus - flow)
        .collect()
}

/// Discharge never exceeds unmet demand: `unmet_t - discharge_t`.
///
/// The signed layout has no demand constraint and yields an empty vector.
pub fn demand_margin(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    match decision.encoding() {
        Encoding::Split => problem
            .unmet_demand()
            .iter()
            .zip(decision.discharge())
            .map(|(unmet, discharge)| unmet - discharge)
            .collect(),
        Encoding::Signed => Vec::new(),
    }
}

/// Rated power on both flows: `max_power - charge_t`, then `max_power - discharge_t`.
pub fn power_margin(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    let power = problem.limits().max_power;
    decision
        .charge()
        .into_iter()
        .chain(decision.discharge())
        .map(|flow| power - flow)
        .collect()
}

/// State of charge within `[0, capacity]`: all `soc_t`, then all `capacity - soc_t`.
pub fn soc_margin(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    let capacity = problem.limits().max_battery_capacity;
    let soc = decision.soc_trace();
    let headroom: Vec<f64> = soc.iter().map(|level| capacity - level).collect();
    soc.into_iter().chain(headroom).collect()
}

/// Daily throughput: `limit - total_charge` and `limit - total_discharge`.
pub fn cycle_margin(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    let limit = problem.limits().daily_cycle_limit;
    vec![
        limit - decision.total_charge(),
        limit - decision.total_discharge(),
    ]
}

/// All margins of a schedule, grouped by constraint family.
#[derive(Debug, Clone, PartialEq)]
pub struct Margins {
    pub surplus: Vec<f64>,
    pub demand: Vec<f64>,
    pub power: Vec<f64>,
    pub soc: Vec<f64>,
    pub cycle: Vec<f64>,
}

impl Margins {
    pub fn blocks(&self) -> [(&'static str, &[f64]); 5] {
        [
            ("surplus", self.surplus.as_slice()),
            ("demand", self.demand.as_slice()),
            ("power", self.power.as_slice()),
            ("state of charge", self.soc.as_slice()),
            ("cycle", self.cycle.as_slice()),
        ]
    }

    /// Every margin as one inequality block, in `blocks()` order.
    pub fn concat(&self) -> Vec<f64> {
        self.blocks()
            .into_iter()
            .flat_map(|(_, block)| block.iter().copied())
            .collect()
    }

    /// True when no margin is below `-tolerance`. NaN margins are violations.
    pub fn is_feasible(&self, tolerance: f64) -> bool {
        self.blocks()
            .iter()
            .all(|(_, block)| block.iter().all(|m| m.is_finite() && *m >= -tolerance))
    }

    /// The most violated constraint family and its margin.
    pub fn worst(&self) -> Option<(&'static str, f64)> {
        self.blocks()
            .into_iter()
            .flat_map(|(name, block)| {
                block.iter().map(move |&m| {
                    let m = if m.is_nan() { f64::NEG_INFINITY } else { m };
                    (name, m)
                })
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

pub fn margins(problem: &OptimizationProblem, decision: &DecisionVector) -> Margins {
    Margins {
        surplus: surplus_margin(problem, decision),
        demand: demand_margin(problem, decision),
        power: power_margin(problem, decision),
        soc: soc_margin(problem, decision),
        cycle: cycle_margin(problem, decision),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::objective::ObjectiveKind;
    use storage_model::BatteryLimits;

    fn problem(encoding: Encoding) -> OptimizationProblem {
        OptimizationProblem::new(
            vec![3.0, 0.0, 5.0],
            vec![1.0, 2.0, 5.0],
            None,
            BatteryLimits {
                max_battery_capacity: 4.0,
                max_power: 10.0,
                daily_cycle_limit: 6.0,
            },
            ObjectiveKind::SelfConsumption,
            encoding,
        )
        .unwrap()
    }

    #[test]
    fn test_split_margins() {
        let problem = problem(Encoding::Split);
        let decision = DecisionVector::split(&[2.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        let margins = margins(&problem, &decision);

        assert_eq!(margins.surplus, vec![0.0, 0.0, 0.0]);
        assert_eq!(margins.demand, vec![0.0, 1.0, 0.0]);
        assert_eq!(margins.power, vec![8.0, 10.0, 10.0, 10.0, 9.0, 10.0]);
        assert_eq!(margins.soc, vec![2.0, 1.0, 1.0, 2.0, 3.0, 3.0]);
        assert_eq!(margins.cycle, vec![4.0, 5.0]);
        assert_eq!(margins.concat().len(), 3 + 3 + 6 + 6 + 2);
        assert!(margins.is_feasible(0.0));
    }

    #[test]
    fn test_signed_margins() {
        let problem = problem(Encoding::Signed);
        let decision = DecisionVector::signed(vec![2.0, -1.0, 0.0]);
        let margins = margins(&problem, &decision);

        assert_eq!(margins.surplus, vec![0.0, 1.0, 0.0]);
        assert!(margins.demand.is_empty());
        assert_eq!(margins.soc, vec![2.0, 1.0, 1.0, 2.0, 3.0, 3.0]);
        assert!(margins.is_feasible(0.0));
    }

    #[test]
    fn test_violations_are_reported() {
        let problem = problem(Encoding::Split);
        // Charges more than the surplus and discharges below empty.
        let decision = DecisionVector::split(&[2.5, 0.0, 0.0], &[0.0, 3.0, 0.0]).unwrap();
        let margins = margins(&problem, &decision);

        assert!(!margins.is_feasible(1e-6));
        assert_eq!(margins.worst(), Some(("demand", -1.0)));
    }

    #[test]
    fn test_nan_is_infeasible() {
        let problem = problem(Encoding::Signed);
        let decision = DecisionVector::signed(vec![f64::NAN, 0.0, 0.0]);
        let margins = margins(&problem, &decision);

        assert!(!margins.is_feasible(1.0));
        assert_eq!(margins.worst().map(|(_, m)| m), Some(f64::NEG_INFINITY));
    }
}
