use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use storage_model::{DecisionVector, Encoding};

use crate::daily::problem::OptimizationProblem;

/// Signed values at or below this count as the discharge side when linearizing.
const IDLE_THRESHOLD: f64 = 1e-9;

/// What a day's schedule is optimized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveKind {
    /// Maximize grid emissions displaced by battery discharge.
    #[default]
    Co2,
    /// Maximize the energy delivered from the battery.
    SelfConsumption,
}

impl ObjectiveKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectiveKind::Co2 => "co2",
            ObjectiveKind::SelfConsumption => "self-consumption",
        }
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Objective value of `decision` (lower is better).
///
/// Both encodings reduce to `-sum(weight_t * discharge_t)`. For the signed layout
/// the discharge of an hour is `max(-x_t, 0)`, so this equals `sum_{x_t < 0} weight_t * x_t`.
pub fn evaluate(problem: &OptimizationProblem, decision: &DecisionVector) -> f64 {
    let displaced: f64 = problem
        .objective_weights()
        .iter()
        .zip(decision.discharge())
        .map(|(weight, discharge)| weight * discharge)
        .sum();
    0.0 - displaced
}

/// A supergradient of [`evaluate`] at `decision`, one entry per decision value.
///
/// The split objective is linear so the result does not depend on `decision`.
/// The signed objective is concave with a kink at zero; idle hours are treated as
/// discharge-capable.
pub fn gradient(problem: &OptimizationProblem, decision: &DecisionVector) -> Vec<f64> {
    let weights = problem.objective_weights();
    match decision.encoding() {
        Encoding::Split => {
            let mut gradient = vec![0.0; weights.len()];
            gradient.extend(weights.iter().map(|weight| -weight));
            gradient
        }
        Encoding::Signed => decision
            .values()
            .iter()
            .zip(&weights)
            .map(|(&value, &weight)| if value <= IDLE_THRESHOLD { weight } else { 0.0 })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_model::BatteryLimits;

    fn problem(
        objective: ObjectiveKind,
        encoding: Encoding,
        ci: Option<Vec<f64>>,
    ) -> OptimizationProblem {
        OptimizationProblem::new(
            vec![4.0, 0.0, 0.0],
            vec![0.0, 3.0, 3.0],
            ci,
            BatteryLimits::default(),
            objective,
            encoding,
        )
        .unwrap()
    }

    #[test]
    fn test_co2_objective_weights_discharge() {
        let problem = problem(ObjectiveKind::Co2, Encoding::Split, Some(vec![100.0, 200.0, 50.0]));
        let decision = DecisionVector::split(&[3.0, 0.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(evaluate(&problem, &decision), -300.0);
    }

    #[test]
    fn test_signed_objective_matches_split() {
        let ci = Some(vec![100.0, 200.0, 50.0]);
        let split_problem = problem(ObjectiveKind::Co2, Encoding::Split, ci.clone());
        let signed_problem = problem(ObjectiveKind::Co2, Encoding::Signed, ci);

        let split = DecisionVector::split(&[3.0, 0.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        let signed = split.to_encoding(Encoding::Signed);

        assert_eq!(signed.values(), &[3.0, -1.0, -2.0]);
        assert_eq!(
            evaluate(&split_problem, &split),
            evaluate(&signed_problem, &signed)
        );
    }

    #[test]
    fn test_self_consumption_counts_energy() {
        let ci = Some(vec![100.0; 3]);
        let problem = problem(ObjectiveKind::SelfConsumption, Encoding::Split, ci);
        let decision = DecisionVector::split(&[3.0, 0.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(evaluate(&problem, &decision), -3.0);
    }

    #[test]
    fn test_co2_without_intensity_uses_unit_weights() {
        let problem = problem(ObjectiveKind::Co2, Encoding::Split, None);
        let decision = DecisionVector::split(&[3.0, 0.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(evaluate(&problem, &decision), -3.0);
    }

    #[test]
    fn test_idle_objective_is_positive_zero() {
        let problem = problem(ObjectiveKind::Co2, Encoding::Signed, Some(vec![100.0; 3]));
        let value = evaluate(&problem, &DecisionVector::zeros(Encoding::Signed, 3));
        assert_eq!(value, 0.0);
        assert!(value.is_sign_positive());
    }

    #[test]
    fn test_gradients() {
        let ci = Some(vec![100.0, 200.0, 50.0]);
        let split_problem = problem(ObjectiveKind::Co2, Encoding::Split, ci.clone());
        let split = DecisionVector::zeros(Encoding::Split, 3);
        assert_eq!(
            gradient(&split_problem, &split),
            vec![0.0, 0.0, 0.0, -100.0, -200.0, -50.0]
        );

        let signed_problem = problem(ObjectiveKind::Co2, Encoding::Signed, ci);
        let signed = DecisionVector::signed(vec![1.0, -1.0, 0.0]);
        assert_eq!(gradient(&signed_problem, &signed), vec![0.0, 200.0, 50.0]);
    }
}
