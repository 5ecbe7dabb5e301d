use storage_model::{DecisionVector, Encoding};

use crate::daily::problem::OptimizationProblem;

/// Starting point of the sequential solver.
///
/// Split starts idle. Signed starts from `sqrt(surplus)`, which leans toward charging
/// in sunny hours, with the last hour discharging the largest of those amounts. The
/// signed objective is concave, so this seed picks which local optimum is reached.
pub fn initial_guess(problem: &OptimizationProblem) -> DecisionVector {
    match problem.encoding() {
        Encoding::Split => DecisionVector::zeros(Encoding::Split, problem.hours()),
        Encoding::Signed => {
            let mut seed: Vec<f64> = problem.surplus().iter().map(|s| s.sqrt()).collect();
            if let Some(peak) = seed.iter().copied().reduce(f64::max) {
                if let Some(last) = seed.last_mut() {
                    *last = -peak;
                }
            }
            DecisionVector::signed(seed)
        }
    }
}
