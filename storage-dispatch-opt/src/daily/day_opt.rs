use good_lp::solvers::clarabel::ClarabelSolution;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, clarabel,
    constraint, variable,
};
use storage_model::{DaySlice, DecisionVector, Encoding, FailureKind, OptimizationResult};
use tracing::debug;

use crate::daily::error::{InputShapeError, SolveFailure};
use crate::daily::initial_guess::initial_guess;
use crate::daily::objective::{self, ObjectiveKind};
use crate::daily::physical;
use crate::daily::problem::OptimizationProblem;

const SUCCESS_MESSAGE: &str = "Optimization terminated successfully";

/// Cost of storing one kWh, relative to the smallest discharge weight. Among
/// schedules that discharge equally well, the one that stores the least wins.
const STORAGE_PENALTY: f64 = 1e-3;

/// Sequential solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub max_iterations: usize, // Linear programs solved per day at most
    pub tolerance: f64,        // Relative objective improvement that counts as progress
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

/// Optimizes one day at a time. Holds no per-day state, so a single instance can be
/// shared by every worker of a batch.
#[derive(Debug, Clone)]
pub struct DayOptimizer {
    objective: ObjectiveKind,
    encoding: Encoding,
    options: SolverOptions,
}

impl DayOptimizer {
    pub fn new(objective: ObjectiveKind, encoding: Encoding, options: SolverOptions) -> Self {
        Self {
            objective,
            encoding,
            options,
        }
    }

    pub fn objective(&self) -> ObjectiveKind {
        self.objective
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Best schedule for `slice`, or the idle fallback when the day cannot be solved.
    ///
    /// A slice whose series do not share one length is rejected before solving.
    pub fn optimize(&self, slice: &DaySlice) -> Result<OptimizationResult, InputShapeError> {
        let problem = OptimizationProblem::from_slice(slice, self.objective, self.encoding)?;
        Ok(self.solve_problem(&problem))
    }

    pub fn solve_problem(&self, problem: &OptimizationProblem) -> OptimizationResult {
        if problem.hours() == 0 {
            return OptimizationResult {
                decision: DecisionVector::zeros(problem.encoding(), 0),
                success: true,
                objective: 0.0,
                message: SUCCESS_MESSAGE.to_string(),
                iterations: 0,
                failure: None,
            };
        }

        let seed = initial_guess(problem);
        debug!(seed = ?seed.values(), "Initial guess");

        match minimize(problem, seed, &self.options) {
            Ok(run) => OptimizationResult {
                decision: run.decision,
                success: true,
                objective: run.objective,
                message: SUCCESS_MESSAGE.to_string(),
                iterations: run.iterations,
                failure: None,
            },
            Err(failure) => OptimizationResult::fallback(
                problem.encoding(),
                problem.hours(),
                failure.kind,
                failure.message,
                failure.iterations,
            ),
        }
    }
}

/// A converged solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverRun {
    pub decision: DecisionVector,
    pub objective: f64,
    pub iterations: usize,
}

/// Sequential linear programming from `seed`.
///
/// Every iteration linearizes the objective at the current point and solves the linear
/// program over the full set of physical constraints. The returned point is checked
/// against the margins and then repaired to hold them exactly. A point is accepted only
/// if it improves the true objective. The loop stops when the linearization repeats or
/// a step brings no improvement.
pub fn minimize(
    problem: &OptimizationProblem,
    seed: DecisionVector,
    options: &SolverOptions,
) -> Result<SolverRun, SolveFailure> {
    let feasibility = options.tolerance * (1.0 + problem.scale());
    let mut weights = objective::gradient(problem, &seed);
    let mut incumbent: Option<(DecisionVector, f64)> = None;

    for iteration in 1..=options.max_iterations {
        let raw = solve_linear_program(problem, &weights)
            .map_err(|error| resolution_failure(error, iteration))?;

        let margins = physical::margins(problem, &raw);
        if !margins.is_feasible(feasibility) {
            let (family, margin) = margins.worst().unwrap_or(("unknown", f64::NAN));
            return Err(SolveFailure::new(
                FailureKind::ConstraintViolation,
                format!(
                    "Solver point violates the {} constraint by {:.3e} (tolerance {:.1e})",
                    family, -margin, feasibility
                ),
                iteration,
            ));
        }

        let candidate = polish(problem, &raw);
        let value = objective::evaluate(problem, &candidate);
        debug!(iteration, objective = value, "Sequential step");

        if let Some((best, best_value)) = incumbent.take() {
            if value >= best_value - options.tolerance * (1.0 + best_value.abs()) {
                return Ok(SolverRun {
                    decision: best,
                    objective: best_value,
                    iterations: iteration,
                });
            }
        }

        let next_weights = objective::gradient(problem, &candidate);
        if next_weights == weights {
            return Ok(SolverRun {
                decision: candidate,
                objective: value,
                iterations: iteration,
            });
        }
        weights = next_weights;
        incumbent = Some((candidate, value));
    }

    Err(SolveFailure::new(
        FailureKind::NonConvergence,
        format!("Iteration limit reached ({})", options.max_iterations),
        options.max_iterations,
    ))
}

fn resolution_failure(error: ResolutionError, iteration: usize) -> SolveFailure {
    let kind = match &error {
        ResolutionError::Infeasible => FailureKind::Infeasible,
        ResolutionError::Unbounded => FailureKind::Unbounded,
        _ => FailureKind::Solver,
    };
    SolveFailure::new(kind, error.to_string(), iteration)
}

/// Minimizes `weights · x` over the physical constraints of `problem`, plus a small
/// cost on stored energy so that surplus nothing will discharge is left in place.
fn solve_linear_program(
    problem: &OptimizationProblem,
    weights: &[f64],
) -> Result<DecisionVector, ResolutionError> {
    match problem.encoding() {
        Encoding::Split => solve_split(problem, weights),
        Encoding::Signed => solve_signed(problem, weights),
    }
}

fn linear_objective(variables: &[Variable], weights: &[f64]) -> Expression {
    variables
        .iter()
        .zip(weights)
        .map(|(&var, &weight)| weight * var)
        .sum()
}

fn total(variables: &[Variable]) -> Expression {
    variables.iter().map(|&var| Expression::from(var)).sum()
}

fn storage_penalty(weights: &[f64]) -> f64 {
    let smallest = weights
        .iter()
        .map(|weight| weight.abs())
        .filter(|weight| weight.is_finite() && *weight > 0.0)
        .fold(f64::INFINITY, f64::min);
    if smallest.is_finite() {
        STORAGE_PENALTY * smallest
    } else {
        STORAGE_PENALTY
    }
}

fn solve_split(
    problem: &OptimizationProblem,
    weights: &[f64],
) -> Result<DecisionVector, ResolutionError> {
    let hours = problem.hours();
    let limits = problem.limits();
    let (lower, upper) = problem.variable_bounds();

    let mut vars = ProblemVariables::new();
    let charge = vars.add_vector(variable().min(lower).max(upper), hours);
    let discharge = vars.add_vector(variable().min(lower).max(upper), hours);
    let decision_vars: Vec<Variable> = charge.iter().chain(&discharge).copied().collect();

    let objective =
        linear_objective(&decision_vars, weights) + storage_penalty(weights) * total(&charge);
    let mut model = vars.minimise(objective).using(clarabel);

    let mut constraints = Vec::with_capacity(4 * hours + 2);
    let mut soc = Expression::default();
    for t in 0..hours {
        constraints.push(constraint!(charge[t] <= problem.surplus()[t]));
        constraints.push(constraint!(discharge[t] <= problem.unmet_demand()[t]));

        soc += charge[t];
        soc -= discharge[t];
        constraints.push(constraint!(soc.clone() >= 0.0));
        constraints.push(constraint!(soc.clone() <= limits.max_battery_capacity));
    }
    constraints.push(constraint!(total(&charge) <= limits.daily_cycle_limit));
    constraints.push(constraint!(total(&discharge) <= limits.daily_cycle_limit));

    for constraint in constraints {
        model = model.with(constraint);
    }

    let solution = model.solve()?;
    Ok(DecisionVector::from_flows(
        Encoding::Split,
        &values(&solution, &charge),
        &values(&solution, &discharge),
    ))
}

fn solve_signed(
    problem: &OptimizationProblem,
    weights: &[f64],
) -> Result<DecisionVector, ResolutionError> {
    let hours = problem.hours();
    let limits = problem.limits();
    let (lower, upper) = problem.variable_bounds();

    let mut vars = ProblemVariables::new();
    let flow = vars.add_vector(variable().min(lower).max(upper), hours);
    // Upper envelope of max(x_t, 0), so the cycle limit stays linear.
    let charged = vars.add_vector(variable().min(0.0), hours);

    let objective = linear_objective(&flow, weights) + storage_penalty(weights) * total(&charged);
    let mut model = vars.minimise(objective).using(clarabel);

    let mut constraints = Vec::with_capacity(4 * hours + 1);
    let mut soc = Expression::default();
    for t in 0..hours {
        constraints.push(constraint!(flow[t] <= problem.surplus()[t]));
        constraints.push(constraint!(charged[t] >= flow[t]));

        soc += flow[t];
        constraints.push(constraint!(soc.clone() >= 0.0));
        constraints.push(constraint!(soc.clone() <= limits.max_battery_capacity));
    }
    constraints.push(constraint!(total(&charged) <= limits.daily_cycle_limit));

    for constraint in constraints {
        model = model.with(constraint);
    }

    let solution = model.solve()?;
    Ok(DecisionVector::signed(values(&solution, &flow)))
}

fn values(solution: &ClarabelSolution, variables: &[Variable]) -> Vec<f64> {
    variables.iter().map(|&var| solution.value(var)).collect()
}

/// Repairs the solver's floating point noise so the schedule meets every limit exactly.
///
/// Flows are clipped to their per-hour bounds and then trimmed hour by hour against the
/// remaining cycle budget and the running state of charge. The result is in the same
/// encoding as `raw`.
pub fn polish(problem: &OptimizationProblem, raw: &DecisionVector) -> DecisionVector {
    let limits = problem.limits();
    let power = limits.max_power.max(0.0);
    let capacity = limits.max_battery_capacity.max(0.0);
    let budget = limits.daily_cycle_limit.max(0.0);

    let raw_charge = raw.charge();
    let raw_discharge = raw.discharge();
    let hours = raw_charge.len().min(problem.hours());

    let mut charge = Vec::with_capacity(hours);
    let mut discharge = Vec::with_capacity(hours);
    let (mut soc, mut charged, mut discharged) = (0.0_f64, 0.0_f64, 0.0_f64);

    for t in 0..hours {
        let charge_cap = power.min(problem.surplus()[t]).max(0.0);
        let discharge_cap = match raw.encoding() {
            Encoding::Split => power.min(problem.unmet_demand()[t]).max(0.0),
            Encoding::Signed => power,
        };

        let mut c = clip(raw_charge[t], charge_cap).min((budget - charged).max(0.0));
        let mut d = clip(raw_discharge[t], discharge_cap).min((budget - discharged).max(0.0));
        d = d.min((soc + c).max(0.0));
        c = c.min((capacity - soc + d).max(0.0));

        soc = (soc + c - d).clamp(0.0, capacity);
        charged += c;
        discharged += d;
        charge.push(c);
        discharge.push(d);
    }

    DecisionVector::from_flows(raw.encoding(), &charge, &discharge)
}

/// `value` limited to `[0, upper]`, with NaN mapped to zero.
fn clip(value: f64, upper: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(upper)
}
