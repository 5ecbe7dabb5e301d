use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::battery::Encoding;
use crate::battery::decision::DecisionVector;

/// Why a day could not be optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "./report.ts")]
pub enum FailureKind {
    /// The iteration cap was reached before the objective settled.
    #[schema(rename = "non-convergence")]
    NonConvergence,
    /// The constraints admit no schedule.
    #[schema(rename = "infeasible")]
    Infeasible,
    #[schema(rename = "unbounded")]
    Unbounded,
    /// The solver returned a point that breaks one of the physical limits.
    #[schema(rename = "constraint-violation")]
    ConstraintViolation,
    /// Any other error reported by the solver backend.
    #[schema(rename = "solver")]
    Solver,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::NonConvergence => "iteration limit reached",
            FailureKind::Infeasible => "infeasible constraints",
            FailureKind::Unbounded => "unbounded problem",
            FailureKind::ConstraintViolation => "constraint violation",
            FailureKind::Solver => "solver error",
        };
        f.write_str(text)
    }
}

/// Outcome of optimizing a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub decision: DecisionVector,
    pub success: bool,
    /// Objective value of `decision` (lower is better).
    pub objective: f64,
    pub message: String,
    /// Number of sequential solver iterations spent.
    pub iterations: usize,
    pub failure: Option<FailureKind>,
}

impl OptimizationResult {
    /// The "do nothing" result used whenever a day cannot be solved.
    pub fn fallback(
        encoding: Encoding,
        hours: usize,
        failure: FailureKind,
        message: impl Into<String>,
        iterations: usize,
    ) -> Self {
        Self {
            decision: DecisionVector::zeros(encoding, hours),
            success: false,
            objective: 0.0,
            message: message.into(),
            iterations,
            failure: Some(failure),
        }
    }

    pub fn charge(&self) -> Vec<f64> {
        self.decision.charge()
    }

    pub fn discharge(&self) -> Vec<f64> {
        self.decision.discharge()
    }
}

/// Structured replacement for the "optimization failed" console line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./report.ts")]
pub struct DayWarning {
    pub day: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Per-day solver status as kept in the aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./report.ts")]
pub struct DaySummary {
    pub day: usize,
    pub success: bool,
    pub objective: f64,
    pub iterations: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_idle() {
        let result = OptimizationResult::fallback(
            Encoding::Split,
            24,
            FailureKind::Infeasible,
            "Positive directional derivative for linesearch",
            3,
        );
        assert!(!result.success);
        assert_eq!(result.objective, 0.0);
        assert_eq!(result.charge(), vec![0.0; 24]);
        assert_eq!(result.discharge(), vec![0.0; 24]);
        assert_eq!(result.failure, Some(FailureKind::Infeasible));
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(
            FailureKind::NonConvergence.to_string(),
            "iteration limit reached"
        );
    }
}
