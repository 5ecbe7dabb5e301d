use storage_model::FailureKind;
use thiserror::Error;

/// Rejections raised before any day is optimized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputShapeError {
    #[error("hours per day must be at least 1")]
    EmptyPeriod,
    #[error("{series} has {actual} values, expected {expected} to match generation")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{len} hourly values do not divide into whole {period}-hour days")]
    PartialPeriod { len: usize, period: usize },
}

/// A day the solver gave up on. Turned into a zero fallback by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct SolveFailure {
    pub kind: FailureKind,
    pub message: String,
    pub iterations: usize,
}

impl SolveFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, iterations: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_messages() {
        let error = InputShapeError::LengthMismatch {
            series: "consumption",
            expected: 48,
            actual: 47,
        };
        assert_eq!(
            error.to_string(),
            "consumption has 47 values, expected 48 to match generation"
        );

        let error = InputShapeError::PartialPeriod { len: 30, period: 24 };
        assert!(error.to_string().contains("24-hour"));
    }

    #[test]
    fn test_solve_failure_display() {
        let failure = SolveFailure::new(FailureKind::Infeasible, "primal infeasible", 1);
        assert_eq!(
            failure.to_string(),
            "infeasible constraints: primal infeasible"
        );
    }
}
