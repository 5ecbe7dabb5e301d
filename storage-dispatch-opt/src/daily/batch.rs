use crossbeam_channel::unbounded;
use storage_model::{
    AggregateReport, BatteryLimits, DaySlice, DaySummary, DayWarning, OptimizationResult,
    SiteSeries,
};
use tracing::{info, warn};

use crate::daily::config::OptimizationConfig;
use crate::daily::day_opt::DayOptimizer;
use crate::daily::error::InputShapeError;
use crate::daily::objective::ObjectiveKind;
use crate::daily::problem::OptimizationProblem;
use crate::general::metrics::{self, HourFlows};

/// Checks that every series lines up with generation and covers whole days.
pub fn validate_shape(series: &SiteSeries, hours_per_day: usize) -> Result<(), InputShapeError> {
    if hours_per_day == 0 {
        return Err(InputShapeError::EmptyPeriod);
    }

    let expected = series.generation.len();
    let mut lengths = vec![
        ("consumption", series.consumption.len()),
        ("timestamps", series.timestamps.len()),
    ];
    if let Some(intensity) = &series.carbon_intensity {
        lengths.push(("carbon intensity", intensity.len()));
    }
    for (name, actual) in lengths {
        if actual != expected {
            return Err(InputShapeError::LengthMismatch {
                series: name,
                expected,
                actual,
            });
        }
    }

    if expected % hours_per_day != 0 {
        return Err(InputShapeError::PartialPeriod {
            len: expected,
            period: hours_per_day,
        });
    }
    Ok(())
}

/// Splits a validated series into consecutive days, numbered from 1.
pub fn partition(
    series: &SiteSeries,
    hours_per_day: usize,
    limits: BatteryLimits,
) -> Result<Vec<DaySlice>, InputShapeError> {
    validate_shape(series, hours_per_day)?;

    let days = series.len() / hours_per_day;
    let slices = (0..days)
        .map(|index| {
            let range = index * hours_per_day..(index + 1) * hours_per_day;
            DaySlice {
                day: index + 1,
                timestamps: series.timestamps[range.clone()].to_vec(),
                generation: series.generation[range.clone()].to_vec(),
                consumption: series.consumption[range.clone()].to_vec(),
                carbon_intensity: series
                    .carbon_intensity
                    .as_ref()
                    .map(|intensity| intensity[range].to_vec()),
                limits,
            }
        })
        .collect();
    Ok(slices)
}

/// Optimizes every slice, in parallel when `workers > 1`.
///
/// Every slice is checked before any day is solved. Results come back in slice order
/// whatever order the workers finish in.
pub fn optimize_days(
    optimizer: &DayOptimizer,
    slices: &[DaySlice],
    workers: usize,
) -> Result<Vec<OptimizationResult>, InputShapeError> {
    let problems = slices
        .iter()
        .map(|slice| {
            OptimizationProblem::from_slice(slice, optimizer.objective(), optimizer.encoding())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let days = slices.len();
    let workers = workers.max(1).min(days.max(1));
    if workers == 1 {
        return Ok(slices
            .iter()
            .zip(&problems)
            .map(|(slice, problem)| optimize_logged(optimizer, slice.day, problem, days))
            .collect());
    }

    let (job_tx, job_rx) = unbounded::<usize>();
    let (result_tx, result_rx) = unbounded::<(usize, OptimizationResult)>();
    for index in 0..days {
        // Receiver is alive in this scope.
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let problems = &problems;
            scope.spawn(move || {
                for index in job_rx.iter() {
                    let day = slices[index].day;
                    let result = optimize_logged(optimizer, day, &problems[index], days);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut finished: Vec<(usize, OptimizationResult)> = result_rx.iter().collect();
    finished.sort_by_key(|(index, _)| *index);
    Ok(finished.into_iter().map(|(_, result)| result).collect())
}

fn optimize_logged(
    optimizer: &DayOptimizer,
    day: usize,
    problem: &OptimizationProblem,
    days: usize,
) -> OptimizationResult {
    info!("Optimizing day {}/{}", day, days);
    let result = optimizer.solve_problem(problem);
    if !result.success {
        warn!(
            day,
            kind = ?result.failure,
            "Optimization failed for day {}: {}",
            day,
            result.message
        );
    }
    result
}

/// Runs a whole multi-day series through the day optimizer and assembles the report.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    config: OptimizationConfig,
}

impl BatchDriver {
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, series: &SiteSeries) -> Result<AggregateReport, InputShapeError> {
        let slices = partition(series, self.config.hours_per_day, self.config.limits())?;
        if self.config.objective == ObjectiveKind::Co2 && series.carbon_intensity.is_none() {
            warn!("No carbon intensity data, CO2 objective falls back to unit weights");
        }
        self.run_slices(&slices)
    }

    /// Optimizes already partitioned days. Each slice carries its own limits.
    ///
    /// A slice whose series do not share one length rejects the whole batch.
    pub fn run_slices(&self, slices: &[DaySlice]) -> Result<AggregateReport, InputShapeError> {
        let optimizer = DayOptimizer::new(
            self.config.objective,
            self.config.encoding,
            self.config.solver_options(),
        );
        let results = optimize_days(&optimizer, slices, self.config.worker_count())?;

        let mut report = AggregateReport::default();
        for (slice, result) in slices.iter().zip(&results) {
            append_day(&mut report, slice, result);
        }
        report.totals = metrics::totals(&report.records, report.warnings.len());

        info!(
            days = report.days.len(),
            failed = report.totals.failed_days,
            ratio = report.totals.self_consumption_ratio,
            "Batch optimization finished"
        );
        Ok(report)
    }
}

/// Appends the hourly records of a day whose series were validated against its result.
fn append_day(report: &mut AggregateReport, slice: &DaySlice, result: &OptimizationResult) {
    let charge = result.charge();
    let discharge = result.discharge();
    let soc = result.decision.soc_trace();

    for hour in 0..slice.hours() {
        let flows = HourFlows {
            datetime: slice.timestamps[hour],
            day: slice.day,
            generation: slice.generation[hour],
            consumption: slice.consumption[hour],
            charge: charge[hour],
            discharge: discharge[hour],
            state_of_charge: soc[hour],
            carbon_intensity: slice
                .carbon_intensity
                .as_ref()
                .map(|intensity| intensity[hour]),
        };
        report.records.push(metrics::hour_record(flows));
    }

    report.days.push(DaySummary {
        day: slice.day,
        success: result.success,
        objective: result.objective,
        iterations: result.iterations,
        message: result.message.clone(),
    });
    if let Some(kind) = result.failure {
        report.warnings.push(DayWarning {
            day: slice.day,
            kind,
            message: result.message.clone(),
        });
    }
}
