pub mod battery;
pub mod general;
pub mod report;

pub use battery::decision::DecisionVector;
pub use battery::{BatteryLimits, Encoding};
pub use general::series::{DaySlice, SiteSeries};
pub use report::outcome::{DaySummary, DayWarning, FailureKind, OptimizationResult};
pub use report::record::{AggregateReport, HourRecord, ReportTotals};
