pub mod daily;
pub mod general;

// Re-export commonly used items for convenience
pub use daily::batch::BatchDriver;
pub use daily::config::OptimizationConfig;
pub use daily::day_opt::{DayOptimizer, SolverOptions};
