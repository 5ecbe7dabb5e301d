pub mod metrics;
pub mod series;
