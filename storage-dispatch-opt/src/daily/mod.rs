pub mod batch;
pub mod config;
pub mod day_opt;
pub mod error;
pub mod initial_guess;
pub mod objective;
pub mod physical;
pub mod problem;
