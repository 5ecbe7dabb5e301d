use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use storage_dispatch_opt::daily::objective::ObjectiveKind;
use storage_dispatch_opt::general::series::{load_site_series, write_hour_records};
use storage_dispatch_opt::{BatchDriver, OptimizationConfig};
use storage_model::Encoding;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Schedule a site battery day by day to cut grid CO2 or raise solar self-consumption.
#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    /// Hourly CSV with `datetime,generation,consumption[,carbon_intensity]` columns.
    #[clap(long, env = "DISPATCH_INPUT")]
    input: PathBuf,

    /// TOML run configuration. Command line flags override its values.
    #[clap(long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the per-hour schedule and metrics as CSV.
    #[clap(long)]
    output: Option<PathBuf>,

    #[clap(long, value_enum)]
    objective: Option<ObjectiveKind>,

    /// `split` or `signed` decision layout.
    #[clap(long)]
    encoding: Option<Encoding>,

    /// Usable battery capacity in kWh.
    #[clap(long)]
    capacity: Option<f64>,

    /// Charge and discharge power limit in kW.
    #[clap(long)]
    power: Option<f64>,

    /// Maximum kWh charged (and discharged) per day.
    #[clap(long = "cycle-limit")]
    cycle_limit: Option<f64>,

    #[clap(long = "hours-per-day")]
    hours_per_day: Option<usize>,

    #[clap(long = "max-iterations")]
    max_iterations: Option<usize>,

    /// Parallel day workers, 0 uses every available core.
    #[clap(long, env = "DISPATCH_WORKERS")]
    workers: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut OptimizationConfig) {
        if let Some(objective) = self.objective {
            config.objective = objective;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(capacity) = self.capacity {
            config.max_battery_capacity = capacity;
        }
        if let Some(power) = self.power {
            config.max_power = power;
        }
        if let Some(limit) = self.cycle_limit {
            config.daily_cycle_limit = limit;
        }
        if let Some(hours) = self.hours_per_day {
            config.hours_per_day = hours;
        }
        if let Some(iterations) = self.max_iterations {
            config.max_iterations = iterations;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OptimizationConfig::from_toml_file(path)?,
        None => OptimizationConfig::default(),
    };
    args.apply(&mut config);

    let series = load_site_series(&args.input)?;
    info!(
        hours = series.len(),
        objective = %config.objective,
        encoding = %config.encoding,
        "Loaded site data from {}",
        args.input.display()
    );

    let report = BatchDriver::new(config.clone())
        .run(&series)
        .context("Input series cannot be split into days")?;
    let totals = &report.totals;

    println!("=== DISPATCH OPTIMIZATION RESULTS ===");
    println!("Objective: {}", config.objective);
    println!("Encoding: {}", config.encoding);
    println!(
        "Battery: {:.1} kWh, {:.1} kW, {:.1} kWh/day",
        config.max_battery_capacity, config.max_power, config.daily_cycle_limit
    );
    println!(
        "Days optimized: {}/{}",
        report.days.len() - totals.failed_days,
        report.days.len()
    );
    for warning in &report.warnings {
        println!("  Day {} failed ({}): {}", warning.day, warning.kind, warning.message);
    }
    if let (Some(emitted), Some(optimized), Some(avoided)) =
        (totals.co2_emitted, totals.co2_optimized, totals.co2_avoided)
    {
        println!("Baseline CO2 emitted: {:.4} gCO2 eq", emitted);
        println!("Optimized CO2 emitted: {:.4} gCO2 eq", optimized);
        println!("CO2 avoided: {:.4} gCO2 eq", avoided);
    }
    println!("Direct solar use: {:.2} kWh", totals.direct_use);
    println!("Battery use: {:.2} kWh", totals.battery_use);
    println!("Solar potential: {:.2} kWh", totals.potential_solar);
    println!(
        "Ra (Self-Consumption Ratio): {:.4}%",
        totals.self_consumption_ratio
    );

    if let Some(output) = &args.output {
        write_hour_records(output, &report.records)?;
        println!("Schedule written to {}", output.display());
    }

    Ok(())
}
