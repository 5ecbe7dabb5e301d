use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;
use storage_model::{HourRecord, SiteSeries};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Deserialize)]
struct InputRow {
    datetime: String,
    generation: f64,
    consumption: f64,
    #[serde(default)]
    carbon_intensity: Option<f64>,
}

/// Load hourly site data from a CSV file with a
/// `datetime,generation,consumption[,carbon_intensity]` header.
///
/// The carbon intensity column is optional, but when present it must be filled on
/// every row.
pub fn load_site_series(path: impl AsRef<Path>) -> Result<SiteSeries> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut timestamps = Vec::new();
    let mut generation = Vec::new();
    let mut consumption = Vec::new();
    let mut intensity = Vec::new();

    for (index, row) in reader.deserialize::<InputRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.with_context(|| format!("Failed to parse line {}", line))?;
        let datetime = parse_datetime(&row.datetime)
            .with_context(|| format!("Invalid datetime on line {}", line))?;

        timestamps.push(datetime);
        generation.push(row.generation);
        consumption.push(row.consumption);
        intensity.push(row.carbon_intensity);
    }

    Ok(SiteSeries {
        timestamps,
        generation,
        consumption,
        carbon_intensity: complete_column(intensity)?,
    })
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| anyhow!("unrecognized datetime '{}'", text))
}

fn complete_column(values: Vec<Option<f64>>) -> Result<Option<Vec<f64>>> {
    let missing = values.iter().filter(|value| value.is_none()).count();
    if missing == values.len() {
        return Ok(None);
    }
    if missing > 0 {
        bail!(
            "carbon_intensity is missing on {} of {} rows",
            missing,
            values.len()
        );
    }
    Ok(Some(values.into_iter().flatten().collect()))
}

/// Write the per-hour schedule and metrics as CSV.
pub fn write_hour_records(path: impl AsRef<Path>, records: &[HourRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
