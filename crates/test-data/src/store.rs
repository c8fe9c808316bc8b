//! Writes generated activities into an activity-store directory.

use std::path::{Path, PathBuf};

use pacer::{
    FeatureExtractor, PacerError, Table,
    activity_store::ACTIVITY_EXTENSION,
    features::columns as col,
};
use time::format_description::well_known::Rfc3339;

use crate::telemetry::TelemetrySample;

/// Builds the raw per-sample table a FIT conversion would produce.
pub fn samples_to_table(
    samples: &[TelemetrySample],
    sport: &str,
    sub_sport: &str,
) -> pacer::Result<Table> {
    let timestamps = samples
        .iter()
        .map(|s| {
            s.timestamp
                .format(&Rfc3339)
                .map(Some)
                .map_err(|e| PacerError::MalformedInput(format!("Unformattable timestamp: {e}")))
        })
        .collect::<pacer::Result<Vec<_>>>()?;
    let floats = |f: fn(&TelemetrySample) -> f64| -> Vec<Option<f64>> {
        samples.iter().map(|s| Some(f(s))).collect()
    };
    let repeat = |v: &str| vec![Some(v.to_string()); samples.len()];

    let mut table = Table::new();
    table.push_text(col::TIMESTAMP, timestamps)?;
    table.push_float("position_lat", floats(|s| s.lat))?;
    table.push_float("position_long", floats(|s| s.lon))?;
    table.push_float(col::DISTANCE, floats(|s| s.distance))?;
    table.push_float(col::ENHANCED_ALTITUDE, floats(|s| s.altitude))?;
    table.push_float(col::HEART_RATE, floats(|s| s.heart_rate))?;
    table.push_float(col::CADENCE, floats(|s| s.cadence))?;
    table.push_float(col::POWER, floats(|s| s.power))?;
    table.push_text(col::SPORT, repeat(sport))?;
    table.push_text(col::SUB_SPORT, repeat(sub_sport))?;
    Ok(table)
}

/// Standardizes the samples and writes `<dir>/<name>.csv`.
pub fn write_activity(
    extractor: &FeatureExtractor,
    dir: impl AsRef<Path>,
    name: &str,
    samples: &[TelemetrySample],
    sport: &str,
    sub_sport: &str,
) -> pacer::Result<PathBuf> {
    let raw = samples_to_table(samples, sport, sub_sport)?;
    let mut table = extractor.standardize(&raw)?;
    table.push_text(col::ORIGIN_FILE_NAME, vec![Some(format!("{name}.fit")); table.len()])?;

    let path = dir.as_ref().join(format!("{name}.{ACTIVITY_EXTENSION}"));
    table.write_csv(&path)?;
    tracing::debug!("Wrote {} samples to {}", table.len(), path.display());
    Ok(path)
}
