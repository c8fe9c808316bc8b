//! Per-sample kinematic features and activity-level summaries of telemetry tables.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    config::ExtractorConfig,
    errors::Result,
    table::Table,
};

/// Column names shared by the activity store, the extractor and the training matrix.
pub mod columns {
    pub const TIMESTAMP: &str = "timestamp";
    pub const DISTANCE: &str = "distance";
    pub const ENHANCED_ALTITUDE: &str = "enhanced_altitude";
    pub const ALTITUDE: &str = "altitude";
    pub const HEART_RATE: &str = "heart_rate";
    pub const CADENCE: &str = "cadence";
    pub const FRACTIONAL_CADENCE: &str = "fractional_cadence";
    pub const POWER: &str = "power";
    pub const SPORT: &str = "sport";
    pub const SUB_SPORT: &str = "sub_sport";

    pub const COMPLETE_CADENCE: &str = "complete_cadence";
    pub const ELAPSED_SECONDS: &str = "elapsed_seconds";
    pub const ALTITUDE_CHANGE: &str = "altitude_change";
    pub const ALTITUDE_GAIN: &str = "altitude_gain";
    pub const CUM_ALTITUDE_GAIN: &str = "cum_altitude_gain";
    pub const GRADIENT: &str = "gradient";
    pub const PERCENT_GRADE: &str = "percent_grade";
    pub const GRADE_DEGREES: &str = "grade_degrees";
    pub const ORIGIN_FILE_NAME: &str = "origin_file_name";

    pub const ACTIVITY_PATH: &str = "activity_path";
    pub const ACTIVITY_DATE: &str = "activity_date";
    pub const TRAIL_DISTANCE: &str = "trail_distance";
    pub const TRAIL_CUM_ALTITUDE_GAIN: &str = "trail_cum_altitude_gain";
    pub const AVERAGE_PACE: &str = "average_pace";
    pub const AVERAGE_HR: &str = "average_hr";
    pub const AVG_CADENCE: &str = "avg_cadence";
    pub const AVG_POWER: &str = "avg_power";
}

use columns as col;

/// Seconds since the earliest parseable timestamp. Unparseable entries stay `None`.
pub fn elapsed_seconds(timestamps: &[Option<OffsetDateTime>]) -> Vec<Option<f64>> {
    let Some(start) = timestamps.iter().flatten().min().copied() else {
        return vec![None; timestamps.len()];
    };

    timestamps
        .iter()
        .map(|ts| ts.map(|t| (t - start).as_seconds_f64()))
        .collect()
}

/// Rise over run between consecutive samples, with the run floored at `epsilon`.
/// The first sample's gradient is 0.
pub fn gradient(altitude: &[Option<f64>], distance: &[Option<f64>], epsilon: f64) -> Vec<Option<f64>> {
    (0..altitude.len())
        .map(|i| {
            if i == 0 {
                return Some(0.0);
            }
            let rise = altitude[i]? - altitude[i - 1]?;
            let run = distance.get(i).copied().flatten()? - distance.get(i - 1).copied().flatten()?;
            Some(rise / run.max(epsilon))
        })
        .collect()
}

pub fn percent_grade(gradient: f64) -> f64 {
    gradient * 100.0
}

pub fn grade_degrees(gradient: f64) -> f64 {
    gradient.atan().to_degrees()
}

/// Sum of strictly positive steps over the non-missing values.
pub fn positive_gain(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(
        present
            .windows(2)
            .map(|w| (w[1] - w[0]).max(0.0))
            .sum(),
    )
}

/// Last non-missing value.
pub fn last_value(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().find_map(|v| *v)
}

/// Mean of the non-missing values.
pub fn mean_value(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Minutes per kilometer; `None` unless both distance and elapsed time are positive.
pub fn average_pace(elapsed_seconds: Option<f64>, distance_m: Option<f64>) -> Option<f64> {
    match (elapsed_seconds, distance_m) {
        (Some(elapsed), Some(distance)) if elapsed > 0.0 && distance > 0.0 => {
            Some((elapsed / 60.0) / (distance / 1000.0))
        }
        _ => None,
    }
}

/// Typed view of a telemetry table, built once after the schema check.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySamples {
    pub timestamps: Vec<Option<OffsetDateTime>>,
    pub distance: Vec<Option<f64>>,
    pub elapsed_seconds: Vec<Option<f64>>,
    pub altitude: Option<Vec<Option<f64>>>,
    pub heart_rate: Option<Vec<Option<f64>>>,
    pub cadence: Option<Vec<Option<f64>>>,
    pub power: Option<Vec<Option<f64>>>,
    pub sport: Option<String>,
    pub sub_sport: Option<String>,
}

impl TelemetrySamples {
    pub const REQUIRED_COLUMNS: [&'static str; 2] = [col::TIMESTAMP, col::DISTANCE];

    pub fn from_table(table: &Table) -> Result<Self> {
        table.require(&Self::REQUIRED_COLUMNS)?;

        let timestamps = table
            .timestamps(col::TIMESTAMP)
            .unwrap_or_else(|| vec![None; table.len()]);
        // stored tables already carry elapsed_seconds; raw decodes only have timestamps
        let elapsed = table
            .floats(col::ELAPSED_SECONDS)
            .unwrap_or_else(|| elapsed_seconds(&timestamps));
        let altitude = [col::ENHANCED_ALTITUDE, col::ALTITUDE, "altitude_m"]
            .iter()
            .find_map(|name| table.floats(name));

        Ok(Self {
            distance: table.float_column(col::DISTANCE)?,
            timestamps,
            elapsed_seconds: elapsed,
            altitude,
            heart_rate: table.floats(col::HEART_RATE),
            cadence: table.floats(col::CADENCE),
            power: table.floats(col::POWER),
            sport: table.first_text(col::SPORT),
            sub_sport: table.first_text(col::SUB_SPORT),
        })
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }
}

/// Flat aggregate record for one stored activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub activity_path: String,
    /// Start of the activity (earliest timestamp, UTC).
    pub activity_date: Option<OffsetDateTime>,
    pub sport: String,
    pub sub_sport: String,
    pub elapsed_seconds: Option<f64>,
    /// Meters.
    pub distance: Option<f64>,
    pub trail_distance: Option<f64>,
    /// Meters.
    pub cum_altitude_gain: Option<f64>,
    pub trail_cum_altitude_gain: Option<f64>,
    /// Minutes per kilometer.
    pub average_pace: Option<f64>,
    pub average_hr: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_power: Option<f64>,
}

impl ActivitySummary {
    /// Collects summaries into a table with one row per activity.
    pub fn to_table(summaries: &[ActivitySummary]) -> Result<Table> {
        let floats = |f: fn(&ActivitySummary) -> Option<f64>| -> Vec<Option<f64>> {
            summaries.iter().map(f).collect()
        };

        let mut table = Table::new();
        table.push_text(
            col::ACTIVITY_PATH,
            summaries.iter().map(|s| Some(s.activity_path.clone())).collect(),
        )?;
        table.push_text(
            col::ACTIVITY_DATE,
            summaries
                .iter()
                .map(|s| s.activity_date.and_then(|d| d.format(&Rfc3339).ok()))
                .collect(),
        )?;
        table.push_text(col::SPORT, summaries.iter().map(|s| Some(s.sport.clone())).collect())?;
        table.push_text(
            col::SUB_SPORT,
            summaries.iter().map(|s| Some(s.sub_sport.clone())).collect(),
        )?;
        table.push_float(col::ELAPSED_SECONDS, floats(|s| s.elapsed_seconds))?;
        table.push_float(col::DISTANCE, floats(|s| s.distance))?;
        table.push_float(col::TRAIL_DISTANCE, floats(|s| s.trail_distance))?;
        table.push_float(col::CUM_ALTITUDE_GAIN, floats(|s| s.cum_altitude_gain))?;
        table.push_float(col::TRAIL_CUM_ALTITUDE_GAIN, floats(|s| s.trail_cum_altitude_gain))?;
        table.push_float(col::AVERAGE_PACE, floats(|s| s.average_pace))?;
        table.push_float(col::AVERAGE_HR, floats(|s| s.average_hr))?;
        table.push_float(col::AVG_CADENCE, floats(|s| s.avg_cadence))?;
        table.push_float(col::AVG_POWER, floats(|s| s.avg_power))?;
        Ok(table)
    }
}

/// Derives per-sample features and activity summaries from telemetry tables.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Case-insensitive, whitespace-trimmed match against the configured trail label.
    pub fn is_trail(&self, sub_sport: &str) -> bool {
        sub_sport.trim().eq_ignore_ascii_case(self.config.trail_label.trim())
    }

    /// Returns a copy of `table` with the derived columns appended.
    ///
    /// Treadmill activities get `elapsed_seconds` (and `complete_cadence`) only; altitude and
    /// gradient columns need an altitude source.
    pub fn standardize(&self, table: &Table) -> Result<Table> {
        let samples = TelemetrySamples::from_table(table)?;
        let mut out = table.clone();

        if let (Some(cadence), Some(fractional)) =
            (table.floats(col::CADENCE), table.floats(col::FRACTIONAL_CADENCE))
        {
            let complete = cadence
                .iter()
                .zip(&fractional)
                .map(|(c, f)| Some((*c)? + (*f)?))
                .collect();
            out.push_float(col::COMPLETE_CADENCE, complete)?;
        }

        out.push_float(col::ELAPSED_SECONDS, elapsed_seconds(&samples.timestamps))?;

        let treadmill = samples
            .sub_sport
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("treadmill"));
        if treadmill {
            return Ok(out);
        }
        let Some(altitude) = samples.altitude.as_deref() else {
            tracing::debug!("No altitude column; skipping gradient features");
            return Ok(out);
        };

        // Missing altitudes are bridged: each present value is compared to the last present one.
        let change: Vec<f64> = altitude
            .iter()
            .scan(None, |last: &mut Option<f64>, value| {
                let step = match (*last, *value) {
                    (Some(prev), Some(curr)) => curr - prev,
                    _ => 0.0,
                };
                if value.is_some() {
                    *last = *value;
                }
                Some(step)
            })
            .collect();
        let gain: Vec<f64> = change.iter().map(|c| c.max(0.0)).collect();
        let cumulative: Vec<f64> = gain
            .iter()
            .scan(0.0, |total, g| {
                *total += g;
                Some(*total)
            })
            .collect();
        let grad = gradient(altitude, &samples.distance, self.config.gradient_epsilon);

        out.push_float(col::ALTITUDE_CHANGE, change.into_iter().map(Some).collect())?;
        out.push_float(col::ALTITUDE_GAIN, gain.into_iter().map(Some).collect())?;
        out.push_float(col::CUM_ALTITUDE_GAIN, cumulative.into_iter().map(Some).collect())?;
        out.push_float(col::PERCENT_GRADE, grad.iter().map(|g| g.map(percent_grade)).collect())?;
        out.push_float(col::GRADE_DEGREES, grad.iter().map(|g| g.map(grade_degrees)).collect())?;
        out.push_float(col::GRADIENT, grad)?;
        Ok(out)
    }

    /// Aggregates one activity table. Fails on empty tables or missing required columns.
    pub fn summarize(&self, table: &Table, activity_path: &str) -> Result<ActivitySummary> {
        if table.is_empty() {
            return Err(crate::errors::PacerError::EmptyResult(format!(
                "activity {activity_path} has no samples"
            )));
        }
        let samples = TelemetrySamples::from_table(table)?;

        let distance = last_value(&samples.distance);
        let elapsed = last_value(&samples.elapsed_seconds);
        let cum_altitude_gain = samples.altitude.as_deref().and_then(positive_gain);
        let sub_sport = samples.sub_sport.clone().unwrap_or_else(|| "unknown".to_string());
        let trail = self.is_trail(&sub_sport);
        let gate = |total: Option<f64>| if trail { total } else { Some(0.0) };

        Ok(ActivitySummary {
            activity_path: activity_path.to_string(),
            activity_date: samples.timestamps.iter().flatten().min().copied(),
            sport: samples.sport.clone().unwrap_or_else(|| "unknown".to_string()),
            sub_sport,
            elapsed_seconds: elapsed,
            distance,
            trail_distance: gate(distance),
            cum_altitude_gain,
            trail_cum_altitude_gain: gate(cum_altitude_gain),
            average_pace: average_pace(elapsed, distance),
            average_hr: samples.heart_rate.as_deref().and_then(mean_value),
            avg_cadence: samples.cadence.as_deref().and_then(mean_value),
            avg_power: samples.power.as_deref().and_then(mean_value),
        })
    }
}
