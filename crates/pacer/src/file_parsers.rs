//! FIT activity decoding and ingestion into the activity store.
//!
//! Decoding goes through `fitparser`; the records are flattened into [`FitMessage`]s so the
//! table building and sport detection below work on plain values.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use fitparser::{FitDataRecord, Value, profile::field_types::MesgNum};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    activity_store,
    config::ScanOrder,
    errors::{PacerError, Result},
    features::{FeatureExtractor, columns as col},
    table::{Column, Table},
};

pub const FIT_EXTENSION: &str = "fit";

/// Columns of an activity with no `record` messages.
pub const EXPECTED_FIT_COLUMNS: [&str; 19] = [
    "accumulated_power",
    "activity_type",
    "cadence",
    "distance",
    "enhanced_altitude",
    "enhanced_speed",
    "fractional_cadence",
    "heart_rate",
    "position_lat",
    "position_long",
    "power",
    "stance_time",
    "stance_time_balance",
    "stance_time_percent",
    "step_length",
    "temperature",
    "timestamp",
    "vertical_oscillation",
    "vertical_ratio",
];

/// Names for developer fields the decoder reports as `unknown_field_N`.
pub const UNKNOWN_FIELD_NAMES: [(&str, &str); 8] = [
    ("unknown_field_87", "cycle_length"),
    ("unknown_field_90", "performance_condition"),
    ("unknown_field_107", "is_moving"),
    ("unknown_field_136", "wrist_heart_rate"),
    ("unknown_field_137", "stamina_potential"),
    ("unknown_field_138", "stamina"),
    ("unknown_field_140", "grade_adjusted_pace"),
    ("unknown_field_143", "body_battery"),
];

const RUNNING: &str = "running";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Record,
    Session,
    Sport,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitValue {
    Number(f64),
    Text(String),
    Timestamp(OffsetDateTime),
}

impl FitValue {
    fn as_cell(&self) -> String {
        match self {
            FitValue::Number(v) => v.to_string(),
            FitValue::Text(s) => s.clone(),
            FitValue::Timestamp(ts) => ts.format(&Rfc3339).unwrap_or_default(),
        }
    }
}

/// One decoded message with its fields in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct FitMessage {
    pub kind: MessageKind,
    pub fields: Vec<(String, FitValue)>,
}

impl FitMessage {
    pub fn field(&self, name: &str) -> Option<&FitValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn from_record(record: &FitDataRecord) -> Self {
        let kind = match record.kind() {
            MesgNum::Record => MessageKind::Record,
            MesgNum::Session => MessageKind::Session,
            MesgNum::Sport => MessageKind::Sport,
            _ => MessageKind::Other,
        };

        let fields = record
            .fields()
            .iter()
            .filter_map(|field| {
                let name = field.name();
                let value = match (name, field.value()) {
                    ("position_lat" | "position_long", Value::SInt32(v)) => {
                        Some(FitValue::Number(semicircles_to_degrees(*v)))
                    }
                    (_, value) => convert_value(value),
                }?;
                Some((name.to_string(), value))
            })
            .collect();

        Self { kind, fields }
    }
}

fn convert_value(value: &Value) -> Option<FitValue> {
    match value {
        Value::Timestamp(t) => chrono_to_offset_datetime(t).map(FitValue::Timestamp),
        Value::String(s) => Some(FitValue::Text(s.clone())),
        Value::Float32(v) => Some(FitValue::Number(*v as f64)),
        Value::Float64(v) => Some(FitValue::Number(*v)),
        Value::SInt8(v) => Some(FitValue::Number(*v as f64)),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) | Value::Enum(v) => {
            Some(FitValue::Number(*v as f64))
        }
        Value::SInt16(v) => Some(FitValue::Number(*v as f64)),
        Value::UInt16(v) | Value::UInt16z(v) => Some(FitValue::Number(*v as f64)),
        Value::SInt32(v) => Some(FitValue::Number(*v as f64)),
        Value::UInt32(v) | Value::UInt32z(v) => Some(FitValue::Number(*v as f64)),
        Value::SInt64(v) => Some(FitValue::Number(*v as f64)),
        Value::UInt64(v) | Value::UInt64z(v) => Some(FitValue::Number(*v as f64)),
        _ => None,
    }
}

/// FIT stores positions as semicircles: 2^31 semicircles = 180 degrees.
fn semicircles_to_degrees(semicircles: i32) -> f64 {
    (semicircles as f64) * (180.0 / 2_147_483_648.0)
}

fn chrono_to_offset_datetime(dt: &chrono::DateTime<chrono::Local>) -> Option<OffsetDateTime> {
    let utc = dt.with_timezone(&chrono::Utc);
    let nanos = i128::from(utc.timestamp()) * 1_000_000_000 + i128::from(utc.timestamp_subsec_nanos());
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

/// Decodes raw FIT bytes.
pub fn decode_fit(bytes: &[u8]) -> Result<Vec<FitMessage>> {
    let records =
        fitparser::from_bytes(bytes).map_err(|e| PacerError::FitParsing(e.to_string()))?;
    Ok(records.iter().map(FitMessage::from_record).collect())
}

pub fn read_fit_messages(path: impl AsRef<Path>) -> Result<Vec<FitMessage>> {
    let bytes = fs::read(path)?;
    decode_fit(&bytes)
}

/// Lower-cased `(sport, sub_sport)`, from the first session messages carrying them and
/// otherwise from `sport` messages. Empty strings when absent.
pub fn get_sport(messages: &[FitMessage]) -> (String, String) {
    let mut sport = String::new();
    let mut sub_sport = String::new();

    for kind in [MessageKind::Session, MessageKind::Sport] {
        for msg in messages.iter().filter(|m| m.kind == kind) {
            if sport.is_empty() {
                if let Some(v) = msg.field(col::SPORT) {
                    sport = v.as_cell().to_lowercase();
                }
            }
            if sub_sport.is_empty() {
                if let Some(v) = msg.field(col::SUB_SPORT) {
                    sub_sport = v.as_cell().to_lowercase();
                }
            }
            if !sport.is_empty() && !sub_sport.is_empty() {
                return (sport, sub_sport);
            }
        }
    }

    (sport, sub_sport)
}

fn rename_unknown(name: &str) -> &str {
    UNKNOWN_FIELD_NAMES
        .iter()
        .find(|(raw, _)| *raw == name)
        .map_or(name, |(_, renamed)| *renamed)
}

/// One row per `record` message; columns in order of first appearance, plus constant
/// `sport` and `sub_sport` columns.
pub fn messages_to_table(messages: &[FitMessage]) -> Result<Table> {
    let records: Vec<&FitMessage> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Record)
        .collect();

    let mut names: Vec<String> = Vec::new();
    let mut cells: HashMap<String, Vec<Option<&FitValue>>> = HashMap::new();
    for (row, record) in records.iter().enumerate() {
        for (name, value) in &record.fields {
            let name = rename_unknown(name);
            let column = cells.entry(name.to_string()).or_insert_with(|| {
                names.push(name.to_string());
                vec![None; records.len()]
            });
            column[row] = Some(value);
        }
    }

    let mut table = Table::new();
    if records.is_empty() {
        for name in EXPECTED_FIT_COLUMNS {
            table.push_float(name, Vec::new())?;
        }
    }
    for name in names {
        let values = cells.remove(&name).unwrap_or_default();
        table.push_column(name, to_column(values))?;
    }

    let (sport, sub_sport) = get_sport(messages);
    let constant = |value: &str| vec![Some(value.to_string()); records.len()];
    table.push_text(col::SPORT, constant(&sport))?;
    table.push_text(col::SUB_SPORT, constant(&sub_sport))?;
    Ok(table)
}

fn to_column(values: Vec<Option<&FitValue>>) -> Column {
    let numeric = values
        .iter()
        .flatten()
        .all(|v| matches!(v, FitValue::Number(_)));
    if numeric {
        Column::Float(
            values
                .into_iter()
                .map(|v| match v {
                    Some(FitValue::Number(n)) if !n.is_nan() => Some(*n),
                    _ => None,
                })
                .collect(),
        )
    } else {
        Column::Text(values.into_iter().map(|v| v.map(FitValue::as_cell)).collect())
    }
}

/// Reads a `.fit` file into a telemetry table.
pub fn read_fit(path: impl AsRef<Path>) -> Result<Table> {
    messages_to_table(&read_fit_messages(path)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Clear the destination (except `.gitkeep`) first.
    Replace,
    /// Only convert files without a matching destination stem.
    #[default]
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn clear_destination(destination: &Path) -> Result<()> {
    if !destination.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(destination)? {
        let entry = entry?;
        if entry.file_name() == ".gitkeep" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn existing_stems(destination: &Path) -> Result<HashSet<String>> {
    Ok(activity_store::list_activities(destination, ScanOrder::FileName)?
        .iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect())
}

fn is_running(sport: &str, sub_sport: &str) -> bool {
    sport == RUNNING || sub_sport == RUNNING
}

/// Converts one FIT file; `Ok(None)` when the activity is not a run.
fn ingest_file(extractor: &FeatureExtractor, fit_path: &Path, destination: &Path) -> Result<Option<PathBuf>> {
    let messages = read_fit_messages(fit_path)?;
    let (sport, sub_sport) = get_sport(&messages);
    if !is_running(&sport, &sub_sport) {
        tracing::debug!("Skipping {} ({}/{})", fit_path.display(), sport, sub_sport);
        return Ok(None);
    }

    let mut table = extractor.standardize(&messages_to_table(&messages)?)?;
    let origin = fit_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    table.push_text(col::ORIGIN_FILE_NAME, vec![origin; table.len()])?;

    let stem = fit_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out = destination.join(format!("{stem}.{}", activity_store::ACTIVITY_EXTENSION));
    table.write_csv(&out)?;
    Ok(Some(out))
}

/// Converts every `.fit` run in `source` into a standardized activity CSV in `destination`.
pub fn ingest_directory(
    extractor: &FeatureExtractor,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    mode: IngestMode,
) -> Result<IngestReport> {
    let source = source.as_ref();
    let destination = destination.as_ref();
    if !source.is_dir() {
        return Err(PacerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Source directory does not exist: {}", source.display()),
        )));
    }

    if mode == IngestMode::Replace {
        clear_destination(destination)?;
    }
    fs::create_dir_all(destination)?;

    let existing = match mode {
        IngestMode::Incremental => existing_stems(destination)?,
        IngestMode::Replace => HashSet::new(),
    };

    let files = activity_store::list_files(source, FIT_EXTENSION, ScanOrder::FileName)?;
    tracing::info!("{} .fit files found in {}", files.len(), source.display());

    let mut report = IngestReport::default();
    for fit_path in files {
        let stem = fit_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if existing.contains(&stem) {
            report.skipped += 1;
            continue;
        }

        match ingest_file(extractor, &fit_path, destination) {
            Ok(Some(_)) => report.converted += 1,
            Ok(None) => report.skipped += 1,
            Err(e) => {
                tracing::warn!("Failed to ingest {}: {}", fit_path.display(), e);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "{} run activities converted in {}; skipped {}, failed {}",
        report.converted,
        destination.display(),
        report.skipped,
        report.failed
    );
    Ok(report)
}
