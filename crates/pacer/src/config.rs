//! Configuration for route summaries, feature extraction and the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Meters to feet.
pub const M_TO_FT_MULTIPLIER: f64 = 3.28084;
/// Meters to miles.
pub const M_TO_MI_MULTIPLIER: f64 = 0.000621371;
/// Meters to kilometers.
pub const M_TO_KM_MULTIPLIER: f64 = 0.001;
/// Meters per second to miles per hour.
pub const MPS_TO_MPH_MULTIPLIER: f64 = 2.23694;

/// Unit system for user-facing distances and elevation gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Meters for both distance and gain.
    #[default]
    Metric,
    /// Miles for distance, feet for gain.
    Imperial,
}

impl UnitSystem {
    pub fn distance_factor(self) -> f64 {
        match self {
            UnitSystem::Metric => 1.0,
            UnitSystem::Imperial => M_TO_MI_MULTIPLIER,
        }
    }

    pub fn elevation_factor(self) -> f64 {
        match self {
            UnitSystem::Metric => 1.0,
            UnitSystem::Imperial => M_TO_FT_MULTIPLIER,
        }
    }

    pub fn distance_unit(self) -> &'static str {
        match self {
            UnitSystem::Metric => "meters",
            UnitSystem::Imperial => "miles",
        }
    }

    pub fn elevation_unit(self) -> &'static str {
        match self {
            UnitSystem::Metric => "meters",
            UnitSystem::Imperial => "feet",
        }
    }
}

/// Order in which an activity directory is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrder {
    #[default]
    FileName,
    LastModified,
}

/// Settings for the activity feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Floor for the distance step when computing gradients.
    pub gradient_epsilon: f64,
    /// `sub_sport` label that marks an activity as trail.
    pub trail_label: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            gradient_epsilon: 1e-6,
            trail_label: "trail".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    pub units: UnitSystem,
    /// Directory of activity-store CSV files.
    pub activity_dir: PathBuf,
    /// Where the linear model artifact is read from and written to.
    pub model_path: PathBuf,
    pub scan_order: ScanOrder,
    pub extractor: ExtractorConfig,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            units: UnitSystem::Metric,
            activity_dir: PathBuf::from("data/activities"),
            model_path: PathBuf::from("models/linear_v1.json"),
            scan_order: ScanOrder::FileName,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl PacerConfig {
    /// Defaults, overlaid by an optional JSON file, overlaid by `PACER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                serde_json::from_str(&contents)?
            }
            None => Self::default(),
        };

        if let Ok(dir) = std::env::var("PACER_ACTIVITY_DIR") {
            config.activity_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("PACER_MODEL_PATH") {
            config.model_path = PathBuf::from(model);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_factors() {
        assert_eq!(UnitSystem::Metric.distance_factor(), 1.0);
        assert_eq!(UnitSystem::Metric.elevation_factor(), 1.0);
        assert!((UnitSystem::Imperial.distance_factor() * 1609.34 - 1.0).abs() < 1e-4);
        assert!((UnitSystem::Imperial.elevation_factor() * 0.3048 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacer.json");
        std::fs::write(&path, r#"{"units": "imperial"}"#).unwrap();

        let config = PacerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.units, UnitSystem::Imperial);
        assert_eq!(config.extractor, ExtractorConfig::default());
        assert_eq!(config.scan_order, ScanOrder::FileName);
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacer.json");
        std::fs::write(&path, "units = imperial").unwrap();

        assert!(PacerConfig::load(Some(&path)).is_err());
    }
}
