//! Persisted linear-model parameters.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::{PacerError, Result},
    matrix::{Feature, FeatureMatrix, TARGET_NAME},
    regression::LinearFit,
};

pub const DEFAULT_MODEL_VERSION: &str = "linear_v1";
/// Highest artifact layout this build reads.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Keys an artifact file must carry.
pub const REQUIRED_KEYS: [&str; 4] = ["intercept", "coefficients", "feature_names", "model_version"];

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

fn default_target_name() -> String {
    TARGET_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_version: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub intercept: f64,
    /// Aligned 1:1 with `feature_names`.
    pub coefficients: Vec<f64>,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_stds: Option<Vec<f64>>,
    #[serde(default = "default_target_name")]
    pub target_name: String,
}

impl ModelArtifact {
    pub fn from_fit(fit: &LinearFit, matrix: &FeatureMatrix, model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            intercept: fit.intercept,
            coefficients: fit.coefficients.to_vec(),
            feature_names: matrix
                .feature_names
                .iter()
                .map(|f| f.as_str().to_string())
                .collect(),
            feature_means: matrix.feature_means.to_vec(),
            feature_stds: None,
            target_name: TARGET_NAME.to_string(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::info!("Saved model {} to {}", self.model_version, path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Self::from_value(value)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Checks required keys (all missing ones reported together) and the schema version
    /// before decoding.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PacerError::MalformedInput(
                "model artifact must be a JSON object".to_string(),
            ));
        };

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !object.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PacerError::ArtifactMissingKeys(missing));
        }

        if let Some(version) = object.get("schema_version") {
            let version = version
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    PacerError::MalformedInput(format!("invalid schema_version: {version}"))
                })?;
            if version > CURRENT_SCHEMA_VERSION {
                return Err(PacerError::UnsupportedSchemaVersion(version));
            }
        }

        Ok(serde_json::from_value(value)?)
    }
}
