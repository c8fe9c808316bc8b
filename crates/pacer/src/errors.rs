use thiserror::Error;

pub type Result<T, E = PacerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum PacerError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("GPX parsing error: {0}")]
    GpxParsing(String),

    #[error("FIT parsing error: {0}")]
    FitParsing(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Artifact missing keys: {0:?}")]
    ArtifactMissingKeys(Vec<String>),

    #[error("Unsupported artifact schema_version {0}")]
    UnsupportedSchemaVersion(u32),

    #[error("Artifact references unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Coefficient length {expected} != feature length {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PacerError {
    /// True for structurally invalid input, as opposed to I/O or empty results.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            PacerError::MalformedInput(_)
                | PacerError::GpxParsing(_)
                | PacerError::FitParsing(_)
                | PacerError::Json(_)
                | PacerError::Csv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_name() {
        let err = PacerError::MissingColumns(vec!["sub_sport".into(), "distance".into()]);
        assert_eq!(
            err.to_string(),
            r#"Missing required columns: ["sub_sport", "distance"]"#
        );
    }

    #[test]
    fn test_malformed_classification() {
        assert!(PacerError::GpxParsing("bad lat".into()).is_malformed());
        assert!(!PacerError::EmptyResult("no points".into()).is_malformed());
        assert!(!PacerError::SchemaMismatch { expected: 2, actual: 3 }.is_malformed());
    }
}
