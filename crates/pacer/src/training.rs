//! Batch training of the linear elapsed-time model from an activity store.

use std::path::Path;

use crate::{
    activity_store,
    artifact::ModelArtifact,
    config::PacerConfig,
    errors::{PacerError, Result},
    features::{ActivitySummary, FeatureExtractor},
    matrix::build_training_matrix_with,
    regression,
};

/// Fits the linear model on already-computed activity summaries.
pub fn train_from_summaries(
    summaries: &[ActivitySummary],
    config: &PacerConfig,
    model_version: &str,
) -> Result<ModelArtifact> {
    if summaries.is_empty() {
        return Err(PacerError::EmptyResult(
            "no activity summaries to train on".to_string(),
        ));
    }

    let table = ActivitySummary::to_table(summaries)?;
    let matrix = build_training_matrix_with(&table, &config.extractor.trail_label)?;
    let fit = regression::fit(matrix.x.view(), matrix.y.view())?;

    tracing::info!(
        "Fitted {} on {} activities (intercept {:.3}, rmse {:.1}s)",
        model_version,
        matrix.n_samples(),
        fit.intercept,
        fit.rmse(matrix.x.view(), matrix.y.view())
    );
    Ok(ModelArtifact::from_fit(&fit, &matrix, model_version))
}

/// Summarizes the activity store in `dir` and fits the linear model.
pub fn train_from_directory(
    dir: impl AsRef<Path>,
    config: &PacerConfig,
    model_version: &str,
) -> Result<ModelArtifact> {
    let extractor = FeatureExtractor::new(config.extractor.clone());
    let summaries = activity_store::summarize_directory(&extractor, dir, config.scan_order)?;
    train_from_summaries(&summaries, config, model_version)
}

/// [`train_from_directory`], then writes the artifact to `output`.
pub fn train_and_save(
    dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PacerConfig,
    model_version: &str,
) -> Result<ModelArtifact> {
    let artifact = train_from_directory(dir, config, model_version)?;
    artifact.save(output)?;
    Ok(artifact)
}
