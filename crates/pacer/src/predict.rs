//! Elapsed-time inference from a loaded model artifact.

use ndarray::Array1;

use crate::{
    artifact::ModelArtifact,
    errors::{PacerError, Result},
    matrix::{Feature, build_inference_vector},
};

/// Predicted elapsed seconds for a route, never negative.
///
/// The feature vector follows `artifact.feature_names`, so an artifact with the same
/// coefficients listed in a different order predicts the same value. Features a route cannot
/// supply take the training mean stored at the same position in `feature_means`.
pub fn predict_elapsed_seconds(
    artifact: &ModelArtifact,
    distance: f64,
    cum_altitude_gain: f64,
    is_trail: bool,
) -> Result<f64> {
    let supplied = build_inference_vector(distance, cum_altitude_gain, is_trail);

    let vector: Array1<f64> = artifact
        .feature_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = name
                .parse::<Feature>()
                .ok()
                .and_then(|feature| supplied.get(&feature).copied());
            if let Some(value) = value {
                return Ok(value);
            }
            match artifact.feature_means.get(i) {
                Some(mean) => {
                    tracing::debug!("Feature {} not supplied; using training mean {}", name, mean);
                    Ok(*mean)
                }
                None => Err(PacerError::UnknownFeature(name.clone())),
            }
        })
        .collect::<Result<_>>()?;

    if artifact.coefficients.len() != vector.len() {
        return Err(PacerError::SchemaMismatch {
            expected: artifact.coefficients.len(),
            actual: vector.len(),
        });
    }

    let coefficients = Array1::from(artifact.coefficients.clone());
    let prediction = artifact.intercept + vector.dot(&coefficients);
    Ok(prediction.max(0.0))
}

/// `H:MM:SS`, truncating fractional seconds. Hours are not wrapped at 24.
pub fn format_hms(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--:--:--".to_string();
    }
    let total = seconds.max(0.0).trunc() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(names: &[&str], coefficients: &[f64], intercept: f64) -> ModelArtifact {
        ModelArtifact {
            model_version: "test".to_string(),
            schema_version: 1,
            intercept,
            coefficients: coefficients.to_vec(),
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            feature_means: Vec::new(),
            feature_stds: None,
            target_name: "elapsed_seconds".to_string(),
        }
    }

    #[test]
    fn test_dot_product_plus_intercept() {
        let a = artifact(&["distance", "cum_altitude_gain"], &[2.0, 3.0], 10.0);
        let seconds = predict_elapsed_seconds(&a, 100.0, 5.0, false).unwrap();
        assert_eq!(seconds, 225.0);
    }

    #[test]
    fn test_negative_prediction_clamps_to_zero() {
        let a = artifact(&["distance"], &[-1.0], 10.0);
        let seconds = predict_elapsed_seconds(&a, 500.0, 0.0, false).unwrap();
        assert_eq!(seconds, 0.0);
        assert!(seconds.is_sign_positive());
    }

    #[test]
    fn test_order_follows_artifact() {
        let canonical = artifact(
            &["distance", "cum_altitude_gain", "is_trail"],
            &[0.4, 6.0, 300.0],
            60.0,
        );
        let reversed = artifact(
            &["is_trail", "cum_altitude_gain", "distance"],
            &[300.0, 6.0, 0.4],
            60.0,
        );

        for is_trail in [false, true] {
            let a = predict_elapsed_seconds(&canonical, 10_000.0, 250.0, is_trail).unwrap();
            let b = predict_elapsed_seconds(&reversed, 10_000.0, 250.0, is_trail).unwrap();
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_trail_gated_features() {
        let a = artifact(&["trail_distance", "trail_cum_altitude_gain"], &[1.0, 1.0], 0.0);
        assert_eq!(predict_elapsed_seconds(&a, 100.0, 10.0, false).unwrap(), 0.0);
        assert_eq!(predict_elapsed_seconds(&a, 100.0, 10.0, true).unwrap(), 110.0);
    }

    #[test]
    fn test_unknown_feature_and_length_mismatch() {
        let a = artifact(&["distance", "heart_rate"], &[1.0, 1.0], 0.0);
        assert!(matches!(
            predict_elapsed_seconds(&a, 1.0, 1.0, false),
            Err(PacerError::UnknownFeature(name)) if name == "heart_rate"
        ));

        let a = artifact(&["distance", "cum_altitude_gain"], &[1.0], 0.0);
        assert!(matches!(
            predict_elapsed_seconds(&a, 1.0, 1.0, false),
            Err(PacerError::SchemaMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_unsupplied_feature_uses_training_mean() {
        let mut a = artifact(
            &["distance", "average_hr", "cum_altitude_gain"],
            &[0.3, 2.0, 5.0],
            60.0,
        );
        a.feature_means = vec![8000.0, 150.0, 120.0];

        let seconds = predict_elapsed_seconds(&a, 10_000.0, 100.0, false).unwrap();
        assert!((seconds - (60.0 + 0.3 * 10_000.0 + 2.0 * 150.0 + 5.0 * 100.0)).abs() < 1e-9);

        // supplied features never fall back to the mean
        a.feature_means = vec![0.0, 150.0, 0.0];
        let same = predict_elapsed_seconds(&a, 10_000.0, 100.0, false).unwrap();
        assert_eq!(seconds, same);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "0:00:00");
        assert_eq!(format_hms(225.9), "0:03:45");
        assert_eq!(format_hms(3661.0), "1:01:01");
        assert_eq!(format_hms(90_000.0), "25:00:00");
        assert_eq!(format_hms(f64::NAN), "--:--:--");
        assert_eq!(format_hms(f64::INFINITY), "--:--:--");
    }
}
