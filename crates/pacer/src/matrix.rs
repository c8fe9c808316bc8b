//! Training design matrix and inference-time feature vectors.
//!
//! [`Feature`] is the one vocabulary both paths share: the trainer writes
//! `Feature::as_str` names into the artifact and the predictor parses them back.

use std::{collections::BTreeMap, fmt, str::FromStr};

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{PacerError, Result},
    features::columns as col,
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Distance,
    CumAltitudeGain,
    IsTrail,
    TrailDistance,
    TrailCumAltitudeGain,
}

/// Column order of the training matrix.
pub const TRAINING_FEATURES: [Feature; 3] =
    [Feature::Distance, Feature::CumAltitudeGain, Feature::IsTrail];

pub const TARGET_NAME: &str = col::ELAPSED_SECONDS;
/// Older summaries name the target this way.
pub const LEGACY_TARGET_NAME: &str = "elapsed_time";

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Distance,
        Feature::CumAltitudeGain,
        Feature::IsTrail,
        Feature::TrailDistance,
        Feature::TrailCumAltitudeGain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Distance => col::DISTANCE,
            Feature::CumAltitudeGain => col::CUM_ALTITUDE_GAIN,
            Feature::IsTrail => "is_trail",
            Feature::TrailDistance => col::TRAIL_DISTANCE,
            Feature::TrailCumAltitudeGain => col::TRAIL_CUM_ALTITUDE_GAIN,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = PacerError;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| PacerError::UnknownFeature(s.to_string()))
    }
}

/// 1.0 when `sub_sport` names a trail activity (trimmed, case-insensitive), else 0.0.
pub fn encode_is_trail(sub_sport: Option<&str>, trail_label: &str) -> f64 {
    match sub_sport {
        Some(s) if s.trim().eq_ignore_ascii_case(trail_label.trim()) => 1.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// `[n_samples, n_features]`, columns in `feature_names` order.
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub feature_names: Vec<Feature>,
    /// Column means over the retained rows.
    pub feature_means: Array1<f64>,
}

impl FeatureMatrix {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Builds `(X, y)` from a table of activity summaries with the default trail label.
pub fn build_training_matrix(summaries: &Table) -> Result<FeatureMatrix> {
    build_training_matrix_with(summaries, "trail")
}

/// Builds `(X, y)` from a table of activity summaries.
///
/// Rows missing any feature or the target are dropped; if none remain this fails with
/// [`PacerError::EmptyResult`].
pub fn build_training_matrix_with(summaries: &Table, trail_label: &str) -> Result<FeatureMatrix> {
    let target = if !summaries.has_column(TARGET_NAME) && summaries.has_column(LEGACY_TARGET_NAME) {
        LEGACY_TARGET_NAME
    } else {
        TARGET_NAME
    };
    summaries.require(&[col::DISTANCE, col::CUM_ALTITUDE_GAIN, col::SUB_SPORT, target])?;

    let distance = summaries.float_column(col::DISTANCE)?;
    let gain = summaries.float_column(col::CUM_ALTITUDE_GAIN)?;
    let sub_sport = summaries.text_column(col::SUB_SPORT)?;
    let elapsed = summaries.float_column(target)?;

    let mut rows: Vec<[f64; 3]> = Vec::with_capacity(summaries.len());
    let mut targets = Vec::with_capacity(summaries.len());
    for i in 0..summaries.len() {
        let (Some(d), Some(g), Some(t)) = (distance[i], gain[i], elapsed[i]) else {
            continue;
        };
        let is_trail = encode_is_trail(sub_sport[i].as_deref(), trail_label);
        rows.push([d, g, is_trail]);
        targets.push(t);
    }

    let dropped = summaries.len() - rows.len();
    if dropped > 0 {
        tracing::debug!("Dropped {} incomplete activity rows", dropped);
    }
    if rows.is_empty() {
        return Err(PacerError::EmptyResult(
            "No valid rows after preprocessing".to_string(),
        ));
    }

    let n_features = TRAINING_FEATURES.len();
    let x = Array2::from_shape_vec(
        (rows.len(), n_features),
        rows.into_iter().flatten().collect(),
    )
    .map_err(|e| PacerError::MalformedInput(format!("design matrix: {e}")))?;
    let feature_means = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PacerError::EmptyResult("No valid rows after preprocessing".to_string()))?;

    Ok(FeatureMatrix {
        x,
        y: Array1::from(targets),
        feature_names: TRAINING_FEATURES.to_vec(),
        feature_means,
    })
}

/// Every feature the predictor can supply for a route.
///
/// Trail-gated features equal their totals on trail routes and 0 otherwise.
pub fn build_inference_vector(
    distance: f64,
    cum_altitude_gain: f64,
    is_trail: bool,
) -> BTreeMap<Feature, f64> {
    let gate = if is_trail { 1.0 } else { 0.0 };
    BTreeMap::from([
        (Feature::Distance, distance),
        (Feature::CumAltitudeGain, cum_altitude_gain),
        (Feature::IsTrail, gate),
        (Feature::TrailDistance, distance * gate),
        (Feature::TrailCumAltitudeGain, cum_altitude_gain * gate),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
        assert!(matches!(
            "heart_rate".parse::<Feature>(),
            Err(PacerError::UnknownFeature(name)) if name == "heart_rate"
        ));
        assert_eq!(
            serde_json::to_string(&Feature::CumAltitudeGain).unwrap(),
            "\"cum_altitude_gain\""
        );
    }

    #[test]
    fn test_trail_encoding() {
        assert_eq!(encode_is_trail(Some(" Trail "), "trail"), 1.0);
        assert_eq!(encode_is_trail(Some("road"), "trail"), 0.0);
        assert_eq!(encode_is_trail(None, "trail"), 0.0);
    }

    #[test]
    fn test_build_drops_incomplete_rows() {
        let table = summaries(
            "distance,cum_altitude_gain,sub_sport,elapsed_seconds\n\
             1000,10,trail,400\n\
             2000,,road,800\n\
             3000,30,road,1200\n\
             ,5,road,100\n",
        );
        let m = build_training_matrix(&table).unwrap();

        assert_eq!(m.n_samples(), 2);
        assert_eq!(m.n_features(), 3);
        assert_eq!(m.feature_names, TRAINING_FEATURES.to_vec());
        assert_eq!(m.x.row(0).to_vec(), vec![1000.0, 10.0, 1.0]);
        assert_eq!(m.x.row(1).to_vec(), vec![3000.0, 30.0, 0.0]);
        assert_eq!(m.y.to_vec(), vec![400.0, 1200.0]);
        assert_eq!(m.feature_means.to_vec(), vec![2000.0, 20.0, 0.5]);
    }

    #[test]
    fn test_missing_sub_sport_is_named() {
        let table = summaries("distance,cum_altitude_gain,elapsed_seconds\n1,2,3\n");
        match build_training_matrix(&table) {
            Err(PacerError::MissingColumns(missing)) => assert_eq!(missing, vec!["sub_sport"]),
            other => panic!("unexpected: {other:?}"),
        }

        let table = summaries("distance\n1\n");
        match build_training_matrix(&table) {
            Err(PacerError::MissingColumns(missing)) => assert_eq!(
                missing,
                vec!["cum_altitude_gain", "sub_sport", "elapsed_seconds"]
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_target_column() {
        let table = summaries(
            "distance,cum_altitude_gain,sub_sport,elapsed_time\n1000,10,road,400\n",
        );
        let m = build_training_matrix(&table).unwrap();
        assert_eq!(m.y.to_vec(), vec![400.0]);
    }

    #[test]
    fn test_no_complete_rows_is_empty_result() {
        let table = summaries(
            "distance,cum_altitude_gain,sub_sport,elapsed_seconds\n1000,,road,400\n",
        );
        assert!(matches!(
            build_training_matrix(&table),
            Err(PacerError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_inference_vector_trail_gate() {
        let road = build_inference_vector(5000.0, 120.0, false);
        assert_eq!(road[&Feature::IsTrail], 0.0);
        assert_eq!(road[&Feature::TrailDistance], 0.0);
        assert_eq!(road[&Feature::Distance], 5000.0);

        let trail = build_inference_vector(5000.0, 120.0, true);
        assert_eq!(trail[&Feature::IsTrail], 1.0);
        assert_eq!(trail[&Feature::TrailCumAltitudeGain], 120.0);
    }
}
