//! Activity store to saved model to route prediction, through the public API only.

use std::{fmt::Write as _, fs, path::Path};

use pacer::{
    GpxProcessor, ModelArtifact, PacerConfig, RouteSummarizer, UnitSystem, activity_store,
    format_hms,
    pace::{self, PaceModel, PacePrediction},
    predict_elapsed_seconds, training,
};
use time::{Duration, format_description::well_known::Rfc3339, macros::datetime};

// elapsed = 60 + 0.3 * distance + 5 * gain + 120 * trail
fn expected_elapsed(distance: f64, gain: f64, trail: bool) -> f64 {
    60.0 + 0.3 * distance + 5.0 * gain + if trail { 120.0 } else { 0.0 }
}

fn write_activity(dir: &Path, name: &str, distance: f64, gain: f64, trail: bool) {
    let elapsed = expected_elapsed(distance, gain, trail);
    let sub_sport = if trail { "trail" } else { "road" };
    let start = datetime!(2024-05-01 10:00 UTC);

    let mut csv = String::from("timestamp,distance,enhanced_altitude,sport,sub_sport\n");
    for step in 0..=10 {
        let f = step as f64 / 10.0;
        let ts = (start + Duration::seconds_f64(elapsed * f)).format(&Rfc3339).unwrap();
        writeln!(csv, "{ts},{},{},running,{sub_sport}", distance * f, 1000.0 + gain * f).unwrap();
    }
    fs::write(dir.join(format!("{name}.csv")), csv).unwrap();
}

fn write_route(path: &Path) {
    let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacer-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>Equator</name><trkseg>
    <trkpt lat="0" lon="0"><ele>100</ele></trkpt>
    <trkpt lat="0" lon="0.01"><ele>150</ele></trkpt>
    <trkpt lat="0" lon="0.02"><ele>140</ele></trkpt>
  </trkseg></trk>
</gpx>"#;
    fs::write(path, gpx).unwrap();
}

fn seed_store(dir: &Path) {
    let runs = [
        (5000.0, 50.0, false),
        (8000.0, 120.0, false),
        (10000.0, 30.0, false),
        (6000.0, 300.0, true),
        (12000.0, 600.0, true),
        (3000.0, 10.0, false),
    ];
    for (i, (distance, gain, trail)) in runs.into_iter().enumerate() {
        write_activity(dir, &format!("run_{i}"), distance, gain, trail);
    }
}

#[test]
fn test_train_save_load_predict_route() {
    let store = tempfile::tempdir().unwrap();
    seed_store(store.path());
    let config = PacerConfig::default();

    let model_path = store.path().join("models").join("linear.json");
    training::train_and_save(store.path(), &model_path, &config, "linear_v1").unwrap();
    let artifact = ModelArtifact::load(&model_path).unwrap();
    assert_eq!(artifact.model_version, "linear_v1");
    assert_eq!(artifact.target_name, "elapsed_seconds");

    let route_path = store.path().join("route.gpx");
    write_route(&route_path);
    let route = GpxProcessor::load_file(&route_path).unwrap();
    let summary = RouteSummarizer::new(UnitSystem::Metric)
        .summarize(&route)
        .unwrap();
    assert!((summary.total_elevation_gain - 50.0).abs() < 1e-9);

    for trail in [false, true] {
        let predicted = predict_elapsed_seconds(
            &artifact,
            summary.total_distance,
            summary.total_elevation_gain,
            trail,
        )
        .unwrap();
        let expected = expected_elapsed(summary.total_distance, 50.0, trail);
        assert!(
            (predicted - expected).abs() < 1e-3,
            "trail={trail}: {predicted} vs {expected}"
        );
    }

    let road = predict_elapsed_seconds(&artifact, 10000.0, 0.0, false).unwrap();
    assert!((road - 3060.0).abs() < 1e-6);
    assert_eq!(format_hms(road.round()), "0:51:00");
}

#[test]
fn test_pace_models_over_store() {
    let store = tempfile::tempdir().unwrap();
    seed_store(store.path());
    let config = PacerConfig::default();

    let activities = activity_store::load_activities(store.path(), config.scan_order).unwrap();
    assert_eq!(activities.len(), 6);

    let speeds = pace::evaluate_pace_models(&activities);
    assert_eq!(speeds.len(), PaceModel::ALL.len());
    for (model, speed) in &speeds {
        assert!(*speed > 0.0, "{model} gave {speed}");
        let prediction = PacePrediction::new(*model, *speed, 10000.0, UnitSystem::Metric);
        assert!((prediction.eta_seconds - 10000.0 / speed).abs() < 1e-6);
    }
}

#[test]
fn test_training_skips_unreadable_activity() {
    let store = tempfile::tempdir().unwrap();
    seed_store(store.path());
    fs::write(store.path().join("broken.csv"), "").unwrap();
    fs::write(store.path().join("notes.txt"), "not an activity").unwrap();

    let artifact =
        training::train_from_directory(store.path(), &PacerConfig::default(), "linear_v1").unwrap();
    assert!((artifact.intercept - 60.0).abs() < 1e-6);
}
