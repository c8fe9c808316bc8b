//! Command-line surface of the `pacer` binary.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::{
    FeatureExtractor, GpxProcessor, ModelArtifact, PacerConfig, RouteSummarizer, RouteSummary,
    RouteTable, UnitSystem, activity_store,
    artifact::DEFAULT_MODEL_VERSION,
    config::{M_TO_KM_MULTIPLIER, ScanOrder},
    file_parsers::{self, IngestMode},
    format_hms,
    pace::{self, PacePrediction},
    predict_elapsed_seconds, training,
};

pub const SUCCESS: u8 = 0;
pub const FAILED: u8 = 1;
pub const BAD_PATH: u8 = 2;

const DEFAULT_FIT_SOURCE: &str = "data/garmin_fit_activities";

#[derive(Parser)]
#[command(name = "pacer", about = "Predict how long a GPX route will take from your activity history")]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print distance and elevation gain of a GPX route
    Route {
        gpx: PathBuf,
        #[arg(long)]
        imperial: bool,
    },
    /// Print a summary of one activity-store file
    Activity {
        activity: PathBuf,
        #[arg(long)]
        imperial: bool,
    },
    /// Convert .fit files into activity-store CSV files
    Ingest {
        #[arg(short, long)]
        source: Option<PathBuf>,
        #[arg(short, long)]
        destination: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ModeArg::Incremental)]
        mode: ModeArg,
    },
    /// Fit the linear time model on an activity directory
    Train {
        activity_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_MODEL_VERSION)]
        model_version: String,
        /// Scan activities by modification time instead of file name
        #[arg(long)]
        by_modified: bool,
    },
    /// Predict the elapsed time of a GPX route
    Predict {
        activity_dir: PathBuf,
        gpx: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        trail: bool,
        #[arg(long)]
        imperial: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Replace,
    Incremental,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => IngestMode::Replace,
            ModeArg::Incremental => IngestMode::Incremental,
        }
    }
}

fn units(imperial: bool, config: &PacerConfig) -> UnitSystem {
    if imperial { UnitSystem::Imperial } else { config.units }
}

/// Runs one command and returns the process exit code.
///
/// `2` means a path argument does not exist, `1` means the command could not produce its output.
pub fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = PacerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Route { gpx, imperial } => route(&gpx, units(imperial, &config)),
        Command::Activity { activity, imperial } => {
            activity_summary(&activity, &config, units(imperial, &config))
        }
        Command::Ingest {
            source,
            destination,
            mode,
        } => {
            let source = source.unwrap_or_else(|| PathBuf::from(DEFAULT_FIT_SOURCE));
            let destination = destination.unwrap_or_else(|| config.activity_dir.clone());
            let extractor = FeatureExtractor::new(config.extractor.clone());
            let report =
                file_parsers::ingest_directory(&extractor, &source, &destination, mode.into())?;
            println!(
                "{} run activities converted in {}; skipped {}, failed {}",
                report.converted,
                destination.display(),
                report.skipped,
                report.failed
            );
            Ok(SUCCESS)
        }
        Command::Train {
            activity_dir,
            output,
            model_version,
            by_modified,
        } => {
            let mut config = config;
            if by_modified {
                config.scan_order = ScanOrder::LastModified;
            }
            let dir = activity_dir.unwrap_or_else(|| config.activity_dir.clone());
            let output = output.unwrap_or_else(|| config.model_path.clone());
            let artifact = training::train_and_save(&dir, &output, &config, &model_version)?;
            println!("Saved {} to {}", artifact.model_version, output.display());
            for (name, coef) in artifact.feature_names.iter().zip(&artifact.coefficients) {
                println!("  {name}: {coef:.6}");
            }
            println!("  intercept: {:.3}", artifact.intercept);
            Ok(SUCCESS)
        }
        Command::Predict {
            activity_dir,
            gpx,
            model,
            trail,
            imperial,
        } => {
            let model = model.unwrap_or_else(|| config.model_path.clone());
            predict(&activity_dir, &gpx, &model, trail, units(imperial, &config), &config)
        }
    }
}

fn print_route(gpx: &Path, summary: &RouteSummary, units: UnitSystem) {
    println!(
        "Loaded GPX file: '{}' ({:.2} {}, {:.0} {} gain)",
        gpx.display(),
        summary.total_distance,
        units.distance_unit(),
        summary.total_elevation_gain,
        units.elevation_unit()
    );
}

fn route(gpx: &Path, units: UnitSystem) -> anyhow::Result<u8> {
    if !gpx.is_file() {
        tracing::error!("GPX file {} does not exist or is not a file", gpx.display());
        return Ok(BAD_PATH);
    }
    let table = match GpxProcessor::load_file(gpx) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Failed to read GPX file: {}", e);
            return Ok(FAILED);
        }
    };
    let summary = RouteSummarizer::new(units).summarize(&table)?;
    print_route(gpx, &summary, units);
    Ok(SUCCESS)
}

fn activity_summary(path: &Path, config: &PacerConfig, units: UnitSystem) -> anyhow::Result<u8> {
    if !path.is_file() {
        tracing::error!("Activity file {} does not exist", path.display());
        return Ok(BAD_PATH);
    }
    let extractor = FeatureExtractor::new(config.extractor.clone());
    let summary = activity_store::summarize_file(&extractor, path)?;

    let (distance_factor, distance_unit) = match units {
        UnitSystem::Metric => (M_TO_KM_MULTIPLIER, "kilometers"),
        UnitSystem::Imperial => (units.distance_factor(), units.distance_unit()),
    };

    println!("Activity summary for {}:", path.display());
    if let Some(elapsed) = summary.elapsed_seconds {
        println!("  Elapsed time: {:.2} hours", elapsed / 3600.0);
    }
    if let Some(distance) = summary.distance {
        println!("  Distance: {:.2} {}", distance * distance_factor, distance_unit);
    }
    if let Some(gain) = summary.cum_altitude_gain {
        println!(
            "  Elevation gain: {:.0} {}",
            gain * units.elevation_factor(),
            units.elevation_unit()
        );
    }
    for (label, value, suffix) in [
        ("Average heart rate", summary.average_hr, "bpm"),
        ("Average cadence", summary.avg_cadence, "spm"),
        ("Average power", summary.avg_power, "watts"),
    ] {
        if let Some(value) = value {
            println!("  {label}: {value:.1} {suffix}");
        }
    }
    Ok(SUCCESS)
}

fn load_model(path: &Path) -> Option<ModelArtifact> {
    if !path.exists() {
        tracing::warn!(
            "Linear model not found at {}; run `pacer train` to create it",
            path.display()
        );
        return None;
    }
    match ModelArtifact::load(path) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            tracing::warn!("Failed to load linear model: {}", e);
            None
        }
    }
}

/// The metric summary the models take, and the same route summarized in `units` for printing.
fn model_and_display_summaries(
    table: &RouteTable,
    units: UnitSystem,
) -> crate::Result<(RouteSummary, RouteSummary)> {
    let route = RouteSummarizer::new(UnitSystem::Metric).summarize(table)?;
    let display = RouteSummarizer::new(units).summarize(table)?;
    Ok((route, display))
}

fn predict(
    activity_dir: &Path,
    gpx: &Path,
    model_path: &Path,
    trail: bool,
    units: UnitSystem,
    config: &PacerConfig,
) -> anyhow::Result<u8> {
    if !activity_dir.is_dir() {
        tracing::error!(
            "Directory {} does not exist or is not a directory",
            activity_dir.display()
        );
        return Ok(BAD_PATH);
    }
    if !gpx.is_file() {
        tracing::error!("GPX file {} does not exist or is not a file", gpx.display());
        return Ok(BAD_PATH);
    }

    let (route, display) = match GpxProcessor::load_file(gpx)
        .and_then(|table| model_and_display_summaries(&table, units))
    {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::error!("Failed to read GPX file: {}", e);
            return Ok(FAILED);
        }
    };
    print_route(gpx, &display, units);

    let activities = activity_store::load_activities(activity_dir, config.scan_order)?;
    let speeds = pace::evaluate_pace_models(&activities);
    let mut produced = false;

    let pace_unit = match units {
        UnitSystem::Metric => ("km/h", "min/km"),
        UnitSystem::Imperial => ("mph", "min/mi"),
    };
    for (model, speed) in &speeds {
        let prediction = PacePrediction::new(*model, *speed, route.total_distance, units);
        println!(
            "\n[{}]\n  Baseline speed : {:.2} {}\n  Baseline pace  : {:.2} {}\n  Predicted time : {}",
            model,
            prediction.speed_in(units),
            pace_unit.0,
            prediction.pace_seconds_per_unit / 60.0,
            pace_unit.1,
            format_hms(prediction.eta_seconds)
        );
        produced = true;
    }

    if let Some(artifact) = load_model(model_path) {
        match predict_elapsed_seconds(
            &artifact,
            route.total_distance,
            route.total_elevation_gain,
            trail,
        ) {
            Ok(seconds) => {
                println!(
                    "\n[{}]\n  Predicted elapsed_seconds : {:.1}\n  Predicted time : {}",
                    artifact.model_version,
                    seconds,
                    format_hms(seconds)
                );
                produced = true;
            }
            Err(e) => tracing::warn!("Linear model could not predict: {}", e),
        }
    }

    if !produced {
        tracing::error!("No model produced a prediction");
        return Ok(FAILED);
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacer-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="0" lon="0"><ele>100</ele></trkpt>
    <trkpt lat="0" lon="0.01"><ele>150</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    fn run_args(args: &[&str]) -> u8 {
        let cli = Cli::try_parse_from(std::iter::once("pacer").chain(args.iter().copied())).unwrap();
        run(cli).unwrap()
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_missing_paths_exit_two() {
        let dir = tempfile::tempdir().unwrap();
        let gpx = dir.path().join("route.gpx");
        fs::write(&gpx, ROUTE).unwrap();
        let missing = dir.path().join("missing");

        assert_eq!(
            run_args(&["predict", path_str(&missing), path_str(&gpx)]),
            BAD_PATH
        );
        assert_eq!(
            run_args(&["predict", path_str(dir.path()), path_str(&missing)]),
            BAD_PATH
        );
        assert_eq!(run_args(&["route", path_str(&missing)]), BAD_PATH);
        assert_eq!(run_args(&["activity", path_str(&missing)]), BAD_PATH);
    }

    #[test]
    fn test_corrupt_gpx_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let gpx = dir.path().join("broken.gpx");
        fs::write(&gpx, "<gpx><trk><trkseg><trkpt lat=").unwrap();

        assert_eq!(run_args(&["route", path_str(&gpx)]), FAILED);
        assert_eq!(
            run_args(&["predict", path_str(dir.path()), path_str(&gpx)]),
            FAILED
        );
    }

    #[test]
    fn test_predict_display_summary_uses_display_units() {
        let dir = tempfile::tempdir().unwrap();
        let gpx = dir.path().join("route.gpx");
        fs::write(&gpx, ROUTE).unwrap();
        let table = GpxProcessor::load_file(&gpx).unwrap();

        let (route, display) = model_and_display_summaries(&table, UnitSystem::Imperial).unwrap();
        assert_eq!(
            display,
            RouteSummarizer::new(UnitSystem::Imperial).summarize(&table).unwrap()
        );
        assert_eq!(
            route,
            RouteSummarizer::new(UnitSystem::Metric).summarize(&table).unwrap()
        );
        assert!((route.total_elevation_gain - 50.0).abs() < 1e-9);
        assert!((display.total_elevation_gain - 50.0 * 3.28084).abs() < 1e-3);
        assert!(display.total_distance < 1.0);
    }

    #[test]
    fn test_predict_without_models_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let activities = dir.path().join("activities");
        fs::create_dir(&activities).unwrap();
        let gpx = dir.path().join("route.gpx");
        fs::write(&gpx, ROUTE).unwrap();
        let model = dir.path().join("missing.json");

        let args = [
            "predict",
            path_str(&activities),
            path_str(&gpx),
            "--model",
            path_str(&model),
        ];
        assert_eq!(run_args(&args), FAILED);

        // one usable activity is enough for the pace models
        fs::write(
            activities.join("run.csv"),
            "timestamp,distance\n2024-05-01T10:00:00Z,0\n2024-05-01T10:10:00Z,2000\n",
        )
        .unwrap();
        assert_eq!(run_args(&args), SUCCESS);
    }
}
