//! Default seed script - writes an activity store and a route to predict
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin seed
//! ```
//!
//! `SEED_OUTPUT_DIR` (default `data/synthetic`), `SEED_ACTIVITIES`, `SEED_ROAD_PACE` and `SEED`
//! override the defaults.

use std::{fs, path::PathBuf};

use pacer::{FeatureExtractor, PacerConfig};
use rand::Rng;
use test_data::prelude::*;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::EnvFilter;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let defaults = SeedConfig::default();
    let config = SeedConfig {
        activity_count: env_or("SEED_ACTIVITIES", defaults.activity_count)?,
        road_pace_min_per_km: env_or("SEED_ROAD_PACE", defaults.road_pace_min_per_km)?,
        seed: env_or("SEED", defaults.seed)?,
        ..defaults
    };
    let output_dir = PathBuf::from(env_or("SEED_OUTPUT_DIR", "data/synthetic".to_string())?);
    let activity_dir = output_dir.join("activities");
    fs::create_dir_all(&activity_dir)?;

    let extractor = FeatureExtractor::new(PacerConfig::default().extractor);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let first_start = OffsetDateTime::UNIX_EPOCH + Duration::days(19_800);

    let mut trail_count = 0;
    for i in 0..config.activity_count {
        let trail = rng.gen_bool(config.trail_fraction.clamp(0.0, 1.0));
        let (min, max) = config.distance_range_m;
        let generator = TelemetryGenerator::for_region(config.region, rng.r#gen())
            .with_distance(rng.gen_range(min..max))
            .with_pauses(0.002, 20.0, 90.0);
        let start = first_start + Duration::days(2 * i as i64) + Duration::hours(7);

        let profile: Box<dyn AthleteProfile> = if trail {
            trail_count += 1;
            Box::new(TrailRunnerProfile::default())
        } else {
            Box::new(RunnerProfile::with_pace(config.road_pace_min_per_km))
        };
        let samples = generator.generate(profile.as_ref(), start, &mut rng);
        let name = format!("activity_{:03}", i + 1);
        write_activity(
            &extractor,
            &activity_dir,
            &name,
            &samples,
            "running",
            profile.sub_sport(),
        )?;
    }

    let route = TelemetryGenerator::for_region(config.region, rng.r#gen())
        .with_distance(config.route_distance_m)
        .with_gps_jitter(0.0)
        .generate(
            &RunnerProfile::with_pace(config.road_pace_min_per_km),
            first_start,
            &mut rng,
        );
    let route_path = output_dir.join("route.gpx");
    write_gpx(&route_path, &route, "Synthetic route", GpxLayout::Route)?;

    tracing::info!("Seed completed!");
    tracing::info!(
        "  Activities: {} ({} trail) in {}",
        config.activity_count,
        trail_count,
        activity_dir.display()
    );
    tracing::info!("  Route: {}", route_path.display());

    Ok(())
}
