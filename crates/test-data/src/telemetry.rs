//! Procedural activity telemetry.

use std::f64::consts::{PI, TAU};

use pacer::geodesic;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::{Duration, OffsetDateTime};

use crate::{
    config::{BoundingBox, Region},
    profiles::{self, AthleteProfile},
    terrain::{ElevationGenerator, add_elevation_jitter},
};

/// One recorded sample, as a watch would log it once per step.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub timestamp: OffsetDateTime,
    pub lat: f64,
    pub lon: f64,
    /// Meters.
    pub altitude: f64,
    /// Cumulative meters along the recorded positions.
    pub distance: f64,
    pub heart_rate: f64,
    /// Strides per minute (one foot), as FIT records it.
    pub cadence: f64,
    /// Watts.
    pub power: f64,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Target distance in meters.
    pub distance_meters: f64,
    /// Starting point (lat, lon); random within `bounds` when unset.
    pub start_point: Option<(f64, f64)>,
    pub bounds: BoundingBox,
    /// Position noise standard deviation in meters.
    pub gps_jitter_m: f64,
    /// Altitude noise standard deviation in meters.
    pub elevation_jitter_m: f64,
    /// Approximate distance between samples in meters.
    pub point_spacing_m: f64,
    /// Probability of a pause at each sample.
    pub pause_probability: f64,
    /// Pause duration range in seconds.
    pub pause_duration_range: (f64, f64),
    /// Runner mass in kilograms, for the power estimate.
    pub mass_kg: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            distance_meters: 5000.0,
            start_point: None,
            bounds: Region::BOULDER,
            gps_jitter_m: 1.0,
            elevation_jitter_m: 0.3,
            point_spacing_m: 10.0,
            pause_probability: 0.0,
            pause_duration_range: (30.0, 120.0),
            mass_kg: 70.0,
        }
    }
}

/// Random-walk routes with grade-aware timing.
pub struct TelemetryGenerator {
    config: TelemetryConfig,
    elevation: ElevationGenerator,
}

impl TelemetryGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            config: TelemetryConfig::default(),
            elevation: ElevationGenerator::boulder(seed),
        }
    }

    pub fn for_region(bounds: BoundingBox, seed: u32) -> Self {
        let elevation = if bounds == Region::RENO_TAHOE {
            ElevationGenerator::reno_tahoe(seed)
        } else {
            ElevationGenerator::boulder(seed)
        };

        Self {
            config: TelemetryConfig {
                bounds,
                ..Default::default()
            },
            elevation,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.config.distance_meters = meters;
        self
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start_point = Some((lat, lon));
        self
    }

    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    pub fn with_elevation(mut self, elevation: ElevationGenerator) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_point_spacing(mut self, meters: f64) -> Self {
        self.config.point_spacing_m = meters;
        self
    }

    pub fn with_pauses(mut self, probability: f64, min_sec: f64, max_sec: f64) -> Self {
        self.config.pause_probability = probability;
        self.config.pause_duration_range = (min_sec, max_sec);
        self
    }

    /// Generates one activity starting at `start_time`.
    pub fn generate(
        &self,
        profile: &dyn AthleteProfile,
        start_time: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Vec<TelemetrySample> {
        let start = self
            .config
            .start_point
            .unwrap_or_else(|| self.config.bounds.random_point(rng));

        let path = self.generate_path(start, rng);
        self.apply_timing(&path, profile, start_time, rng)
    }

    /// Coordinates only: a random walk with heading momentum, bounced off the bounds.
    pub fn generate_path(&self, start: (f64, f64), rng: &mut impl Rng) -> Vec<(f64, f64)> {
        let mut path = vec![start];
        let mut current = start;
        let mut total_distance = 0.0;
        let mut heading = rng.gen_range(0.0..TAU);

        while total_distance < self.config.distance_meters {
            heading += rng.gen_range(-0.3..0.3);
            let step = self.config.point_spacing_m * rng.gen_range(0.8..1.2);

            // 1 degree of latitude is ~111 km; longitude shrinks with latitude
            let lat_delta = (step * heading.cos()) / 111_000.0;
            let lon_delta = (step * heading.sin()) / (111_000.0 * current.0.to_radians().cos());

            let (lat, lon, bounced) =
                self.apply_bounds(current.0 + lat_delta, current.1 + lon_delta, heading);
            heading = bounced;
            current = (lat, lon);
            path.push(current);
            total_distance += step;
        }

        path
    }

    fn apply_bounds(&self, lat: f64, lon: f64, heading: f64) -> (f64, f64, f64) {
        let b = &self.config.bounds;
        let mut new_heading = heading;

        let lat = if lat < b.min_lat {
            new_heading = PI - heading;
            b.min_lat + (b.min_lat - lat).min(0.001)
        } else if lat > b.max_lat {
            new_heading = PI - heading;
            b.max_lat - (lat - b.max_lat).min(0.001)
        } else {
            lat
        };

        let lon = if lon < b.min_lon {
            new_heading = -heading;
            b.min_lon + (b.min_lon - lon).min(0.001)
        } else if lon > b.max_lon {
            new_heading = -heading;
            b.max_lon - (lon - b.max_lon).min(0.001)
        } else {
            lon
        };

        (lat, lon, new_heading)
    }

    fn apply_timing(
        &self,
        path: &[(f64, f64)],
        profile: &dyn AthleteProfile,
        start_time: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Vec<TelemetrySample> {
        let Some(&(first_lat, first_lon)) = path.first() else {
            return Vec::new();
        };

        let jitter_deg = self.config.gps_jitter_m / 111_000.0;
        let jitter = Normal::new(0.0, jitter_deg).ok().filter(|_| jitter_deg > 0.0);

        let mut samples = Vec::with_capacity(path.len());
        let mut timestamp = start_time;
        let mut distance = 0.0;
        let mut prev_pos = jittered(first_lat, first_lon, jitter.as_ref(), rng);

        samples.push(self.sample(
            timestamp,
            prev_pos,
            self.elevation.elevation_at(first_lat, first_lon),
            0.0,
            0.0,
            profile.base_speed_mps(),
            rng,
        ));

        for window in path.windows(2) {
            let (prev_lat, prev_lon) = window[0];
            let (lat, lon) = window[1];

            let run = geodesic::distance(prev_lat, prev_lon, lat, lon);
            let prev_elev = self.elevation.elevation_at(prev_lat, prev_lon);
            let curr_elev = self.elevation.elevation_at(lat, lon);
            let grade = if run > 0.0 {
                (curr_elev - prev_elev) / run
            } else {
                0.0
            };

            let variance = profiles::sample_variance(profile, rng);
            let speed = profiles::speed_at_grade(profile, grade, variance);
            let pause_seconds = if rng.r#gen::<f64>() < self.config.pause_probability {
                let (min, max) = self.config.pause_duration_range;
                rng.gen_range(min..max.max(min + 1.0))
            } else {
                0.0
            };
            timestamp += Duration::seconds_f64(run / speed + pause_seconds);

            let pos = jittered(lat, lon, jitter.as_ref(), rng);
            distance += geodesic::distance(prev_pos.0, prev_pos.1, pos.0, pos.1);
            prev_pos = pos;

            samples.push(self.sample(timestamp, pos, curr_elev, distance, grade, speed, rng));
        }

        samples
    }

    #[allow(clippy::too_many_arguments)]
    fn sample(
        &self,
        timestamp: OffsetDateTime,
        (lat, lon): (f64, f64),
        elevation: f64,
        distance: f64,
        grade: f64,
        speed: f64,
        rng: &mut impl Rng,
    ) -> TelemetrySample {
        let effort = speed / 3.5 + grade * 4.0;
        let heart_rate = (125.0 + 30.0 * effort + rng.gen_range(-3.0..3.0)).clamp(95.0, 195.0);
        let cadence = (78.0 + 8.0 * (speed / 3.5).sqrt() + rng.gen_range(-1.5..1.5)).round();
        // ~1 W/kg per m/s on the flat
        let power = (self.config.mass_kg * speed * (1.0 + 4.0 * grade).max(0.3)).round();

        TelemetrySample {
            timestamp,
            lat,
            lon,
            altitude: add_elevation_jitter(elevation, rng, self.config.elevation_jitter_m),
            distance,
            heart_rate: heart_rate.round(),
            cadence,
            power,
        }
    }
}

fn jittered(
    lat: f64,
    lon: f64,
    jitter: Option<&Normal<f64>>,
    rng: &mut impl Rng,
) -> (f64, f64) {
    match jitter {
        Some(normal) => (lat + normal.sample(rng), lon + normal.sample(rng)),
        None => (lat, lon),
    }
}

/// Elapsed seconds between the first and last sample.
pub fn elapsed_seconds(samples: &[TelemetrySample]) -> f64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp).as_seconds_f64(),
        _ => 0.0,
    }
}
