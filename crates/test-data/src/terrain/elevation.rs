//! Perlin noise elevation fields.

use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Elevation as a function of position, built from fractal Brownian motion over Perlin noise.
///
/// Frequencies are in cycles per meter so the relief of a 5 km route does not depend on
/// where on the globe it is generated.
#[derive(Debug, Clone)]
pub struct ElevationGenerator {
    perlin: Perlin,
    /// Mean elevation in meters.
    base_elevation: f64,
    /// Maximum deviation from the base, in meters.
    height_scale: f64,
    /// Cycles per meter of the first octave.
    frequency: f64,
    octaves: u32,
}

impl ElevationGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 1500.0,
            height_scale: 150.0,
            frequency: 1.0 / 3000.0,
            octaves: 4,
        }
    }

    /// Sierra Nevada terrain: high base, big climbs.
    pub fn reno_tahoe(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 1900.0,
            height_scale: 300.0,
            frequency: 1.0 / 4000.0,
            octaves: 5,
        }
    }

    /// Front Range foothills.
    pub fn boulder(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 1650.0,
            height_scale: 120.0,
            frequency: 1.0 / 3000.0,
            octaves: 4,
        }
    }

    /// Rolling hills.
    pub fn flat(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 300.0,
            height_scale: 15.0,
            frequency: 1.0 / 2000.0,
            octaves: 2,
        }
    }

    pub fn with_base_elevation(mut self, elevation: f64) -> Self {
        self.base_elevation = elevation;
        self
    }

    pub fn with_height_scale(mut self, scale: f64) -> Self {
        self.height_scale = scale;
        self
    }

    pub fn with_frequency(mut self, cycles_per_meter: f64) -> Self {
        self.frequency = cycles_per_meter;
        self
    }

    pub fn base_elevation(&self) -> f64 {
        self.base_elevation
    }

    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }

    /// Elevation in meters at a lat/lon coordinate.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        let y = lat * METERS_PER_DEGREE;
        let x = lon * METERS_PER_DEGREE * lat.to_radians().cos();

        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_amplitude = 0.0;

        for _ in 0..self.octaves {
            total += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let normalized = (total / max_amplitude).clamp(-1.0, 1.0);
        self.base_elevation + normalized * self.height_scale
    }

    pub fn elevation_profile(&self, coords: &[(f64, f64)]) -> Vec<f64> {
        coords
            .iter()
            .map(|(lat, lon)| self.elevation_at(*lat, *lon))
            .collect()
    }
}

/// Adds barometric/GPS noise to an elevation reading.
pub fn add_elevation_jitter(elevation: f64, rng: &mut impl Rng, std_dev: f64) -> f64 {
    match Normal::new(0.0, std_dev) {
        Ok(normal) if std_dev > 0.0 => elevation + normal.sample(rng),
        _ => elevation,
    }
}
