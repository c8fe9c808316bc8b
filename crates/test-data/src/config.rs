//! Configuration types for synthetic corpus generation.

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude (south)
    pub min_lat: f64,
    /// Minimum longitude (west)
    pub min_lon: f64,
    /// Maximum latitude (north)
    pub max_lat: f64,
    /// Maximum longitude (east)
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Pre-defined geographic regions.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Reno/Tahoe area - mountain trails with significant elevation changes.
    pub const RENO_TAHOE: BoundingBox = BoundingBox::new(39.0, -120.5, 39.6, -119.5);

    /// Boulder, CO area - foothills with varied terrain.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);
}

/// What the `seed` binary writes.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Number of historical activities.
    pub activity_count: usize,
    /// Fraction of activities recorded as trail runs.
    pub trail_fraction: f64,
    /// Flat pace of the road runs in minutes per kilometer.
    pub road_pace_min_per_km: f64,
    /// Activity distance range in meters.
    pub distance_range_m: (f64, f64),
    /// Distance of the route GPX in meters.
    pub route_distance_m: f64,
    pub region: BoundingBox,
    /// RNG seed; the same seed writes the same corpus.
    pub seed: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            activity_count: 30,
            trail_fraction: 0.3,
            road_pace_min_per_km: 4.75,
            distance_range_m: (3000.0, 15000.0),
            route_distance_m: 10000.0,
            region: Region::BOULDER,
            seed: 12345,
        }
    }
}
