//! Synthetic activity data for pacer.
//!
//! Generates seeded running telemetry over Perlin-noise terrain, writes it into an
//! activity-store directory the way `pacer ingest` would, and emits GPX routes to predict.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let samples = TelemetryGenerator::for_region(Region::BOULDER, 7)
//!     .with_distance(8000.0)
//!     .generate(&TrailRunnerProfile::default(), start, &mut rng);
//! write_activity(&extractor, "data/activities", "trail_01", &samples, "running", "trail")?;
//! ```

pub mod config;
pub mod gpx;
pub mod profiles;
pub mod store;
pub mod telemetry;
pub mod terrain;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{BoundingBox, Region, SeedConfig};
    pub use crate::gpx::{GpxLayout, generate_gpx, write_gpx};
    pub use crate::profiles::{
        AthleteProfile, RunnerProfile, TrailRunnerProfile, sample_variance, speed_at_grade,
    };
    pub use crate::store::{samples_to_table, write_activity};
    pub use crate::telemetry::{TelemetryConfig, TelemetryGenerator, TelemetrySample};
    pub use crate::terrain::ElevationGenerator;
    pub use rand::{SeedableRng, rngs::StdRng};
}
