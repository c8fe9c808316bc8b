//! Terrain generation.

mod elevation;

pub use elevation::{ElevationGenerator, add_elevation_jitter};
