pub mod activity_store;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod errors;
pub mod features;
pub mod file_parsers;
pub mod geodesic;
pub mod gpx_processor;
pub mod matrix;
pub mod pace;
pub mod predict;
pub mod regression;
pub mod route_summary;
pub mod table;
pub mod training;

pub use artifact::ModelArtifact;
pub use config::{PacerConfig, UnitSystem};
pub use errors::{PacerError, Result};
pub use features::{ActivitySummary, FeatureExtractor};
pub use gpx_processor::{GpxProcessor, RoutePoint, RouteTable};
pub use matrix::{Feature, FeatureMatrix};
pub use predict::{format_hms, predict_elapsed_seconds};
pub use route_summary::{RouteSummarizer, RouteSummary};
pub use table::Table;
