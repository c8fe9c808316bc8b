//! Route totals: haversine distance and positive elevation gain, reported in metric or imperial units.

use serde::{Deserialize, Serialize};

use crate::{
    config::UnitSystem,
    errors::{PacerError, Result},
    gpx_processor::{RoutePoint, RouteTable},
};

/// Total distance and elevation gain of a route, in the summarizer's unit system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteSummary {
    pub total_distance: f64,
    pub total_elevation_gain: f64,
}

/// One row of a route table as seen by a metric accumulator.
#[derive(Debug, Clone, Copy)]
pub struct RouteRow<'a> {
    pub point: &'a RoutePoint,
    pub cumulative_distance_m: f64,
}

pub trait RouteMetric {
    type Score;
    fn next_point(&mut self, row: RouteRow<'_>);
    fn finish(&mut self) -> Self::Score;
}

/// Reduces a route table to a [`RouteSummary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteSummarizer {
    units: UnitSystem,
}

impl RouteSummarizer {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn summarize(&self, route: &RouteTable) -> Result<RouteSummary> {
        if route.is_empty() {
            return Err(PacerError::EmptyResult(
                "GPX contained no route points".to_string(),
            ));
        }

        let mut acc = Metrics::new(self.units);
        for (point, cumulative) in route.points().iter().zip(route.cumulative_distance_m()) {
            acc.next_point(RouteRow {
                point,
                cumulative_distance_m: *cumulative,
            });
        }

        Ok(acc.finish())
    }
}

#[derive(Debug, Clone)]
struct Metrics {
    distance: DistanceMetric,
    elevation_gain: ElevationGainMetric,
}

impl Metrics {
    fn new(units: UnitSystem) -> Self {
        Self {
            distance: DistanceMetric::new(units.distance_factor()),
            elevation_gain: ElevationGainMetric::new(units.elevation_factor()),
        }
    }
}

impl RouteMetric for Metrics {
    type Score = RouteSummary;

    fn next_point(&mut self, row: RouteRow<'_>) {
        self.distance.next_point(row);
        self.elevation_gain.next_point(row);
    }

    fn finish(&mut self) -> RouteSummary {
        RouteSummary {
            total_distance: self.distance.finish(),
            total_elevation_gain: self.elevation_gain.finish(),
        }
    }
}

/// Last point's cumulative distance, converted point by point.
#[derive(Debug, Clone)]
struct DistanceMetric {
    factor: f64,
    last_cumulative: f64,
}

impl DistanceMetric {
    fn new(factor: f64) -> Self {
        Self {
            factor,
            last_cumulative: 0.0,
        }
    }
}

impl RouteMetric for DistanceMetric {
    type Score = f64;

    fn next_point(&mut self, row: RouteRow<'_>) {
        self.last_cumulative = row.cumulative_distance_m * self.factor;
    }

    fn finish(&mut self) -> f64 {
        self.last_cumulative
    }
}

/// Sum of strictly positive elevation steps. Points without elevation are skipped, so the
/// next climb is measured from the last known elevation.
#[derive(Debug, Clone)]
struct ElevationGainMetric {
    factor: f64,
    total_gain: f64,
    last_elevation: Option<f64>,
}

impl ElevationGainMetric {
    fn new(factor: f64) -> Self {
        Self {
            factor,
            total_gain: 0.0,
            last_elevation: None,
        }
    }
}

impl RouteMetric for ElevationGainMetric {
    type Score = f64;

    fn next_point(&mut self, row: RouteRow<'_>) {
        if let Some(elevation) = row.point.elevation {
            let elevation = elevation * self.factor;
            if let Some(last_elev) = self.last_elevation {
                let gain = elevation - last_elev;
                if gain > 0.0 {
                    self.total_gain += gain;
                }
            }
            self.last_elevation = Some(elevation);
        }
    }

    fn finish(&mut self) -> f64 {
        self.total_gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesic;

    fn table(points: &[(f64, f64, Option<f64>)]) -> RouteTable {
        RouteTable::from_points(
            points
                .iter()
                .map(|&(lat, lon, ele)| RoutePoint::new(lat, lon, ele))
                .collect(),
        )
    }

    #[test]
    fn test_gain_ignores_descents() {
        let route = table(&[
            (0.0, 0.0, Some(100.0)),
            (0.0, 0.001, Some(90.0)),
            (0.0, 0.002, Some(120.0)),
        ]);
        let summary = RouteSummarizer::new(UnitSystem::Metric)
            .summarize(&route)
            .unwrap();
        assert!((summary.total_elevation_gain - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_point_scenario() {
        let route = table(&[
            (0.0, 0.0, Some(100.0)),
            (0.0, 0.001, Some(110.0)),
            (0.0, 0.002, Some(105.0)),
        ]);
        let summary = RouteSummarizer::default().summarize(&route).unwrap();

        let expected = geodesic::distance(0.0, 0.0, 0.0, 0.001)
            + geodesic::distance(0.0, 0.001, 0.0, 0.002);
        assert!((summary.total_distance - expected).abs() < 1e-9);
        assert!((summary.total_distance - 222.39).abs() < 0.01);
        assert!((summary.total_elevation_gain - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_imperial_conversion() {
        let route = table(&[(0.0, 0.0, Some(0.0)), (0.01, 0.0, Some(100.0))]);
        let metric = RouteSummarizer::new(UnitSystem::Metric)
            .summarize(&route)
            .unwrap();
        let imperial = RouteSummarizer::new(UnitSystem::Imperial)
            .summarize(&route)
            .unwrap();

        assert!((imperial.total_distance - metric.total_distance * 0.000621371).abs() < 1e-9);
        assert!((imperial.total_elevation_gain - 328.084).abs() < 1e-9);
    }

    #[test]
    fn test_missing_elevation_is_bridged() {
        let route = table(&[
            (0.0, 0.0, Some(100.0)),
            (0.0, 0.001, None),
            (0.0, 0.002, Some(104.0)),
        ]);
        let summary = RouteSummarizer::default().summarize(&route).unwrap();
        assert!((summary.total_elevation_gain - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_route_has_zero_gain() {
        let route = table(&[(1.0, 1.0, None), (1.0, 1.001, None)]);
        let summary = RouteSummarizer::default().summarize(&route).unwrap();
        assert_eq!(summary.total_elevation_gain, 0.0);
        assert!(summary.total_distance > 0.0);
    }

    #[test]
    fn test_empty_route_is_an_error() {
        let err = RouteSummarizer::default()
            .summarize(&RouteTable::default())
            .unwrap_err();
        assert!(matches!(err, PacerError::EmptyResult(_)));
    }
}
