//! GPX route parsing into a distance-annotated route table.

use std::{fs::File, io::BufReader, io::Read, path::Path};

use geo::Point;
use gpx::{Gpx, Waypoint, read};

use crate::{
    errors::{PacerError, Result},
    geodesic,
};

/// One GPS fix from a GPX file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    /// x = longitude, y = latitude, both in degrees.
    pub point: Point<f64>,
    /// Elevation in meters, when the source carries `<ele>`.
    pub elevation: Option<f64>,
}

impl RoutePoint {
    pub fn new(lat: f64, lon: f64, elevation: Option<f64>) -> Self {
        Self {
            point: Point::new(lon, lat),
            elevation,
        }
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }
}

impl From<&Waypoint> for RoutePoint {
    fn from(wpt: &Waypoint) -> Self {
        Self {
            point: wpt.point(),
            elevation: wpt.elevation,
        }
    }
}

/// Route points in document order with per-point and cumulative distance.
///
/// `cumulative_distance_m[i] == cumulative_distance_m[i - 1] + delta_distance_m[i]`,
/// and the first point always has a delta of 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    points: Vec<RoutePoint>,
    delta_distance_m: Vec<f64>,
    cumulative_distance_m: Vec<f64>,
}

impl RouteTable {
    pub fn from_points(points: Vec<RoutePoint>) -> Self {
        let mut delta_distance_m = Vec::with_capacity(points.len());
        let mut cumulative_distance_m = Vec::with_capacity(points.len());
        let mut total = 0.0;

        for (i, pt) in points.iter().enumerate() {
            let delta = if i == 0 {
                0.0
            } else {
                geodesic::distance_between(points[i - 1].point, pt.point)
            };
            total += delta;
            delta_distance_m.push(delta);
            cumulative_distance_m.push(total);
        }

        Self {
            points,
            delta_distance_m,
            cumulative_distance_m,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn delta_distance_m(&self) -> &[f64] {
        &self.delta_distance_m
    }

    pub fn cumulative_distance_m(&self) -> &[f64] {
        &self.cumulative_distance_m
    }
}

pub struct GpxProcessor;

impl GpxProcessor {
    /// Reads and parses a GPX file. The file handle is released before returning.
    pub fn load_file(path: impl AsRef<Path>) -> Result<RouteTable> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::parse(BufReader::new(file))?;
        tracing::debug!(
            "Parsed {} route points from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses GPX XML from any reader.
    ///
    /// Uses the first segment of the first track; when that holds no points, falls back to the
    /// first route's `<rtept>`s. A document with neither yields an empty table.
    pub fn parse<R: Read>(reader: R) -> Result<RouteTable> {
        let gpx: Gpx = read(reader)
            .map_err(|e| PacerError::GpxParsing(format!("Failed to parse GPX: {e}")))?;

        Ok(RouteTable::from_points(Self::select_points(&gpx)))
    }

    pub fn parse_str(content: &str) -> Result<RouteTable> {
        Self::parse(content.as_bytes())
    }

    fn select_points(gpx: &Gpx) -> Vec<RoutePoint> {
        let track_points: Vec<RoutePoint> = gpx
            .tracks
            .first()
            .and_then(|track| track.segments.first())
            .map(|seg| seg.points.iter().map(RoutePoint::from).collect())
            .unwrap_or_default();

        if !track_points.is_empty() {
            return track_points;
        }

        gpx.routes
            .first()
            .map(|route| route.points.iter().map(RoutePoint::from).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacer-tests" xmlns="http://www.topografix.com/GPX/1/1">"#;

    fn doc(body: &str) -> String {
        format!("{HEADER}\n{body}\n</gpx>")
    }

    #[test]
    fn test_three_point_track() {
        let gpx = doc(
            r#"<trk><trkseg>
                <trkpt lat="0" lon="0"><ele>100</ele></trkpt>
                <trkpt lat="0" lon="0.001"><ele>110</ele></trkpt>
                <trkpt lat="0" lon="0.002"><ele>105</ele></trkpt>
            </trkseg></trk>"#,
        );
        let table = GpxProcessor::parse_str(&gpx).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.delta_distance_m()[0], 0.0);
        assert_eq!(table.cumulative_distance_m()[0], 0.0);
        let step = geodesic::distance(0.0, 0.0, 0.0, 0.001);
        assert!((table.cumulative_distance_m()[2] - 2.0 * step).abs() < 1e-9);
        assert!((step - 111.19).abs() < 0.01);
        assert_eq!(
            table.points().iter().map(|p| p.elevation).collect::<Vec<_>>(),
            vec![Some(100.0), Some(110.0), Some(105.0)]
        );
    }

    #[test]
    fn test_only_first_track_and_segment_are_used() {
        let gpx = doc(
            r#"<trk>
                <trkseg><trkpt lat="1" lon="1"/><trkpt lat="1" lon="1.001"/></trkseg>
                <trkseg><trkpt lat="5" lon="5"/></trkseg>
            </trk>
            <trk><trkseg><trkpt lat="9" lon="9"/></trkseg></trk>"#,
        );
        let table = GpxProcessor::parse_str(&gpx).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.points()[1].lon(), 1.001);
    }

    #[test]
    fn test_route_points_fallback() {
        let gpx = doc(
            r#"<rte>
                <rtept lat="40.0" lon="-105.0"><ele>1650</ele></rtept>
                <rtept lat="40.001" lon="-105.0"/>
            </rte>"#,
        );
        let table = GpxProcessor::parse_str(&gpx).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.points()[0].lat(), 40.0);
        assert_eq!(table.points()[0].elevation, Some(1650.0));
        assert_eq!(table.points()[1].elevation, None);
    }

    #[test]
    fn test_empty_document_yields_empty_table() {
        let table = GpxProcessor::parse_str(&doc("")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_latitude_is_malformed() {
        let gpx = doc(r#"<trk><trkseg><trkpt lon="0"><ele>1</ele></trkpt></trkseg></trk>"#);
        let err = GpxProcessor::parse_str(&gpx).unwrap_err();
        assert!(err.is_malformed(), "got: {err}");
    }

    #[test]
    fn test_cumulative_distance_is_monotone() {
        let points = (0..20)
            .map(|i| RoutePoint::new(40.0 + (i % 3) as f64 * 0.0003, -105.0 + i as f64 * 0.0002, None))
            .collect();
        let table = RouteTable::from_points(points);

        for w in table.cumulative_distance_m().windows(2) {
            assert!(w[1] >= w[0]);
        }
        for (i, delta) in table.delta_distance_m().iter().enumerate().skip(1) {
            let expected = table.cumulative_distance_m()[i - 1] + delta;
            assert_eq!(table.cumulative_distance_m()[i], expected);
        }
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.gpx");
        std::fs::write(
            &path,
            doc(r#"<trk><trkseg><trkpt lat="0" lon="0"/><trkpt lat="0.001" lon="0"/></trkseg></trk>"#),
        )
        .unwrap();

        let table = GpxProcessor::load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(GpxProcessor::load_file(dir.path().join("missing.gpx")).is_err());
    }
}
