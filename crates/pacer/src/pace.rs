//! Baseline average-speed models evaluated over the activity store.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use crate::{
    config::UnitSystem,
    features::{TelemetrySamples, columns as col},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaceModel {
    /// Distance span over elapsed span.
    AvgSpeedBasic,
    /// Mean of per-sample instantaneous speeds.
    AvgSpeedWeighted,
}

impl PaceModel {
    pub const ALL: [PaceModel; 2] = [PaceModel::AvgSpeedBasic, PaceModel::AvgSpeedWeighted];

    pub fn name(self) -> &'static str {
        match self {
            PaceModel::AvgSpeedBasic => "avg_speed_basic",
            PaceModel::AvgSpeedWeighted => "avg_speed_weighted",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PaceModel::AvgSpeedBasic => "distance delta / elapsed delta",
            PaceModel::AvgSpeedWeighted => "mean of per-sample instantaneous speeds",
        }
    }

    /// Average speed in m/s, or `None` when the activity gives no usable span.
    pub fn speed(self, distance: &[Option<f64>], elapsed_seconds: &[Option<f64>]) -> Option<f64> {
        match self {
            PaceModel::AvgSpeedBasic => avg_speed_basic(distance, elapsed_seconds),
            PaceModel::AvgSpeedWeighted => avg_speed_weighted(distance, elapsed_seconds),
        }
    }
}

impl fmt::Display for PaceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn complete_pairs(distance: &[Option<f64>], elapsed: &[Option<f64>]) -> Vec<(f64, f64)> {
    distance
        .iter()
        .zip(elapsed)
        .filter_map(|(d, t)| Some(((*d)?, (*t)?)))
        .collect()
}

/// `(last - first distance) / (last - first elapsed)` over samples carrying both values.
pub fn avg_speed_basic(distance: &[Option<f64>], elapsed_seconds: &[Option<f64>]) -> Option<f64> {
    let pairs = complete_pairs(distance, elapsed_seconds);
    let (first, last) = match pairs.as_slice() {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let total_distance = last.0 - first.0;
    let total_time = last.1 - first.1;
    if total_time <= 0.0 || total_distance < 0.0 {
        return None;
    }
    Some(total_distance / total_time)
}

/// Mean of `Δd / Δt` over consecutive samples with `Δt > 0` and `Δd ≥ 0`.
pub fn avg_speed_weighted(distance: &[Option<f64>], elapsed_seconds: &[Option<f64>]) -> Option<f64> {
    let speeds: Vec<f64> = distance
        .windows(2)
        .zip(elapsed_seconds.windows(2))
        .filter_map(|(d, t)| {
            let dd = d[1]? - d[0]?;
            let dt = t[1]? - t[0]?;
            (dt > 0.0 && dd >= 0.0).then_some(dd / dt)
        })
        .collect();

    if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    }
}

/// Speed of one activity under `model`; `None` if the table lacks distance or time.
pub fn activity_speed(model: PaceModel, table: &Table) -> Option<f64> {
    if table.require(&[col::DISTANCE]).is_err()
        || !(table.has_column(col::ELAPSED_SECONDS) || table.has_column(col::TIMESTAMP))
    {
        return None;
    }
    let distance = table.floats(col::DISTANCE)?;
    let elapsed = match table.floats(col::ELAPSED_SECONDS) {
        Some(elapsed) => elapsed,
        None => TelemetrySamples::from_table(table).ok()?.elapsed_seconds,
    };
    model.speed(&distance, &elapsed)
}

/// Mean positive speed (m/s) per model across `activities`.
///
/// A model with no usable activity is logged and left out of the result.
pub fn evaluate_pace_models(activities: &[(PathBuf, Table)]) -> BTreeMap<PaceModel, f64> {
    let mut results = BTreeMap::new();
    if activities.is_empty() {
        tracing::warn!("No activities to evaluate pace models against");
        return results;
    }

    for model in PaceModel::ALL {
        let speeds: Vec<f64> = activities
            .iter()
            .filter_map(|(_, table)| activity_speed(model, table))
            .filter(|s| s.is_finite() && *s > 0.0)
            .collect();

        if speeds.is_empty() {
            tracing::warn!("Model {} had no usable activities", model);
            continue;
        }
        results.insert(model, speeds.iter().sum::<f64>() / speeds.len() as f64);
    }

    results
}

/// A pace model's baseline speed applied to a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacePrediction {
    pub model: PaceModel,
    pub speed_mps: f64,
    /// Seconds per kilometer or per mile, following the unit system.
    pub pace_seconds_per_unit: f64,
    pub eta_seconds: f64,
}

impl PacePrediction {
    pub fn new(model: PaceModel, speed_mps: f64, route_distance_m: f64, units: UnitSystem) -> Self {
        let unit_m = match units {
            UnitSystem::Metric => 1000.0,
            UnitSystem::Imperial => 1.0 / crate::config::M_TO_MI_MULTIPLIER,
        };
        let (pace, eta) = if speed_mps > 0.0 {
            (unit_m / speed_mps, route_distance_m / speed_mps)
        } else {
            (f64::NAN, f64::INFINITY)
        };

        Self {
            model,
            speed_mps,
            pace_seconds_per_unit: pace,
            eta_seconds: eta,
        }
    }

    /// km/h or mph.
    pub fn speed_in(&self, units: UnitSystem) -> f64 {
        match units {
            UnitSystem::Metric => self.speed_mps * 3.6,
            UnitSystem::Imperial => self.speed_mps * crate::config::MPS_TO_MPH_MULTIPLIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_basic_speed() {
        let d = opt(&[0.0, 100.0, 250.0, 300.0]);
        let t = opt(&[0.0, 30.0, 60.0, 100.0]);
        assert_eq!(avg_speed_basic(&d, &t), Some(3.0));

        assert_eq!(avg_speed_basic(&opt(&[5.0]), &opt(&[1.0])), None);
        assert_eq!(avg_speed_basic(&opt(&[0.0, 10.0]), &opt(&[5.0, 5.0])), None);
        assert_eq!(avg_speed_basic(&opt(&[10.0, 0.0]), &opt(&[0.0, 5.0])), None);
    }

    #[test]
    fn test_basic_speed_ignores_incomplete_ends() {
        let d = vec![None, Some(0.0), Some(100.0), Some(200.0)];
        let t = vec![Some(0.0), Some(10.0), Some(30.0), None];
        assert_eq!(avg_speed_basic(&d, &t), Some(5.0));
    }

    #[test]
    fn test_weighted_speed_skips_bad_steps() {
        let d = opt(&[0.0, 10.0, 10.0, 5.0, 35.0]);
        let t = opt(&[0.0, 5.0, 5.0, 10.0, 20.0]);
        // steps: 10/5 = 2, dt = 0 skipped, dd < 0 skipped, 30/10 = 3
        assert_eq!(avg_speed_weighted(&d, &t), Some(2.5));
        assert_eq!(avg_speed_weighted(&opt(&[0.0]), &opt(&[0.0])), None);
    }

    #[test]
    fn test_evaluate_pace_models() {
        let fast = Table::from_reader(
            "distance,elapsed_seconds\n0,0\n400,100\n800,200\n".as_bytes(),
        )
        .unwrap();
        let slow = Table::from_reader(
            "timestamp,distance\n2024-05-01T10:00:00Z,0\n2024-05-01T10:01:40Z,200\n".as_bytes(),
        )
        .unwrap();
        let useless = Table::from_reader("heart_rate\n140\n".as_bytes()).unwrap();

        let activities = vec![
            (PathBuf::from("fast.csv"), fast),
            (PathBuf::from("slow.csv"), slow),
            (PathBuf::from("useless.csv"), useless),
        ];
        let results = evaluate_pace_models(&activities);

        assert_eq!(results.len(), 2);
        assert!((results[&PaceModel::AvgSpeedBasic] - 3.0).abs() < 1e-12);
        assert!((results[&PaceModel::AvgSpeedWeighted] - 3.0).abs() < 1e-12);
        assert!(evaluate_pace_models(&[]).is_empty());
    }

    #[test]
    fn test_pace_prediction() {
        let p = PacePrediction::new(PaceModel::AvgSpeedBasic, 2.5, 10_000.0, UnitSystem::Metric);
        assert_eq!(p.eta_seconds, 4000.0);
        assert_eq!(p.pace_seconds_per_unit, 400.0);
        assert!((p.speed_in(UnitSystem::Metric) - 9.0).abs() < 1e-12);

        let stalled = PacePrediction::new(PaceModel::AvgSpeedBasic, 0.0, 10_000.0, UnitSystem::Metric);
        assert!(stalled.eta_seconds.is_infinite());
    }
}
