//! Road runner profile.

use super::AthleteProfile;

/// Grade range the energy-cost curve is fitted over (±45%).
const MAX_GRADE: f64 = 0.45;

/// Metabolic cost of running on flat ground, in J/kg/m.
const FLAT_COST: f64 = 3.6;

/// Road running on paved or smooth surfaces.
///
/// Speed on a slope follows the energy cost of running at that grade: the runner holds a
/// constant metabolic effort, so speed scales with `FLAT_COST / cost(grade)`.
/// - Base pace: ~4:45/km (3.5 m/s)
/// - 5% climb: ~77% of flat speed
/// - Descents: up to 140% of flat speed, slowing again past about -30%
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    /// Flat-ground speed in m/s.
    base_speed: f64,
    /// Step-to-step variation (coefficient of variation).
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self {
            base_speed: 3.5,
            variance: 0.05,
        }
    }
}

impl RunnerProfile {
    /// Creates a road profile from a flat pace in minutes per kilometer (e.g. 5.0 for 5:00/km).
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        Self {
            base_speed: 1000.0 / (pace_min_per_km * 60.0),
            ..Default::default()
        }
    }

    /// Energy cost of running at `grade` in J/kg/m, with the grade clamped to the fitted range.
    pub fn energy_cost(grade: f64) -> f64 {
        let i = grade.clamp(-MAX_GRADE, MAX_GRADE);
        // quintic in the grade fraction, evaluated with Horner's rule
        ((((155.4 * i - 30.4) * i - 43.3) * i + 46.3) * i + 19.5) * i + FLAT_COST
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        (FLAT_COST / Self::energy_cost(grade)).clamp(0.2, 1.4)
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn sub_sport(&self) -> &'static str {
        "road"
    }
}
