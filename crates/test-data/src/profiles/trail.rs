//! Trail runner profile.

use super::AthleteProfile;

/// Trail running on technical singletrack.
///
/// Slower on the flat than road running and hit harder by climbs; descents are limited by
/// footing rather than fitness.
#[derive(Debug, Clone)]
pub struct TrailRunnerProfile {
    base_speed: f64,
    variance: f64,
}

impl Default for TrailRunnerProfile {
    fn default() -> Self {
        Self {
            base_speed: 2.9, // ~5:45/km
            variance: 0.08,
        }
    }
}

impl TrailRunnerProfile {
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    /// Mountain ultra pace.
    pub fn ultra() -> Self {
        Self {
            base_speed: 2.3,
            variance: 0.12,
        }
    }
}

impl AthleteProfile for TrailRunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            // power-hiking floor on steep climbs
            (1.0 - grade * 18.0).max(0.25)
        } else {
            (1.0 - grade * 4.0).min(1.25)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn sub_sport(&self) -> &'static str {
        "trail"
    }
}
