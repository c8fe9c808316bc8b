//! Athletic performance profiles.
//!
//! Profiles give flat-ground speed and grade sensitivity for a kind of run; the telemetry
//! generator turns them into timestamps, heart rate and power.

mod runner;
mod trail;

pub use runner::RunnerProfile;
pub use trail::TrailRunnerProfile;

use rand_distr::{Distribution, Normal};

pub trait AthleteProfile: Send + Sync {
    /// Base speed on flat terrain in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Speed multiplier for a grade given as a fraction (0.05 = 5%).
    ///
    /// Below 1.0 uphill, above 1.0 downhill.
    fn grade_factor(&self, grade: f64) -> f64;

    /// Step-to-step speed variation as a coefficient of variation.
    fn variance(&self) -> f64;

    /// `sub_sport` label written to the activity store.
    fn sub_sport(&self) -> &'static str;
}

/// Speed for a grade after applying a sampled variance factor, floored at 0.5 m/s.
pub fn speed_at_grade(profile: &dyn AthleteProfile, grade: f64, variance_factor: f64) -> f64 {
    let target = profile.base_speed_mps() * profile.grade_factor(grade);
    (target * variance_factor).max(0.5)
}

/// Multiplier around 1.0 drawn from the profile's variance, clamped to [0.7, 1.4].
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    match Normal::new(1.0, profile.variance()) {
        Ok(normal) if profile.variance() > 0.0 => normal.sample(rng).clamp(0.7, 1.4),
        _ => 1.0,
    }
}
