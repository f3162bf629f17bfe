//! Sequential ability estimation
//!
//! A one-dimensional Kalman filter over a student's prior courses. The state
//! is the student's ability offset: how far above or below the course
//! average they tend to finish. Each prior course contributes one
//! measurement `z = grade_gpa - course_average`.
//!
//! Ability is treated as constant across courses (no process noise), so the
//! variance only shrinks and the final mean equals the precision-weighted
//! average of the prior and every measurement.
//!
//! The estimator is request-scoped. It holds personal data and is never
//! cached or logged.

use grade_core::{LetterGrade, PriorCourseObservation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Typical course average the overall GPA is compared against
pub const POPULATION_BASELINE_GPA: f64 = 3.3;
pub const DEFAULT_PRIOR_VARIANCE: f64 = 0.25;
/// Course-to-course grading variance
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 0.1;

/// How much each prior course is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseWeighting {
    /// Every course uses the base measurement noise
    #[default]
    Uniform,
    /// Courses whose average is far from the baseline get up to twice the noise
    Typicality,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityConfig {
    pub prior_variance: f64,
    pub measurement_noise: f64,
    pub population_baseline: f64,
    #[serde(default)]
    pub weighting: CourseWeighting,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            prior_variance: DEFAULT_PRIOR_VARIANCE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            population_baseline: POPULATION_BASELINE_GPA,
            weighting: CourseWeighting::Uniform,
        }
    }
}

impl AbilityConfig {
    /// Measurement noise for a course with the given historical average
    pub fn noise_for(&self, course_average: f64) -> f64 {
        let base = self.measurement_noise.max(0.0);
        match self.weighting {
            CourseWeighting::Uniform => base,
            CourseWeighting::Typicality => {
                let typicality =
                    (1.0 - (course_average - self.population_baseline).abs()).clamp(0.0, 1.0);
                let weight = 0.5 + 0.5 * typicality;
                base / weight
            }
        }
    }
}

/// Ability offset after folding in the resolvable observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityEstimate {
    pub mean: f64,
    pub variance: f64,
    pub observations: usize,
}

impl AbilityEstimate {
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// One update, kept for explaining how the estimate moved
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub measurement: f64,
    pub measurement_noise: f64,
    pub kalman_gain: f64,
    pub innovation: f64,
    pub state_after: f64,
    pub std_after: f64,
}

#[derive(Debug, Clone)]
pub struct AbilityEstimator {
    config: AbilityConfig,
    mean: f64,
    variance: f64,
    observations: usize,
    history: Vec<FilterStep>,
}

impl AbilityEstimator {
    /// Start from the self-reported overall GPA relative to the baseline,
    /// or from zero when no GPA is given.
    pub fn new(config: AbilityConfig, overall_gpa: Option<f64>) -> Self {
        let mean = overall_gpa
            .filter(|g| g.is_finite())
            .map(|g| g - config.population_baseline)
            .unwrap_or(0.0);

        Self {
            config,
            mean,
            variance: config.prior_variance.max(0.0),
            observations: 0,
            history: Vec::new(),
        }
    }

    /// Fold one measurement with the given noise variance.
    ///
    /// K = P / (P + R); x += K (z - x); P *= 1 - K
    pub fn update(&mut self, measurement: f64, measurement_noise: f64) {
        let noise = measurement_noise.max(0.0);
        let denom = self.variance + noise;
        let gain = if denom > 0.0 { self.variance / denom } else { 0.0 };

        let innovation = measurement - self.mean;
        self.mean += gain * innovation;
        self.variance *= 1.0 - gain;
        self.observations += 1;

        self.history.push(FilterStep {
            measurement,
            measurement_noise: noise,
            kalman_gain: gain,
            innovation,
            state_after: self.mean,
            std_after: self.variance.max(0.0).sqrt(),
        });
    }

    /// Fold a prior course whose historical average is known
    pub fn observe_course(&mut self, course_average: f64, grade: LetterGrade) {
        let measurement = grade.gpa() - course_average;
        let noise = self.config.noise_for(course_average);
        self.update(measurement, noise);
    }

    /// Fold observations in the order given. Courses the resolver cannot
    /// place are skipped. Returns how many were folded in.
    pub fn fold<'a, I, F>(&mut self, observations: I, resolve_average: F) -> usize
    where
        I: IntoIterator<Item = &'a PriorCourseObservation>,
        F: Fn(&str) -> Option<f64>,
    {
        let before = self.observations;
        let mut skipped = 0usize;
        for obs in observations {
            match resolve_average(&obs.course_name).filter(|avg| avg.is_finite()) {
                Some(average) => self.observe_course(average, obs.grade_received),
                None => skipped += 1,
            }
        }
        let folded = self.observations - before;
        debug!(folded, skipped, "Folded prior courses into ability estimate");
        folded
    }

    pub fn estimate(&self) -> AbilityEstimate {
        AbilityEstimate {
            mean: self.mean,
            variance: self.variance,
            observations: self.observations,
        }
    }

    pub fn history(&self) -> &[FilterStep] {
        &self.history
    }
}

/// Closed form of the filter: the precision-weighted average of the prior
/// and all `(measurement, noise)` pairs, with the combined variance.
///
/// A non-positive variance is exact. A certain prior never moves, and the
/// first exact measurement fixes the result, as it does in `update`.
pub fn precision_weighted_mean(
    prior_mean: f64,
    prior_variance: f64,
    measurements: &[(f64, f64)],
) -> (f64, f64) {
    if prior_variance <= 0.0 {
        return (prior_mean, 0.0);
    }
    let mut precision = 1.0 / prior_variance;
    let mut weighted = prior_mean / prior_variance;
    for &(z, r) in measurements {
        if r <= 0.0 {
            return (z, 0.0);
        }
        precision += 1.0 / r;
        weighted += z / r;
    }
    (weighted / precision, 1.0 / precision)
}
