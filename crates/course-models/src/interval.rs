//! Confidence Interval Calculator
//!
//! Builds a 95% interval around a point estimate from the model's mean
//! absolute error. This is a normal-error approximation scaled by MAE, not a
//! modelled residual distribution, so coverage is only approximate.

use grade_core::{GPA_MAX, GPA_MIN};
use serde::{Deserialize, Serialize};

/// Two-sided 95% z-score
pub const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Confidence level (0.95 for 95%)
    pub level: f64,
}

impl ConfidenceInterval {
    /// `[point - 1.96 * mae, point + 1.96 * mae]` clipped to the GPA range.
    ///
    /// The point is clamped into range first and a negative or non-finite
    /// MAE counts as zero, so `lower <= point <= upper` always holds.
    pub fn from_mae(point: f64, mae: f64) -> Self {
        let point = clamp_gpa(point);
        let mae = if mae.is_finite() { mae.max(0.0) } else { 0.0 };
        let margin = Z_95 * mae;

        Self {
            lower: (point - margin).max(GPA_MIN),
            upper: (point + margin).min(GPA_MAX),
            level: 0.95,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// Clamp a GPA estimate into [0, 4]. NaN maps to the lower bound.
pub fn clamp_gpa(value: f64) -> f64 {
    if value.is_nan() {
        return GPA_MIN;
    }
    value.clamp(GPA_MIN, GPA_MAX)
}
