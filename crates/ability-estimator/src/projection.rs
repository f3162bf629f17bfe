//! Grade Distribution Projector
//!
//! Spreads a Gaussian GPA estimate over letter grades. Category boundaries
//! sit halfway between adjacent grade points. A+ and A share 4.0 grade
//! points, so they are reported as a single `A` category.

use std::collections::BTreeMap;

use grade_core::{CoreResult, LetterGrade, PredictionError, GPA_MAX, GPA_MIN};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Narrowest spread the projector will report
pub const MIN_PROJECTION_STD: f64 = 0.15;

/// Categories in descending order
pub const PROJECTION_GRADES: [LetterGrade; 10] = [
    LetterGrade::A,
    LetterGrade::AMinus,
    LetterGrade::BPlus,
    LetterGrade::B,
    LetterGrade::BMinus,
    LetterGrade::CPlus,
    LetterGrade::C,
    LetterGrade::CMinus,
    LetterGrade::D,
    LetterGrade::F,
];

/// Lower edge of each category except F, aligned with `PROJECTION_GRADES`
const LOWER_BOUNDS: [f64; 9] = [3.85, 3.5, 3.15, 2.85, 2.5, 2.15, 1.85, 1.35, 0.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum APlusPolicy {
    #[default]
    CollapsedIntoA,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeProbabilityDistribution {
    pub probabilities: BTreeMap<LetterGrade, f64>,
    /// Mean after clamping
    pub mean: f64,
    /// Std after flooring
    pub std: f64,
    pub a_plus_policy: APlusPolicy,
}

impl GradeProbabilityDistribution {
    pub fn probability(&self, grade: LetterGrade) -> f64 {
        let grade = if grade == LetterGrade::APlus {
            LetterGrade::A
        } else {
            grade
        };
        self.probabilities.get(&grade).copied().unwrap_or(0.0)
    }

    /// Most probable category. Ties go to the higher grade.
    pub fn most_likely(&self) -> Option<LetterGrade> {
        PROJECTION_GRADES
            .iter()
            .copied()
            .fold(None, |best: Option<(LetterGrade, f64)>, g| {
                let p = self.probability(g);
                match best {
                    Some((_, bp)) if bp >= p => best,
                    _ => Some((g, p)),
                }
            })
            .map(|(g, _)| g)
    }

    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }
}

/// Project `Normal(mean, std)` onto the ten grade categories.
///
/// The mean is clamped into [0, 4] and the std floored at
/// [`MIN_PROJECTION_STD`]. Non-finite inputs are rejected.
pub fn project(mean: f64, std: f64) -> CoreResult<GradeProbabilityDistribution> {
    if !mean.is_finite() || !std.is_finite() {
        return Err(PredictionError::InvalidInput(format!(
            "projection needs finite mean and std, got mean={mean} std={std}"
        )));
    }

    let mean = mean.clamp(GPA_MIN, GPA_MAX);
    let std = std.max(MIN_PROJECTION_STD);
    let normal = Normal::new(mean, std)
        .map_err(|e| PredictionError::InvalidInput(format!("invalid normal: {e}")))?;

    // Upper edge of category i is the lower edge of category i - 1
    let mut raw = [0.0_f64; PROJECTION_GRADES.len()];
    for (i, slot) in raw.iter_mut().enumerate() {
        let upper = if i == 0 { 1.0 } else { normal.cdf(LOWER_BOUNDS[i - 1]) };
        let lower = if i < LOWER_BOUNDS.len() {
            normal.cdf(LOWER_BOUNDS[i])
        } else {
            0.0
        };
        *slot = (upper - lower).max(0.0);
    }

    let total: f64 = raw.iter().sum();
    let probabilities = PROJECTION_GRADES
        .iter()
        .zip(raw)
        .map(|(g, p)| (*g, if total > 0.0 { p / total } else { 0.0 }))
        .collect();

    Ok(GradeProbabilityDistribution {
        probabilities,
        mean,
        std,
        a_plus_policy: APlusPolicy::CollapsedIntoA,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_probabilities_sum_to_one_and_stay_in_range() {
        for mean in [-2.0, 0.0, 0.4, 1.7, 2.6, 3.2, 3.9, 4.0, 6.0] {
            for std in [0.0, 0.05, 0.15, 0.3, 1.0, 5.0] {
                let dist = project(mean, std).unwrap();
                assert_relative_eq!(dist.total(), 1.0, epsilon = 1e-9);
                assert_eq!(dist.probabilities.len(), 10);
                for p in dist.probabilities.values() {
                    assert!((0.0..=1.0).contains(p), "mean={mean} std={std} p={p}");
                }
            }
        }
    }

    #[test]
    fn test_mass_concentrates_near_mean() {
        let dist = project(3.0, 0.15).unwrap();
        assert_eq!(dist.most_likely(), Some(LetterGrade::B));
        // (2.85, 3.15) is exactly one std either side
        assert_relative_eq!(dist.probability(LetterGrade::B), 0.6827, epsilon = 1e-3);
        assert!(dist.probability(LetterGrade::F) < 1e-9);
    }

    #[test]
    fn test_mean_and_std_are_sanitized() {
        let dist = project(5.2, 0.01).unwrap();
        assert_eq!(dist.mean, 4.0);
        assert_eq!(dist.std, MIN_PROJECTION_STD);
        assert_eq!(dist.most_likely(), Some(LetterGrade::A));
    }

    #[test]
    fn test_a_plus_is_reported_as_a() {
        let dist = project(3.95, 0.2).unwrap();
        assert!(!dist.probabilities.contains_key(&LetterGrade::APlus));
        assert_eq!(
            dist.probability(LetterGrade::APlus),
            dist.probability(LetterGrade::A)
        );
        assert_eq!(dist.a_plus_policy, APlusPolicy::CollapsedIntoA);

        let json = serde_json::to_value(&dist).unwrap();
        assert_eq!(json["a_plus_policy"], "collapsed_into_a");
        assert!(json["probabilities"].get("A-").is_some());
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        assert!(matches!(
            project(f64::NAN, 0.3),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            project(3.0, f64::INFINITY),
            Err(PredictionError::InvalidInput(_))
        ));
    }
}
