//! Small heuristic shifts applied on top of the ability estimate, and the
//! rule for combining course and student uncertainty.

use grade_core::UserContext;

/// Bound on the GPA shift derived from free-text notes
pub const MAX_CONTEXT_ADJUSTMENT: f64 = 0.2;

/// Narrowest std a personalized prediction reports
pub const MIN_PERSONALIZED_STD: f64 = 0.12;

const WORKLOAD_STEP: f64 = 0.05;
const HEAVY_LOAD_RATIO: f64 = 1.0;
const LIGHT_LOAD_RATIO: f64 = 0.6;
const COMFORT_STEP: f64 = 0.025;
const NEUTRAL_COMFORT: f64 = 3.0;

/// Workload and comfort shift, in GPA points.
///
/// More than one unit per available weekly hour costs 0.05; fewer than 0.6
/// gains 0.05. Both figures must be present. Comfort 1..=5 maps linearly to
/// -0.05..=+0.05.
pub fn lifestyle_adjustment(context: &UserContext) -> f64 {
    let mut shift = 0.0;

    if let (Some(units), Some(hours)) = (context.units_this_semester, context.hours_per_week_available) {
        let ratio = f64::from(units) / f64::from(hours.max(1));
        if ratio > HEAVY_LOAD_RATIO {
            shift -= WORKLOAD_STEP;
        } else if ratio < LIGHT_LOAD_RATIO {
            shift += WORKLOAD_STEP;
        }
    }

    if let Some(comfort) = context.comfort_level {
        shift += (f64::from(comfort) - NEUTRAL_COMFORT) * COMFORT_STEP;
    }

    shift
}

/// Clamp a notes-derived shift to ±[`MAX_CONTEXT_ADJUSTMENT`]. NaN reads as 0.
pub fn clamp_context_adjustment(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-MAX_CONTEXT_ADJUSTMENT, MAX_CONTEXT_ADJUSTMENT)
}

/// Treat the course model error and the ability estimate as independent.
pub fn combine_uncertainty(base_std: f64, ability_variance: f64) -> f64 {
    let variance = base_std.powi(2) + ability_variance.max(0.0);
    variance.sqrt().max(MIN_PERSONALIZED_STD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn context(units: Option<u32>, hours: Option<u32>, comfort: Option<u8>) -> UserContext {
        UserContext {
            units_this_semester: units,
            hours_per_week_available: hours,
            comfort_level: comfort,
            ..Default::default()
        }
    }

    #[test]
    fn test_workload_ratio_thresholds() {
        assert_relative_eq!(lifestyle_adjustment(&context(Some(20), Some(15), None)), -0.05);
        assert_relative_eq!(lifestyle_adjustment(&context(Some(12), Some(30), None)), 0.05);
        // 0.8 units per hour is neither heavy nor light
        assert_eq!(lifestyle_adjustment(&context(Some(16), Some(20), None)), 0.0);
        // Exactly 1.0 is not heavy
        assert_eq!(lifestyle_adjustment(&context(Some(15), Some(15), None)), 0.0);
        // Only one of the two figures: no shift
        assert_eq!(lifestyle_adjustment(&context(Some(20), None, None)), 0.0);
        // Zero hours counts as one hour
        assert_relative_eq!(lifestyle_adjustment(&context(Some(4), Some(0), None)), -0.05);
    }

    #[test]
    fn test_comfort_scales_linearly() {
        assert_relative_eq!(lifestyle_adjustment(&context(None, None, Some(1))), -0.05);
        assert_eq!(lifestyle_adjustment(&context(None, None, Some(3))), 0.0);
        assert_relative_eq!(lifestyle_adjustment(&context(None, None, Some(5))), 0.05);
        assert_relative_eq!(
            lifestyle_adjustment(&context(Some(12), Some(30), Some(4))),
            0.075,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_context_adjustment_is_bounded() {
        assert_eq!(clamp_context_adjustment(0.5), 0.2);
        assert_eq!(clamp_context_adjustment(-0.9), -0.2);
        assert_eq!(clamp_context_adjustment(0.07), 0.07);
        assert_eq!(clamp_context_adjustment(f64::NAN), 0.0);
    }

    #[test]
    fn test_combined_uncertainty() {
        assert_relative_eq!(combine_uncertainty(0.3, 0.16), 0.5, epsilon = 1e-12);
        assert_eq!(combine_uncertainty(0.0, 0.0), MIN_PERSONALIZED_STD);
        assert_eq!(combine_uncertainty(0.05, 0.001), MIN_PERSONALIZED_STD);
    }
}
