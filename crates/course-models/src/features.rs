//! Feature Vector Builder
//!
//! Turns a course's grade distribution and (optional) grading structure into
//! the numeric features the population models consume.

use grade_core::{Course, CoreResult, GradeDistribution, GradingStructure, PredictionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature names as they appear in model artifacts
pub mod names {
    pub const GRADE_ENTROPY: &str = "grade_entropy";
    pub const GRADE_SKEWNESS: &str = "grade_skewness";
    pub const PCT_A_RANGE: &str = "pct_a_range";
    pub const PCT_PASSING: &str = "pct_passing";
    pub const IS_UPPER_DIV: &str = "is_upper_div";
    pub const EXAM_HEAVY: &str = "exam_heavy";
    pub const PROJECT_HEAVY: &str = "project_heavy";
    pub const HAS_PROJECTS: &str = "has_projects";
    pub const IS_THEORY_COURSE: &str = "is_theory_course";
    pub const TOTAL_ASSESSMENTS: &str = "total_assessments";
    pub const PCT_EXAMS: &str = "pct_exams";
    pub const PCT_PROJECTS: &str = "pct_projects";
    pub const PCT_HOMEWORK: &str = "pct_homework";
}

const EXAM_HEAVY_PCT: f64 = 60.0;
const PROJECT_HEAVY_PCT: f64 = 25.0;

/// Which records the vector was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Grade distribution only (every course)
    GradeDistribution,
    /// Grade distribution plus grading structure
    Full,
}

/// Features derived from a grading structure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralFeatures {
    pub exam_heavy: bool,
    pub project_heavy: bool,
    pub has_projects: bool,
    pub is_theory_course: bool,
    pub total_assessments: u32,
    pub pct_exams: f64,
    pub pct_projects: f64,
    pub pct_homework: f64,
}

impl StructuralFeatures {
    pub fn from_structure(structure: &GradingStructure) -> Self {
        let pct_exams = structure.pct_exams.unwrap_or(0.0);
        let pct_projects = structure.pct_projects.unwrap_or(0.0);
        let pct_homework = structure.pct_homework.unwrap_or(0.0);
        let num_projects = structure.num_projects.unwrap_or(0);

        let has_projects = pct_projects > 0.0 || num_projects > 0;
        let total_assessments = structure.num_exams.unwrap_or(0)
            + num_projects
            + structure.num_homeworks.unwrap_or(0);

        Self {
            exam_heavy: pct_exams > EXAM_HEAVY_PCT,
            project_heavy: pct_projects > PROJECT_HEAVY_PCT,
            has_projects,
            is_theory_course: !has_projects,
            total_assessments,
            pct_exams,
            pct_projects,
            pct_homework,
        }
    }
}

/// Numeric summary of a course used as model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub grade_entropy: f64,
    pub grade_skewness: f64,
    pub pct_a_range: f64,
    pub pct_passing: f64,
    pub is_upper_div: bool,
    pub structural: Option<StructuralFeatures>,
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl FeatureVector {
    /// Build the feature vector for a course.
    ///
    /// Fails with `MissingData` when there is no grade distribution or it
    /// holds no letter-grade mass. A missing grading structure only narrows
    /// the feature set.
    pub fn build(
        course: &Course,
        distribution: Option<&GradeDistribution>,
        structure: Option<&GradingStructure>,
    ) -> CoreResult<Self> {
        let distribution = distribution.ok_or_else(|| {
            PredictionError::MissingData(format!(
                "no grade distribution for {}",
                course.full_name()
            ))
        })?;

        let weights = distribution.letter_weights();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(PredictionError::MissingData(format!(
                "grade distribution for {} has no letter grades",
                course.full_name()
            )));
        }

        let probabilities: Vec<f64> = weights.iter().map(|(_, w)| w / total).collect();
        let gpa_weights: Vec<(f64, f64)> =
            weights.iter().map(|(g, w)| (g.gpa(), *w)).collect();

        let a_weight: f64 = weights
            .iter()
            .filter(|(g, _)| g.is_a_range())
            .map(|(_, w)| w)
            .sum();
        let passing_weight: f64 = weights
            .iter()
            .filter(|(g, _)| g.is_passing())
            .map(|(_, w)| w)
            .sum();

        Ok(Self {
            grade_entropy: shannon_entropy(&probabilities),
            grade_skewness: weighted_skewness(&gpa_weights),
            pct_a_range: a_weight / total * 100.0,
            pct_passing: passing_weight / total * 100.0,
            is_upper_div: course.level().is_upper_div(),
            structural: structure.map(StructuralFeatures::from_structure),
        })
    }

    pub fn feature_set(&self) -> FeatureSet {
        if self.structural.is_some() {
            FeatureSet::Full
        } else {
            FeatureSet::GradeDistribution
        }
    }

    /// Look up a feature by its artifact name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            names::GRADE_ENTROPY => self.grade_entropy,
            names::GRADE_SKEWNESS => self.grade_skewness,
            names::PCT_A_RANGE => self.pct_a_range,
            names::PCT_PASSING => self.pct_passing,
            names::IS_UPPER_DIV => flag(self.is_upper_div),
            _ => {
                let s = self.structural.as_ref()?;
                match name {
                    names::EXAM_HEAVY => flag(s.exam_heavy),
                    names::PROJECT_HEAVY => flag(s.project_heavy),
                    names::HAS_PROJECTS => flag(s.has_projects),
                    names::IS_THEORY_COURSE => flag(s.is_theory_course),
                    names::TOTAL_ASSESSMENTS => s.total_assessments as f64,
                    names::PCT_EXAMS => s.pct_exams,
                    names::PCT_PROJECTS => s.pct_projects,
                    names::PCT_HOMEWORK => s.pct_homework,
                    _ => return None,
                }
            }
        };
        Some(value)
    }

    /// Values for the given feature names, skipping unknown ones
    pub fn select(&self, feature_names: &[String]) -> BTreeMap<String, f64> {
        feature_names
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Shannon entropy in bits. Zero probabilities contribute nothing.
pub fn shannon_entropy(probabilities: &[f64]) -> f64 {
    let h: f64 = probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum();
    h.max(0.0)
}

/// Population skewness (third standardized moment) of weighted values.
/// A distribution with no spread has skewness 0.
pub fn weighted_skewness(values: &[(f64, f64)]) -> f64 {
    let total: f64 = values.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let mean = values.iter().map(|(x, w)| x * w).sum::<f64>() / total;
    let m2 = values
        .iter()
        .map(|(x, w)| w * (x - mean).powi(2))
        .sum::<f64>()
        / total;
    let m3 = values
        .iter()
        .map(|(x, w)| w * (x - mean).powi(3))
        .sum::<f64>()
        / total;

    if m2 <= 1e-12 {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_core::LetterGrade;

    fn course(number: &str) -> Course {
        Course {
            course_id: 1,
            subject: "COMPSCI".to_string(),
            number: number.to_string(),
            avg_gpa: Some(3.2),
            total_students: Some(400),
        }
    }

    #[test]
    fn test_single_grade_has_zero_entropy() {
        let dist = GradeDistribution::from_counts(&[("A", 120)]);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();

        assert_eq!(fv.grade_entropy, 0.0);
        assert_eq!(fv.pct_a_range, 100.0);
        assert_eq!(fv.pct_passing, 100.0);
        assert_eq!(fv.grade_skewness, 0.0);
        assert_eq!(fv.feature_set(), FeatureSet::GradeDistribution);
    }

    #[test]
    fn test_entropy_is_bounded_by_category_count() {
        let counts: Vec<(&str, u32)> = LetterGrade::ALL.iter().map(|g| (g.label(), 10)).collect();
        let dist = GradeDistribution::from_counts(&counts);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();

        let max = (LetterGrade::ALL.len() as f64).log2();
        assert!((fv.grade_entropy - max).abs() < 1e-9);

        let skewed = GradeDistribution::from_counts(&[("A", 90), ("B", 5), ("F", 5), ("C", 0)]);
        let fv = FeatureVector::build(&course("61A"), Some(&skewed), None).unwrap();
        assert!(fv.grade_entropy > 0.0 && fv.grade_entropy < max);
        assert!(fv.grade_entropy.is_finite());
    }

    #[test]
    fn test_two_equal_grades_give_one_bit() {
        let dist = GradeDistribution::from_counts(&[("A", 50), ("B", 50)]);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();
        assert!((fv.grade_entropy - 1.0).abs() < 1e-12);
        assert_eq!(fv.pct_a_range, 50.0);
    }

    #[test]
    fn test_low_tail_gives_negative_skew() {
        let dist = GradeDistribution::from_counts(&[("A", 80), ("B", 15), ("F", 5)]);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();
        assert!(fv.grade_skewness < 0.0);
    }

    #[test]
    fn test_pct_passing_excludes_d_grades() {
        let dist = GradeDistribution::from_counts(&[("B", 50), ("C-", 20), ("D", 20), ("F", 10)]);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();
        assert!((fv.pct_passing - 70.0).abs() < 1e-9);
        assert_eq!(fv.pct_a_range, 0.0);
    }

    #[test]
    fn test_pass_no_pass_marks_are_ignored() {
        let dist = GradeDistribution::from_counts(&[("A", 50), ("P", 400), ("NP", 30), ("B", 50)]);
        let fv = FeatureVector::build(&course("61A"), Some(&dist), None).unwrap();
        assert_eq!(fv.pct_a_range, 50.0);
    }

    #[test]
    fn test_missing_distribution_is_an_error() {
        let err = FeatureVector::build(&course("61A"), None, None).unwrap_err();
        assert!(matches!(err, PredictionError::MissingData(_)));

        let only_pass = GradeDistribution::from_counts(&[("P", 100)]);
        let err = FeatureVector::build(&course("61A"), Some(&only_pass), None).unwrap_err();
        assert!(matches!(err, PredictionError::MissingData(_)));
    }

    #[test]
    fn test_structural_flags() {
        let structure = GradingStructure {
            pct_exams: Some(65.0),
            pct_projects: Some(30.0),
            pct_homework: Some(5.0),
            num_exams: Some(3),
            num_projects: Some(2),
            num_homeworks: Some(10),
            ..Default::default()
        };
        let s = StructuralFeatures::from_structure(&structure);
        assert!(s.exam_heavy);
        assert!(s.project_heavy);
        assert!(s.has_projects);
        assert!(!s.is_theory_course);
        assert_eq!(s.total_assessments, 15);
    }

    #[test]
    fn test_projects_counted_without_percentage() {
        let structure = GradingStructure {
            pct_exams: Some(60.0),
            num_projects: Some(1),
            ..Default::default()
        };
        let s = StructuralFeatures::from_structure(&structure);
        assert!(!s.exam_heavy);
        assert!(!s.project_heavy);
        assert!(s.has_projects);
        assert!(!s.is_theory_course);

        let theory = StructuralFeatures::from_structure(&GradingStructure {
            pct_exams: Some(80.0),
            ..Default::default()
        });
        assert!(theory.is_theory_course);
    }

    #[test]
    fn test_feature_lookup_by_name() {
        let dist = GradeDistribution::from_counts(&[("A", 50), ("B", 50)]);
        let structure = GradingStructure {
            pct_exams: Some(70.0),
            ..Default::default()
        };

        let basic = FeatureVector::build(&course("170"), Some(&dist), None).unwrap();
        assert_eq!(basic.get(names::IS_UPPER_DIV), Some(1.0));
        assert_eq!(basic.get(names::PCT_EXAMS), None);
        assert_eq!(basic.get("not_a_feature"), None);

        let full = FeatureVector::build(&course("170"), Some(&dist), Some(&structure)).unwrap();
        assert_eq!(full.feature_set(), FeatureSet::Full);
        assert_eq!(full.get(names::PCT_EXAMS), Some(70.0));
        assert_eq!(full.get(names::EXAM_HEAVY), Some(1.0));
        assert_eq!(full.get(names::IS_THEORY_COURSE), Some(1.0));
    }
}
