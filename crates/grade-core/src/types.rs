use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PredictionError;

/// Valid grade-point range for every GPA value the engine produces.
pub const GPA_MIN: f64 = 0.0;
pub const GPA_MAX: f64 = 4.0;

/// Letter grade on the standard 4.0 scale.
///
/// D+ and D- appear in historical distributions, so they are part of the
/// scale even though students rarely report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    D,
    #[serde(rename = "D-")]
    DMinus,
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 13] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::AMinus,
        LetterGrade::BPlus,
        LetterGrade::B,
        LetterGrade::BMinus,
        LetterGrade::CPlus,
        LetterGrade::C,
        LetterGrade::CMinus,
        LetterGrade::DPlus,
        LetterGrade::D,
        LetterGrade::DMinus,
        LetterGrade::F,
    ];

    /// Grade points for this letter
    pub fn gpa(&self) -> f64 {
        match self {
            LetterGrade::APlus | LetterGrade::A => 4.0,
            LetterGrade::AMinus => 3.7,
            LetterGrade::BPlus => 3.3,
            LetterGrade::B => 3.0,
            LetterGrade::BMinus => 2.7,
            LetterGrade::CPlus => 2.3,
            LetterGrade::C => 2.0,
            LetterGrade::CMinus => 1.7,
            LetterGrade::DPlus => 1.3,
            LetterGrade::D => 1.0,
            LetterGrade::DMinus => 0.7,
            LetterGrade::F => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }

    /// Parse a transcript label. Returns `None` for non-letter marks (P, NP, S, U).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.iter().copied().find(|g| g.label() == label)
    }

    pub fn is_a_range(&self) -> bool {
        matches!(self, LetterGrade::APlus | LetterGrade::A | LetterGrade::AMinus)
    }

    /// C- or better
    pub fn is_passing(&self) -> bool {
        *self <= LetterGrade::CMinus
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower/upper division, derived from the numeric part of the course number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    LowerDiv,
    UpperDiv,
    Unknown,
}

impl CourseLevel {
    pub fn from_number(number: &str) -> Self {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.parse::<u32>() {
            Ok(n) if n < 100 => CourseLevel::LowerDiv,
            Ok(_) => CourseLevel::UpperDiv,
            Err(_) => CourseLevel::Unknown,
        }
    }

    pub fn is_upper_div(&self) -> bool {
        matches!(self, CourseLevel::UpperDiv)
    }
}

/// Catalog entry for a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub course_id: i64,
    pub subject: String,
    pub number: String,
    #[serde(default)]
    pub avg_gpa: Option<f64>,
    #[serde(default)]
    pub total_students: Option<i64>,
}

impl Course {
    /// "SUBJECT NUMBER", the name students use when listing prior courses
    pub fn full_name(&self) -> String {
        format!("{} {}", self.subject, self.number)
    }

    pub fn level(&self) -> CourseLevel {
        CourseLevel::from_number(&self.number)
    }
}

/// Course summary attached to every prediction response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub course_id: i64,
    pub subject: String,
    pub number: String,
    pub full_name: String,
}

impl From<&Course> for CourseInfo {
    fn from(course: &Course) -> Self {
        Self {
            course_id: course.course_id,
            subject: course.subject.clone(),
            number: course.number.clone(),
            full_name: course.full_name(),
        }
    }
}

/// One row of a historical grade distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeBucket {
    pub letter_grade: String,
    pub student_count: u32,
    #[serde(default)]
    pub percentage: f64,
}

/// Historical grade distribution for a course
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeDistribution {
    pub buckets: Vec<GradeBucket>,
}

impl GradeDistribution {
    pub fn new(buckets: Vec<GradeBucket>) -> Self {
        Self { buckets }
    }

    /// Build from (label, count) pairs; percentages are derived from the counts.
    pub fn from_counts(counts: &[(&str, u32)]) -> Self {
        let total: u32 = counts.iter().map(|(_, c)| *c).sum();
        let buckets = counts
            .iter()
            .map(|(label, count)| GradeBucket {
                letter_grade: (*label).to_string(),
                student_count: *count,
                percentage: if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64 * 100.0
                },
            })
            .collect();
        Self { buckets }
    }

    /// Weight per letter grade, aggregated over duplicate labels.
    ///
    /// Non-letter marks are dropped. Student counts are the weights; when
    /// every count is zero the reported percentages are used instead.
    pub fn letter_weights(&self) -> Vec<(LetterGrade, f64)> {
        let letter_buckets: Vec<(LetterGrade, &GradeBucket)> = self
            .buckets
            .iter()
            .filter_map(|b| LetterGrade::from_label(&b.letter_grade).map(|g| (g, b)))
            .collect();

        let use_counts = letter_buckets.iter().any(|(_, b)| b.student_count > 0);

        let mut weights: Vec<(LetterGrade, f64)> = Vec::new();
        for (grade, bucket) in letter_buckets {
            let w = if use_counts {
                bucket.student_count as f64
            } else {
                bucket.percentage.max(0.0)
            };
            match weights.iter_mut().find(|(g, _)| *g == grade) {
                Some(entry) => entry.1 += w,
                None => weights.push((grade, w)),
            }
        }
        weights.sort_by_key(|(g, _)| *g);
        weights
    }
}

/// How a course's grade is split across assessment types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradingStructure {
    #[serde(default)]
    pub pct_exams: Option<f64>,
    #[serde(default)]
    pub pct_projects: Option<f64>,
    #[serde(default)]
    pub pct_homework: Option<f64>,
    #[serde(default)]
    pub pct_participation: Option<f64>,
    #[serde(default)]
    pub pct_other: Option<f64>,
    #[serde(default)]
    pub num_exams: Option<u32>,
    #[serde(default)]
    pub num_projects: Option<u32>,
    #[serde(default)]
    pub num_homeworks: Option<u32>,
    #[serde(default)]
    pub has_final_exam: Option<bool>,
}

/// A course the student already took, with the grade they received
#[derive(Clone, Serialize, Deserialize)]
pub struct PriorCourseObservation {
    pub course_name: String,
    pub grade_received: LetterGrade,
}

impl fmt::Debug for PriorCourseObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PriorCourseObservation { .. }")
    }
}

/// Student-supplied context for a personalized prediction.
///
/// Lives for one request only. `Debug` is redacted so the values cannot
/// leak into logs.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub avg_gpa: Option<f64>,
    #[serde(default)]
    pub prior_courses: Vec<PriorCourseObservation>,
    #[serde(default)]
    pub units_this_semester: Option<u32>,
    #[serde(default)]
    pub hours_per_week_available: Option<u32>,
    #[serde(default)]
    pub comfort_level: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub const MAX_NOTES_LEN: usize = 1000;

impl UserContext {
    pub fn validate(&self) -> Result<(), PredictionError> {
        if let Some(gpa) = self.avg_gpa {
            if !gpa.is_finite() || !(GPA_MIN..=GPA_MAX).contains(&gpa) {
                return Err(PredictionError::InvalidInput(
                    "avg_gpa must be within [0.0, 4.0]".to_string(),
                ));
            }
        }
        if self.units_this_semester.is_some_and(|u| u > 35) {
            return Err(PredictionError::InvalidInput(
                "units_this_semester must be within [0, 35]".to_string(),
            ));
        }
        if self.hours_per_week_available.is_some_and(|h| h > 80) {
            return Err(PredictionError::InvalidInput(
                "hours_per_week_available must be within [0, 80]".to_string(),
            ));
        }
        if self.comfort_level.is_some_and(|c| !(1..=5).contains(&c)) {
            return Err(PredictionError::InvalidInput(
                "comfort_level must be within [1, 5]".to_string(),
            ));
        }
        if self
            .notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_LEN)
        {
            return Err(PredictionError::InvalidInput(format!(
                "notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }
        Ok(())
    }

    pub fn has_notes(&self) -> bool {
        self.notes.as_ref().is_some_and(|n| !n.trim().is_empty())
    }
}

impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("prior_courses", &self.prior_courses.len())
            .field("has_gpa", &self.avg_gpa.is_some())
            .field("has_notes", &self.has_notes())
            .finish_non_exhaustive()
    }
}

/// Prediction mode requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[default]
    #[serde(rename = "population_basic", alias = "grade_distribution")]
    PopulationBasic,
    #[serde(rename = "population_structural", alias = "full")]
    PopulationStructural,
    #[serde(rename = "personalized")]
    Personalized,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::PopulationBasic => "population_basic",
            ModelType::PopulationStructural => "population_structural",
            ModelType::Personalized => "personalized",
        }
    }

    /// Registry id of the population model backing this mode.
    /// Personalized predictions start from the grade-distribution model.
    pub fn registry_id(&self) -> &'static str {
        match self {
            ModelType::PopulationBasic | ModelType::Personalized => "population_basic",
            ModelType::PopulationStructural => "population_structural",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_grade_scale() {
        assert_eq!(LetterGrade::APlus.gpa(), 4.0);
        assert_eq!(LetterGrade::A.gpa(), 4.0);
        assert_eq!(LetterGrade::AMinus.gpa(), 3.7);
        assert_eq!(LetterGrade::CMinus.gpa(), 1.7);
        assert_eq!(LetterGrade::F.gpa(), 0.0);
    }

    #[test]
    fn test_letter_grade_labels_round_trip() {
        for grade in LetterGrade::ALL {
            assert_eq!(LetterGrade::from_label(grade.label()), Some(grade));
        }
        assert_eq!(LetterGrade::from_label("P"), None);
        assert_eq!(LetterGrade::from_label("NP"), None);
    }

    #[test]
    fn test_passing_is_c_minus_or_better() {
        assert!(LetterGrade::CMinus.is_passing());
        assert!(LetterGrade::APlus.is_passing());
        assert!(!LetterGrade::DPlus.is_passing());
        assert!(!LetterGrade::F.is_passing());
    }

    #[test]
    fn test_course_level_from_number() {
        assert_eq!(CourseLevel::from_number("61A"), CourseLevel::LowerDiv);
        assert_eq!(CourseLevel::from_number("170"), CourseLevel::UpperDiv);
        assert_eq!(CourseLevel::from_number("C100"), CourseLevel::UpperDiv);
        assert_eq!(CourseLevel::from_number("ABC"), CourseLevel::Unknown);
    }

    #[test]
    fn test_letter_weights_skip_pass_marks_and_merge_duplicates() {
        let dist = GradeDistribution::from_counts(&[("A", 10), ("P", 50), ("A", 5), ("B", 5)]);
        let weights = dist.letter_weights();
        assert_eq!(weights, vec![(LetterGrade::A, 15.0), (LetterGrade::B, 5.0)]);
    }

    #[test]
    fn test_letter_weights_fall_back_to_percentages() {
        let dist = GradeDistribution::new(vec![
            GradeBucket {
                letter_grade: "A".to_string(),
                student_count: 0,
                percentage: 60.0,
            },
            GradeBucket {
                letter_grade: "C".to_string(),
                student_count: 0,
                percentage: 40.0,
            },
        ]);
        let weights = dist.letter_weights();
        assert_eq!(weights, vec![(LetterGrade::A, 60.0), (LetterGrade::C, 40.0)]);
    }

    #[test]
    fn test_model_type_aliases() {
        let basic: ModelType = serde_json::from_str("\"grade_distribution\"").unwrap();
        let full: ModelType = serde_json::from_str("\"full\"").unwrap();
        let structural: ModelType = serde_json::from_str("\"population_structural\"").unwrap();
        assert_eq!(basic, ModelType::PopulationBasic);
        assert_eq!(full, ModelType::PopulationStructural);
        assert_eq!(structural, ModelType::PopulationStructural);
        assert_eq!(ModelType::Personalized.registry_id(), "population_basic");
        assert_eq!(ModelType::default(), ModelType::PopulationBasic);
    }

    #[test]
    fn test_user_context_validation() {
        let ok = UserContext {
            avg_gpa: Some(3.4),
            comfort_level: Some(4),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_gpa = UserContext {
            avg_gpa: Some(4.3),
            ..Default::default()
        };
        assert!(matches!(bad_gpa.validate(), Err(PredictionError::InvalidInput(_))));

        let bad_comfort = UserContext {
            comfort_level: Some(0),
            ..Default::default()
        };
        assert!(bad_comfort.validate().is_err());
    }

    #[test]
    fn test_user_context_debug_is_redacted() {
        let ctx = UserContext {
            avg_gpa: Some(3.1),
            notes: Some("working two jobs this term".to_string()),
            prior_courses: vec![PriorCourseObservation {
                course_name: "COMPSCI 61A".to_string(),
                grade_received: LetterGrade::B,
            }],
            ..Default::default()
        };
        let rendered = format!("{:?}", ctx);
        assert!(!rendered.contains("3.1"));
        assert!(!rendered.contains("jobs"));
        assert!(!rendered.contains("61A"));
    }
}
