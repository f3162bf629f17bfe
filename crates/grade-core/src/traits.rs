use crate::{Course, GradeDistribution, GradingStructure};

/// Read-only source of course reference data.
///
/// The prediction engine never writes through this trait; implementations
/// are shared across concurrent requests.
pub trait CourseCatalog: Send + Sync {
    fn course(&self, course_id: i64) -> Option<Course>;

    fn grade_distribution(&self, course_id: i64) -> Option<GradeDistribution>;

    fn grading_structure(&self, course_id: i64) -> Option<GradingStructure>;

    /// Historical average GPA for a course named like "COMPSCI 61A".
    /// `None` when the name does not resolve or the course has no average.
    fn course_average_by_name(&self, course_name: &str) -> Option<f64>;
}
