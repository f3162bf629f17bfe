use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Incompatible features: {0}")]
    IncompatibleFeatures(String),

    #[error("Insufficient context: {0}")]
    InsufficientContext(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No predictions: {0}")]
    NoPredictions(String),
}

impl PredictionError {
    /// Short machine-readable tag for API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::CourseNotFound(_) => "course_not_found",
            PredictionError::MissingData(_) => "missing_data",
            PredictionError::UnknownModel(_) => "unknown_model",
            PredictionError::IncompatibleFeatures(_) => "incompatible_features",
            PredictionError::InsufficientContext(_) => "insufficient_context",
            PredictionError::InvalidInput(_) => "invalid_input",
            PredictionError::NoPredictions(_) => "no_predictions",
        }
    }
}

pub type CoreResult<T> = Result<T, PredictionError>;
