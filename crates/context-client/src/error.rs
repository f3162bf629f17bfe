use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ContextError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ContextError::Timeout
        } else {
            ContextError::RequestFailed(e)
        }
    }
}

pub type ContextResult<T> = Result<T, ContextError>;
