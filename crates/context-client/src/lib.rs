//! Free-text notes analysis
//!
//! Sends a student's notes to an external chat model and turns the reply
//! into a small GPA shift. The notes leave the process only when an API key
//! is configured, and any failure degrades to no shift at all.

pub mod analysis;
pub mod error;
pub mod groq;

pub use analysis::{parse_analysis, ContextAnalysis};
pub use error::{ContextError, ContextResult};
pub use groq::{ContextConfig, GroqContextClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend-agnostic notes analyzer
#[async_trait]
pub trait ContextAnalyzer: Send + Sync {
    /// `Ok(None)` means the analyzer chose not to run (no key, notes too short).
    async fn analyze(&self, notes: &str, course_name: &str) -> ContextResult<Option<ContextAnalysis>>;

    fn backend_name(&self) -> &'static str;
}

/// Analyzer that never calls out. Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnalyzer;

#[async_trait]
impl ContextAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _notes: &str, _course_name: &str) -> ContextResult<Option<ContextAnalysis>> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

/// Bounded shift derived from notes, ready to hand to the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAdjustment {
    pub value: f64,
    pub analyzed: bool,
    pub reasoning: Option<String>,
}

impl ContextAdjustment {
    pub fn neutral() -> Self {
        Self {
            value: 0.0,
            analyzed: false,
            reasoning: None,
        }
    }

    /// Run the analyzer and collapse every outcome into a bounded number.
    ///
    /// Missing notes, a skipped analysis and any error all give 0.
    pub async fn resolve<A>(analyzer: &A, notes: Option<&str>, course_name: &str) -> Self
    where
        A: ContextAnalyzer + ?Sized,
    {
        let Some(notes) = notes.filter(|n| !n.trim().is_empty()) else {
            return Self::neutral();
        };

        match analyzer.analyze(notes, course_name).await {
            Ok(Some(analysis)) => {
                tracing::debug!("Notes analyzed by {}", analyzer.backend_name());
                Self {
                    value: ability_estimator::clamp_context_adjustment(analysis.confidence_adjustment),
                    analyzed: true,
                    reasoning: Some(analysis.reasoning),
                }
            }
            Ok(None) => Self::neutral(),
            Err(e) => {
                tracing::warn!(
                    "Notes analysis via {} failed, using no adjustment: {}",
                    analyzer.backend_name(),
                    e
                );
                Self::neutral()
            }
        }
    }
}
