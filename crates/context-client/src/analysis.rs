use ability_estimator::clamp_context_adjustment;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContextError, ContextResult};

const DEFAULT_REASONING: &str = "Analysis based on provided context";

/// Factors extracted from a student's notes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextAnalysis {
    pub health_impact: Option<String>,
    pub external_commitments: Option<String>,
    pub motivation: Option<String>,
    pub relevant_experience: Option<String>,
    pub support_system: Option<String>,
    pub resource_access: Option<String>,
    /// GPA shift in [-0.2, 0.2]
    pub confidence_adjustment: f64,
    pub reasoning: String,
}

/// Loose shape of the model's JSON; the adjustment may come back as
/// anything, so it is read as a raw value.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    health_impact: Option<String>,
    #[serde(default)]
    external_commitments: Option<String>,
    #[serde(default)]
    motivation: Option<String>,
    #[serde(default)]
    relevant_experience: Option<String>,
    #[serde(default)]
    support_system: Option<String>,
    #[serde(default)]
    resource_access: Option<String>,
    #[serde(default)]
    confidence_adjustment: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Pull the JSON object out of a chat completion and sanitize it.
///
/// The object may be wrapped in prose or code fences. A non-numeric
/// adjustment reads as 0 and numeric ones are clamped to ±0.2.
pub fn parse_analysis(content: &str) -> ContextResult<ContextAnalysis> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &content[s..=e],
        _ => {
            return Err(ContextError::InvalidResponse(
                "no JSON object in model output".to_string(),
            ))
        }
    };

    let raw: RawAnalysis = serde_json::from_str(json)?;
    let adjustment = raw
        .confidence_adjustment
        .as_ref()
        .and_then(Value::as_f64)
        .map(clamp_context_adjustment)
        .unwrap_or(0.0);

    Ok(ContextAnalysis {
        health_impact: raw.health_impact,
        external_commitments: raw.external_commitments,
        motivation: raw.motivation,
        relevant_experience: raw.relevant_experience,
        support_system: raw.support_system,
        resource_access: raw.resource_access,
        confidence_adjustment: adjustment,
        reasoning: raw
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
    })
}
