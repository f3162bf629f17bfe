use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::{parse_analysis, ContextAnalysis};
use crate::error::{ContextError, ContextResult};
use crate::ContextAnalyzer;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Notes shorter than this (after trimming) are not worth a round trip
pub const MIN_NOTES_LEN: usize = 10;

const SYSTEM_PROMPT: &str = r#"You are an academic performance analyzer. Extract contextual factors from a student's notes that might affect their performance in a course.

Consider only: health or disability affecting study, major life events, work or other external commitments, subject strengths or weaknesses, motivation and interest, relevant experience outside coursework, peer support, and access to resources.

Respond with ONLY a JSON object (use null for anything not mentioned):
{
  "health_impact": "positive" | "negative" | "neutral" | null,
  "external_commitments": "high" | "moderate" | "low" | null,
  "motivation": "high" | "moderate" | "low" | null,
  "relevant_experience": "extensive" | "some" | "none" | null,
  "support_system": "strong" | "moderate" | "weak" | null,
  "resource_access": "full" | "limited" | "restricted" | null,
  "confidence_adjustment": number between -0.2 and 0.2,
  "reasoning": "1-2 sentence summary"
}

confidence_adjustment is a GPA modifier for the overall context. Be conservative: most notes warrant between -0.1 and 0.1."#;

/// Settings for the chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub api_url: String,
    pub model: String,
    /// No key means notes are never sent anywhere
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible chat client (Groq by default)
#[derive(Clone)]
pub struct GroqContextClient {
    client: reqwest::Client,
    config: ContextConfig,
}

impl GroqContextClient {
    pub fn new(config: ContextConfig) -> ContextResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn user_prompt(notes: &str, course_name: &str) -> String {
        format!(
            "Target Course: {}\n\nStudent Notes:\n{}\n\nAnalyze the above notes and extract relevant contextual factors as JSON.",
            course_name, notes
        )
    }
}

#[async_trait]
impl ContextAnalyzer for GroqContextClient {
    async fn analyze(&self, notes: &str, course_name: &str) -> ContextResult<Option<ContextAnalysis>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::debug!("No context API key configured, skipping notes analysis");
            return Ok(None);
        };

        if notes.trim().chars().count() < MIN_NOTES_LEN {
            tracing::debug!("Notes too short for analysis");
            return Ok(None);
        }

        let user_prompt = Self::user_prompt(notes, course_name);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 300,
            top_p: 0.9,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ContextError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let body = response.json::<ChatResponse>().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ContextError::InvalidResponse("no choices in completion".to_string()))?;

        parse_analysis(&content).map(Some)
    }

    fn backend_name(&self) -> &'static str {
        "groq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config(api_key: Option<&str>) -> ContextConfig {
        ContextConfig {
            // Port 9 (discard) is closed on test machines
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_without_key_nothing_is_sent() {
        let client = GroqContextClient::new(unreachable_config(None)).unwrap();
        assert!(!client.is_configured());
        let result = client
            .analyze("Working 30 hours a week this semester", "COMPSCI 170")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_short_notes_are_skipped() {
        let client = GroqContextClient::new(unreachable_config(Some("test-key"))).unwrap();
        assert!(client.is_configured());
        let result = client.analyze("   tired  ", "COMPSCI 170").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        let client = GroqContextClient::new(unreachable_config(Some("test-key"))).unwrap();
        let result = client
            .analyze("Working 30 hours a week this semester", "COMPSCI 170")
            .await;
        assert!(matches!(
            result,
            Err(ContextError::RequestFailed(_)) | Err(ContextError::Timeout)
        ));
    }

    #[test]
    fn test_user_prompt_names_course() {
        let prompt = GroqContextClient::user_prompt("notes here", "MATH 1A");
        assert!(prompt.starts_with("Target Course: MATH 1A"));
        assert!(prompt.contains("notes here"));
    }
}
