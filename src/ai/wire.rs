//! `generateContent` wire format shared by both backends.

use serde::{Deserialize, Serialize};

use crate::core::{ArchitectError, Result};

/// Longest response body kept in error metadata.
const MAX_ERROR_BODY: usize = 500;

/// Request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single-turn user prompt.
    pub fn user_prompt(prompt: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig { temperature, max_output_tokens },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Convert into the generated text or a generation error.
    pub fn into_text(self, provider: &str) -> Result<String> {
        if let Some(text) = self.text() {
            return Ok(text);
        }

        let mut err = ArchitectError::ai_generation("No content generated").with_meta("provider", provider);
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            err = err.with_meta("blockReason", reason);
        }
        if let Some(reason) = self.candidates.into_iter().next().and_then(|c| c.finish_reason) {
            err = err.with_meta("finishReason", reason);
        }
        Err(err)
    }
}

/// Send a prepared request and extract the generated text.
pub(crate) async fn send(request: reqwest::RequestBuilder, provider: &str) -> Result<String> {
    let response = request.send().await.map_err(|e| {
        ArchitectError::ai_generation(format!("{provider} request failed: {e}"))
            .with_meta("provider", provider)
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
        let message = format!("{provider} API error ({status})");

        let err = if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            ArchitectError::configuration(format!("{message}: credentials rejected"))
        } else {
            ArchitectError::ai_generation(message)
        };
        return Err(err
            .with_meta("provider", provider)
            .with_meta("status", status.as_u16())
            .with_meta("body", snippet));
    }

    let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
        ArchitectError::ai_generation(format!("{provider} returned an unreadable response: {e}"))
            .with_meta("provider", provider)
    })?;

    parsed.into_text(provider)
}
