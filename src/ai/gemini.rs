//! Direct API-key backend.
//!
//! Implements the TextGenerator trait against the public
//! `generativelanguage.googleapis.com` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::wire::{self, GenerateContentRequest};
use super::TextGenerator;
use crate::core::{AiConfig, ArchitectError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// API-key text generator.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiGenerator {
    /// Create a generator with default sampling settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ArchitectError::configuration(
                "GEMINI_API_KEY is required for the gemini provider",
            ));
        }

        let defaults = AiConfig::default();
        Ok(Self {
            client: Client::new(),
            api_key,
            model: defaults.gemini.model,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        })
    }

    /// Create from the `[ai]` config section.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config.gemini.api_key.clone().unwrap_or_default();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArchitectError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            ..Self::new(api_key)?.with_model(&config.gemini.model)
        })
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn request(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let body = GenerateContentRequest::user_prompt(prompt, temperature, max_tokens);
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "gemini request");

        let request = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&body);

        wire::send(request, self.name()).await
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.request(prompt, self.temperature, self.max_tokens).await
    }

    async fn generate_with_parameters(
        &self,
        prompt: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        self.request(
            prompt,
            temperature.unwrap_or(self.temperature),
            max_tokens.unwrap_or(self.max_tokens),
        )
        .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
