//! Cloud-hosted enterprise backend.
//!
//! Calls the regional `aiplatform.googleapis.com` publisher-model endpoint
//! with an OAuth bearer token. When no token is configured one is obtained
//! once from `gcloud auth print-access-token` and reused.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::OnceCell;

use super::wire::{self, GenerateContentRequest};
use super::TextGenerator;
use crate::core::{AiConfig, ArchitectError, Result};

/// Enterprise text generator.
pub struct VertexGenerator {
    client: Client,
    project_id: String,
    location: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    token: OnceCell<String>,
}

impl VertexGenerator {
    /// Create a generator for a project and region.
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(ArchitectError::configuration(
                "GOOGLE_CLOUD_PROJECT_ID is required for the vertex provider",
            ));
        }

        let defaults = AiConfig::default();
        Ok(Self {
            client: Client::new(),
            project_id,
            location: location.into(),
            model: defaults.vertex.model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            token: OnceCell::new(),
        })
    }

    /// Create from the `[ai]` config section.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let vertex = &config.vertex;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArchitectError::configuration(format!("Failed to build HTTP client: {e}")))?;

        let mut generator = Self::new(vertex.project_id.clone().unwrap_or_default(), &vertex.location)?
            .with_model(&vertex.model);
        generator.client = client;
        generator.temperature = config.temperature;
        generator.max_tokens = config.max_tokens;
        if let Some(token) = vertex.access_token.clone().filter(|t| !t.trim().is_empty()) {
            generator = generator.with_access_token(token);
        }
        Ok(generator)
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a fixed access token instead of asking `gcloud`.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.token = OnceCell::new_with(Some(token.into()));
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
            loc = self.location,
            project = self.project_id,
            model = self.model
        )
    }

    async fn access_token(&self) -> Result<&str> {
        self.token.get_or_try_init(fetch_gcloud_token).await.map(String::as_str)
    }

    async fn request(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let token = self.access_token().await?;
        let body = GenerateContentRequest::user_prompt(prompt, temperature, max_tokens);
        tracing::debug!(model = %self.model, location = %self.location, prompt_chars = prompt.len(), "vertex request");

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .header("content-type", "application/json")
            .json(&body);

        wire::send(request, self.name()).await
    }
}

/// Ask the gcloud CLI for an application access token.
async fn fetch_gcloud_token() -> Result<String> {
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            ArchitectError::configuration(format!(
                "No VERTEX_ACCESS_TOKEN set and gcloud could not be run: {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArchitectError::configuration("gcloud auth print-access-token failed")
            .with_meta("stderr", stderr.trim().to_string()));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ArchitectError::configuration("gcloud returned an empty access token"));
    }
    Ok(token)
}

#[async_trait]
impl TextGenerator for VertexGenerator {
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
        "vertex"
    }
}
