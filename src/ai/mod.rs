//! Text-generation port.
//!
//! The workflow treats the language model as an opaque oracle: a prompt goes
//! in, text comes out. Concrete backends implement [`TextGenerator`] and are
//! selected by configuration.
//!
//! ## Backends
//!
//! - `gemini` - direct API-key client
//! - `vertex` - cloud-hosted enterprise endpoint (project + location + OAuth token)

#[cfg(feature = "ai")]
mod gemini;
#[cfg(feature = "ai")]
mod vertex;
#[cfg(feature = "ai")]
mod wire;

#[cfg(feature = "ai")]
pub use gemini::GeminiGenerator;
#[cfg(feature = "ai")]
pub use vertex::VertexGenerator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AiConfig, Result};

/// Trait for text-generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text using the backend's configured defaults.
    ///
    /// Fails with an AI generation error when the backend returns no content.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Generate text with per-call sampling overrides.
    async fn generate_with_parameters(
        &self,
        prompt: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String>;

    /// Get the backend name.
    fn name(&self) -> &str;
}

/// Per-call sampling overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Build the backend selected by `[ai] provider`.
#[cfg(feature = "ai")]
pub fn create_generator(config: &AiConfig) -> Result<Arc<dyn TextGenerator>> {
    use crate::core::ProviderKind;

    let generator: Arc<dyn TextGenerator> = match config.provider {
        ProviderKind::Gemini => Arc::new(GeminiGenerator::from_config(config)?),
        ProviderKind::Vertex => Arc::new(VertexGenerator::from_config(config)?),
    };
    tracing::debug!(provider = generator.name(), "text generator ready");
    Ok(generator)
}

/// Build the backend selected by `[ai] provider`.
#[cfg(not(feature = "ai"))]
pub fn create_generator(config: &AiConfig) -> Result<Arc<dyn TextGenerator>> {
    Err(crate::core::ArchitectError::configuration(format!(
        "Provider '{}' unavailable: built without the `ai` feature",
        config.provider
    )))
}
