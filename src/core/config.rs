//! Configuration management for Archwright.
//!
//! Handles loading and saving configuration from TOML files, with
//! environment variable overrides for backend credentials.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{ArchitectError, Result};

/// Local config file name, checked in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".archwright.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Text-generation backend settings
    pub ai: AiConfig,

    /// Report rendering settings
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// User id recorded as the owner of new documents
    pub user_id: String,

    /// Override for the document store directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Which text-generation backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Direct API-key client
    #[default]
    Gemini,
    /// Cloud-hosted enterprise endpoint
    Vertex,
}

impl std::str::FromStr for ProviderKind {
    type Err = ArchitectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "vertex" | "vertexai" | "vertex-ai" => Ok(Self::Vertex),
            other => Err(ArchitectError::configuration(format!(
                "ai.provider: unknown provider '{other}' (expected gemini or vertex)"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Vertex => write!(f, "vertex"),
        }
    }
}

/// Text-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Backend selection
    pub provider: ProviderKind,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Per-call timeout applied by callers
    pub timeout_secs: u64,

    /// Caller-side retries for retryable generation errors
    pub max_retries: u32,

    /// API-key backend settings
    pub gemini: GeminiConfig,

    /// Enterprise backend settings
    pub vertex: VertexConfig,
}

/// Direct API-key backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
}

/// Enterprise backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub location: String,
    pub model: String,

    /// OAuth access token; when unset the adapter asks `gcloud` for one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Diagram image service; the base64 diagram is appended as a path segment
    pub image_base_url: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        let user_id = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "local-user".to_string());
        Self { user_id, data_dir: None }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 120,
            max_retries: 2,
            gemini: GeminiConfig::default(),
            vertex: VertexConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self { api_key: None, model: "gemini-2.0-flash-exp".to_string() }
    }
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: "europe-north1".to_string(),
            model: "gemini-2.0-flash-001".to_string(),
            access_token: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { image_base_url: "https://mermaid.ink/img".to_string() }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.archwright.toml` in current directory
    /// 2. `~/.config/archwright/config.toml`
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied on top of whichever source was used.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file_or_default()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file_or_default() -> Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ArchitectError::configuration(format!("Failed to parse {}: {e}", path.display()))
                .with_meta("path", path.display().to_string())
        })
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::global_config_path().ok_or_else(|| {
            ArchitectError::configuration("Could not determine config directory")
        })?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ArchitectError::configuration(format!("Failed to encode config: {e}")))?;
        std::fs::write(&config_path, content)?;

        Ok(config_path)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            self.ai.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.ai.gemini.model = model;
        }
        if let Some(raw) = get("GEMINI_TEMPERATURE") {
            self.ai.temperature = raw.trim().parse().map_err(|_| {
                ArchitectError::configuration(format!("GEMINI_TEMPERATURE: not a number: '{raw}'"))
            })?;
        }
        if let Some(raw) = get("GEMINI_MAX_TOKENS") {
            self.ai.max_tokens = raw.trim().parse().map_err(|_| {
                ArchitectError::configuration(format!("GEMINI_MAX_TOKENS: not an integer: '{raw}'"))
            })?;
        }
        if let Some(project) = get("GOOGLE_CLOUD_PROJECT_ID") {
            self.ai.vertex.project_id = Some(project);
        }
        if let Some(location) = get("GOOGLE_CLOUD_LOCATION") {
            self.ai.vertex.location = location;
        }
        if let Some(token) = get("VERTEX_ACCESS_TOKEN") {
            self.ai.vertex.access_token = Some(token);
        }
        if let Some(provider) = get("ARCHWRIGHT_PROVIDER") {
            self.ai.provider = provider.parse()?;
        }
        if let Some(user) = get("ARCHWRIGHT_USER") {
            self.general.user_id = user;
        }

        Ok(())
    }

    /// Check value ranges and provider requirements.
    ///
    /// Every violation is reported in one error.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.general.user_id.trim().is_empty() {
            problems.push("general.user_id: must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            problems.push(format!(
                "ai.temperature: must be between 0 and 2 (got {})",
                self.ai.temperature
            ));
        }
        if self.ai.max_tokens == 0 {
            problems.push("ai.max_tokens: must be positive".to_string());
        }
        if self.ai.timeout_secs == 0 {
            problems.push("ai.timeout_secs: must be positive".to_string());
        }
        if self.report.image_base_url.trim().is_empty() {
            problems.push("report.image_base_url: must not be empty".to_string());
        }

        match self.ai.provider {
            ProviderKind::Gemini => {
                if self.ai.gemini.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    problems.push("ai.gemini.api_key: required (or set GEMINI_API_KEY)".to_string());
                }
                if self.ai.gemini.model.trim().is_empty() {
                    problems.push("ai.gemini.model: must not be empty".to_string());
                }
            }
            ProviderKind::Vertex => {
                if self.ai.vertex.project_id.as_deref().map_or(true, |p| p.trim().is_empty()) {
                    problems.push(
                        "ai.vertex.project_id: required (or set GOOGLE_CLOUD_PROJECT_ID)".to_string(),
                    );
                }
                if self.ai.vertex.location.trim().is_empty() {
                    problems.push("ai.vertex.location: must not be empty".to_string());
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ArchitectError::configuration(format!(
                "Invalid configuration: {}",
                problems.join(", ")
            ))
            .with_meta("problems", problems))
        }
    }

    /// Path of the global config file.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("archwright"))
    }

    /// Directory holding persisted documents.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.general
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("archwright")))
    }
}
