//! Error taxonomy for Archwright.
//!
//! Every failure that crosses a module boundary is an [`ArchitectError`].
//! Before logging, errors are normalized into an [`ErrorReport`] so that
//! observability code only ever handles one shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured diagnostic metadata attached to an error.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, ArchitectError>;

/// Errors produced by the design workflow and its collaborators.
#[derive(Debug, Error)]
pub enum ArchitectError {
    /// A precondition or hand-authored input check failed (user-actionable).
    #[error("{message}")]
    Validation { message: String, metadata: Metadata },

    /// The text-generation backend returned no usable content.
    #[error("{message}")]
    AiGeneration { message: String, metadata: Metadata },

    /// Loading or saving documents failed.
    #[error("{message}")]
    Persistence { message: String, metadata: Metadata },

    /// Configuration is invalid or incomplete.
    #[error("{message}")]
    Configuration { message: String, metadata: Metadata },

    /// Anything else, wrapped before logging.
    #[error("{message}")]
    Unknown { message: String, metadata: Metadata },
}

/// Error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    AiGeneration,
    Persistence,
    Configuration,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::AiGeneration => write!(f, "AIGenerationError"),
            ErrorKind::Persistence => write!(f, "PersistenceError"),
            ErrorKind::Configuration => write!(f, "ConfigurationError"),
            ErrorKind::Unknown => write!(f, "ApplicationError"),
        }
    }
}

impl ArchitectError {
    /// Create a validation error without metadata.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), metadata: Metadata::new() }
    }

    /// Create an AI generation error without metadata.
    pub fn ai_generation(message: impl Into<String>) -> Self {
        Self::AiGeneration { message: message.into(), metadata: Metadata::new() }
    }

    /// Create a persistence error without metadata.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into(), metadata: Metadata::new() }
    }

    /// Create a configuration error without metadata.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), metadata: Metadata::new() }
    }

    /// Create an unknown error without metadata.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown { message: message.into(), metadata: Metadata::new() }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata_mut().insert(key.into(), value.into());
        self
    }

    /// Get the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::AiGeneration { .. } => ErrorKind::AiGeneration,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::AiGeneration => "AI_GENERATION_ERROR",
            ErrorKind::Persistence => "PERSISTENCE_ERROR",
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// HTTP-style status classification (4xx user-actionable, 5xx otherwise).
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            _ => 500,
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::AiGeneration
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::AiGeneration { message, .. }
            | Self::Persistence { message, .. }
            | Self::Configuration { message, .. }
            | Self::Unknown { message, .. } => message,
        }
    }

    /// Diagnostic metadata.
    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Validation { metadata, .. }
            | Self::AiGeneration { metadata, .. }
            | Self::Persistence { metadata, .. }
            | Self::Configuration { metadata, .. }
            | Self::Unknown { metadata, .. } => metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Self::Validation { metadata, .. }
            | Self::AiGeneration { metadata, .. }
            | Self::Persistence { metadata, .. }
            | Self::Configuration { metadata, .. }
            | Self::Unknown { metadata, .. } => metadata,
        }
    }

    /// Build the normalized report for this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            name: self.kind().to_string(),
            code: self.code().to_string(),
            message: self.message().to_string(),
            status_code: self.status_code(),
            metadata: self.metadata().clone(),
        }
    }
}

impl From<std::io::Error> for ArchitectError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(format!("I/O error: {err}")).with_meta("ioKind", format!("{:?}", err.kind()))
    }
}

impl From<serde_json::Error> for ArchitectError {
    fn from(err: serde_json::Error) -> Self {
        Self::persistence(format!("Serialization error: {err}"))
            .with_meta("line", err.line())
            .with_meta("column", err.column())
    }
}

/// Common structured shape every error is normalized to before logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub name: String,
    pub code: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

/// Convert any error into an [`ArchitectError`].
///
/// Known errors pass through unchanged; everything else becomes
/// [`ArchitectError::Unknown`] with the original error chain in metadata.
pub fn normalize(err: anyhow::Error) -> ArchitectError {
    match err.downcast::<ArchitectError>() {
        Ok(known) => known,
        Err(other) => {
            let chain: Vec<String> = other.chain().skip(1).map(|c| c.to_string()).collect();
            let mut normalized =
                ArchitectError::unknown(other.to_string()).with_meta("originalError", other.to_string());
            if !chain.is_empty() {
                normalized = normalized.with_meta("causes", chain);
            }
            normalized
        }
    }
}

/// Log an error at a level matching its status classification.
pub fn log_error(err: &ArchitectError, context: &Metadata) {
    let report = err.report();
    let payload = serde_json::to_string(&report).unwrap_or_else(|_| report.message.clone());
    let context = serde_json::to_string(context).unwrap_or_default();

    if report.status_code >= 500 {
        tracing::error!(code = %report.code, report = %payload, context = %context, "{}", report.message);
    } else {
        tracing::warn!(code = %report.code, report = %payload, context = %context, "{}", report.message);
    }
}
