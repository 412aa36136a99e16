//! Core infrastructure for Archwright.
//!
//! Error taxonomy, configuration, persistence, and caller-side retry.

mod config;
mod error;
mod retry;
mod store;

pub use config::{
    AiConfig, Config, GeminiConfig, GeneralConfig, ProviderKind, ReportConfig, VertexConfig,
    LOCAL_CONFIG_FILE,
};
pub use error::{log_error, normalize, ArchitectError, ErrorKind, ErrorReport, Metadata, Result};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use store::{
    DocumentFileLock, DocumentLocks, DocumentStore, FileDocumentStore, DEFAULT_LOCK_WAIT,
    DEFAULT_STALE_LOCK_AGE,
};
