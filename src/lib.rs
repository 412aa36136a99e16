#![allow(clippy::format_push_string)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

//! # Archwright
//!
//! AI-guided software design - from a conversation to use cases, a domain
//! model, an architecture, a design class diagram, and a validated report.
//!
//! Each phase sends a structured prompt to a text-generation backend, parses
//! the loosely structured answer (JSON or Mermaid markup), validates it, and
//! merges it into a [`DesignDocument`].
//!
//! ## Features
//!
//! - **Phase orchestration**: precondition-gated operations, one backend call each
//! - **Graceful degradation**: malformed chat answers become an explicit degraded outcome
//! - **Swappable backends**: API-key and enterprise adapters behind one port
//! - **Deterministic reports**: Markdown with diagram image links, no AI calls
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! archwright new "Bookshop" -d "Online book store"
//! archwright chat <id> "Customers browse books and pay by card"
//! archwright automate <id>
//! archwright report <id> -o bookshop.md
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod ai;
pub mod core;
pub mod workflow;

pub use ai::{create_generator, GenerationParams, TextGenerator};
pub use core::{
    ArchitectError, Config, DocumentFileLock, DocumentLocks, DocumentStore, ErrorKind,
    FileDocumentStore, Result,
};
pub use workflow::{
    compile_report, ChatOutcome, DesignArchitect, DesignDocument, PhaseAutomation, ProjectPhase,
    ReportOptions, UseCase,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "archwright";
