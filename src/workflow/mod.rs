//! Design workflow.
//!
//! Drives a design document from use cases to a validated class diagram.
//!
//! ## Phases
//!
//! - `requirementsSpec` - purpose, stakeholders, constraints, requirements
//! - `analysis` - use cases and the domain model
//! - `systemDesign` - architecture diagram
//! - `objectDesign` - design class diagram
//! - `validation` - AI traceability review
//! - `completed` - final report compiled
//!
//! ## Pipeline
//!
//! - `prompts` - one prompt builder per phase
//! - `parsing` / `schema` - turn model text into validated data
//! - `DesignArchitect` - precondition check, backend call, merge
//! - `PhaseAutomation` - runs the remaining phases in order
//! - `compile_report` / `export_bundle` - Markdown output

mod architect;
mod automation;
mod documents;
mod export;
mod parsing;
mod patterns;
pub mod prompts;
mod report;
mod schema;

pub use architect::{
    start_project, ChatOutcome, DesignArchitect, ANALYSIS_FALLBACK_REPLY,
    REQUIREMENTS_FALLBACK_REPLY,
};
pub use automation::{
    advance_phase, AutomationEvent, AutomationProgress, AutomationStep, PhaseAutomation,
};
pub use documents::{
    AnalysisPhase, Constraint, ConstraintType, DesignDocument, FunctionalRequirement,
    GlossaryTerm, ObjectDesignPhase, OperationContract, PhaseOutput, Priority, ProjectPhase,
    QualityCategory, QualityRequirement, RequirementsSpecification, RequirementsUpdate,
    ReviewComment, Stakeholder, SystemDesignPhase, UseCase, ValidationPhase, AI_VALIDATOR,
};
pub use export::{export_bundle, slug, ExportOptions, ExportSummary};
pub use parsing::{
    extract_diagram, extract_json, is_valid_diagram, parse_chat_analysis,
    parse_requirements_analysis, DiagramKind, ParseFailure, ParseOutcome,
};
pub use patterns::{suggest_patterns, Likelihood, PatternCategory, PatternSuggestion};
pub use report::{compile_report, diagram_image_url, ReportOptions};
pub use schema::{
    validate_chat_analysis, validate_requirements_analysis, ChatAnalysisResponse,
    RequirementsAnalysisResponse, MIN_NARRATIVE_CHARS,
};
