//! Phase orchestrator.
//!
//! [`DesignArchitect`] runs one operation per phase: check preconditions,
//! build the prompt, call the backend once, parse, and return an updated
//! copy of the document. The caller's document is never modified, so a
//! failed operation leaves it exactly as it was.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::documents::{DesignDocument, PhaseOutput, ReviewComment, ValidationPhase, AI_VALIDATOR};
use super::parsing::{
    extract_diagram, parse_chat_analysis, parse_requirements_analysis, DiagramKind, ParseFailure,
    ParseOutcome,
};
use super::prompts;
use super::report::{compile_report, ReportOptions};
use crate::ai::{GenerationParams, TextGenerator};
use crate::core::{ArchitectError, Result};

/// Reply used when a use-case response cannot be used.
pub const ANALYSIS_FALLBACK_REPLY: &str =
    "I had trouble processing the design updates, but I'm still listening.";

/// Reply used when a requirements response cannot be used.
pub const REQUIREMENTS_FALLBACK_REPLY: &str =
    "I had trouble processing the requirements, but I'm still listening.";

/// Result of a chat-style operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// The response was valid and merged.
    Updated { document: DesignDocument, reply: String },
    /// The response was unusable; the document is unchanged.
    Degraded { document: DesignDocument, reply: String, failure: ParseFailure },
}

impl ChatOutcome {
    pub fn document(&self) -> &DesignDocument {
        match self {
            Self::Updated { document, .. } | Self::Degraded { document, .. } => document,
        }
    }

    pub fn reply(&self) -> &str {
        match self {
            Self::Updated { reply, .. } | Self::Degraded { reply, .. } => reply,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn into_parts(self) -> (DesignDocument, String) {
        match self {
            Self::Updated { document, reply } | Self::Degraded { document, reply, .. } => {
                (document, reply)
            }
        }
    }
}

/// Drives a design document through its phases.
pub struct DesignArchitect {
    generator: Arc<dyn TextGenerator>,
    params: Option<GenerationParams>,
    report_options: ReportOptions,
}

impl DesignArchitect {
    /// Create an architect backed by the given generator.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, params: None, report_options: ReportOptions::default() }
    }

    /// Use per-call sampling overrides for every backend call.
    pub fn with_parameters(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report_options = options;
        self
    }

    /// Name of the backing generator.
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Create a new project document. No backend call.
    pub fn start_project(
        &self,
        user_id: &str,
        project_name: &str,
        description: &str,
    ) -> Result<DesignDocument> {
        start_project(user_id, project_name, description)
    }

    /// Phase 0: extract requirements from a chat message.
    pub async fn analyze_requirements_chat(
        &self,
        document: &DesignDocument,
        chat_input: &str,
    ) -> Result<ChatOutcome> {
        if document.requirements_spec.is_none() {
            return Err(precondition("Requirements phase not initialized", document));
        }
        require_chat_input(chat_input, document)?;

        let prompt = prompts::requirements_extraction_prompt(chat_input);
        let raw = self.generate(&prompt).await?;

        Ok(match parse_requirements_analysis(&raw) {
            ParseOutcome::Valid(parsed) => ChatOutcome::Updated {
                document: document.clone().apply(PhaseOutput::Requirements(parsed.update), Utc::now()),
                reply: parsed.reply,
            },
            ParseOutcome::Malformed(failure) => {
                degraded(document, REQUIREMENTS_FALLBACK_REPLY, failure, "requirements")
            }
        })
    }

    /// Analysis chat: extract and merge use cases.
    pub async fn analyze_chat(
        &self,
        document: &DesignDocument,
        chat_input: &str,
    ) -> Result<ChatOutcome> {
        let Some(analysis) = &document.analysis else {
            return Err(precondition("Analysis phase not initialized", document));
        };
        require_chat_input(chat_input, document)?;

        let requirements_context =
            document.requirements_spec.as_ref().and_then(prompts::render_requirements_context);
        let prompt = prompts::use_case_extraction_prompt(chat_input, requirements_context.as_deref());
        let raw = self.generate(&prompt).await?;

        Ok(match parse_chat_analysis(&raw) {
            ParseOutcome::Valid(parsed) => {
                let incoming = parsed.use_cases.len();
                let updated =
                    document.clone().apply(PhaseOutput::UseCases(parsed.use_cases), Utc::now());
                tracing::info!(
                    document_id = %document.id,
                    incoming,
                    before = analysis.use_cases.len(),
                    after = updated.use_cases().len(),
                    "merged use cases"
                );
                ChatOutcome::Updated { document: updated, reply: parsed.reply }
            }
            ParseOutcome::Malformed(failure) => {
                degraded(document, ANALYSIS_FALLBACK_REPLY, failure, "analysis")
            }
        })
    }

    /// Generate the domain model from the use cases.
    pub async fn generate_domain_model(&self, document: &DesignDocument) -> Result<DesignDocument> {
        let use_cases = document.use_cases();
        if use_cases.is_empty() {
            return Err(precondition("At least one use case is required for the Domain Model", document)
                .with_meta("useCaseCount", 0));
        }

        let prompt = prompts::domain_model_prompt(use_cases);
        let code = self.generate_diagram(&prompt, DiagramKind::DomainModel, document).await?;
        Ok(document.clone().apply(PhaseOutput::DomainModel(code), Utc::now()))
    }

    /// Generate the system architecture from the domain model.
    pub async fn generate_system_architecture(
        &self,
        document: &DesignDocument,
    ) -> Result<DesignDocument> {
        let Some(domain_model) = document.domain_model() else {
            return Err(precondition("Domain Model is required for System Design", document));
        };

        let requirements = architecture_requirements(document);
        let prompt = prompts::architecture_prompt(domain_model, requirements.as_deref());
        let code = self.generate_diagram(&prompt, DiagramKind::Architecture, document).await?;
        Ok(document.clone().apply(PhaseOutput::Architecture(code), Utc::now()))
    }

    /// Generate the class diagram from the domain model and architecture.
    pub async fn generate_object_design(&self, document: &DesignDocument) -> Result<DesignDocument> {
        let Some(architecture) = document.architecture() else {
            return Err(precondition("System Architecture is required for Object Design", document));
        };

        let prompt = prompts::class_diagram_prompt(document.domain_model(), architecture);
        let code = self.generate_diagram(&prompt, DiagramKind::ClassDiagram, document).await?;
        Ok(document.clone().apply(PhaseOutput::ClassDiagram(code), Utc::now()))
    }

    /// Append an AI traceability review.
    pub async fn validate_design(&self, document: &DesignDocument) -> Result<DesignDocument> {
        let Some(class_diagram) = document.class_diagram() else {
            return Err(precondition("Object Design is required for Validation", document));
        };
        let use_cases = document.use_cases();
        if use_cases.is_empty() {
            return Err(precondition("Use Cases are required for Validation", document)
                .with_meta("useCaseCount", 0));
        }

        let prompt = prompts::validation_prompt(use_cases, class_diagram);
        let content = self.generate(&prompt).await?;

        let now = Utc::now();
        let review = ReviewComment {
            id: Uuid::new_v4().to_string(),
            author: AI_VALIDATOR.to_string(),
            content,
            timestamp: now,
            resolved: false,
        };

        let mut updated = document.clone();
        updated.validation.get_or_insert_with(ValidationPhase::default);
        let updated = updated.apply(PhaseOutput::Review(review), now);
        tracing::info!(document_id = %document.id, reviews = updated.reviews().len(), "design validated");
        Ok(updated)
    }

    /// Compile the Markdown report. Pure; never calls the backend.
    pub fn generate_final_report(&self, document: &DesignDocument) -> String {
        compile_report(document, &self.report_options)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(provider = self.generator.name(), prompt_chars = prompt.len(), "calling generator");
        match self.params {
            Some(params) => {
                self.generator
                    .generate_with_parameters(prompt, params.temperature, params.max_tokens)
                    .await
            }
            None => self.generator.generate_text(prompt).await,
        }
    }

    async fn generate_diagram(
        &self,
        prompt: &str,
        kind: DiagramKind,
        document: &DesignDocument,
    ) -> Result<String> {
        let raw = self.generate(prompt).await?;
        let code = extract_diagram(&raw, kind)
            .map_err(|e| e.with_meta("documentId", document.id.as_str()))?;
        tracing::info!(document_id = %document.id, diagram = %kind, lines = code.lines().count(), "diagram generated");
        Ok(code)
    }
}

/// Create a new project document at the analysis phase.
pub fn start_project(user_id: &str, project_name: &str, description: &str) -> Result<DesignDocument> {
    if project_name.trim().is_empty() {
        return Err(ArchitectError::validation("Project name is required").with_meta("userId", user_id));
    }
    if user_id.trim().is_empty() {
        return Err(ArchitectError::validation("User id is required"));
    }

    let document = DesignDocument::new(
        Uuid::new_v4().to_string(),
        user_id,
        project_name.trim(),
        description.trim(),
        Utc::now(),
    );
    tracing::info!(document_id = %document.id, project = %document.project_name, "started project");
    Ok(document)
}

/// Description plus captured requirements, if any.
fn architecture_requirements(document: &DesignDocument) -> Option<String> {
    let mut parts = Vec::new();
    if !document.description.trim().is_empty() {
        parts.push(document.description.trim().to_string());
    }
    if let Some(context) =
        document.requirements_spec.as_ref().and_then(prompts::render_requirements_context)
    {
        parts.push(context);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

fn precondition(message: &str, document: &DesignDocument) -> ArchitectError {
    ArchitectError::validation(message)
        .with_meta("documentId", document.id.as_str())
        .with_meta("currentPhase", document.current_phase.as_str())
}

fn require_chat_input(chat_input: &str, document: &DesignDocument) -> Result<()> {
    if chat_input.trim().is_empty() {
        return Err(ArchitectError::validation("Chat input must not be empty")
            .with_meta("documentId", document.id.as_str()));
    }
    Ok(())
}

fn degraded(
    document: &DesignDocument,
    fallback: &str,
    failure: ParseFailure,
    phase: &str,
) -> ChatOutcome {
    tracing::warn!(document_id = %document.id, phase, failure = %failure, "unusable model response, replying with fallback");
    ChatOutcome::Degraded { document: document.clone(), reply: fallback.to_string(), failure }
}
