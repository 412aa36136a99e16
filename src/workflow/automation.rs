//! Automated phase sequence.
//!
//! Runs the remaining generation steps in dependency order and finishes with
//! the compiled report. Each step is a single orchestrator call; the first
//! error aborts the run.

use std::fmt;

use chrono::Utc;

use super::architect::DesignArchitect;
use super::documents::{DesignDocument, ProjectPhase};
use crate::core::{ArchitectError, Result};

/// Steps of an automated run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutomationStep {
    DomainModel,
    SystemDesign,
    ObjectDesign,
    Validation,
    Report,
}

impl AutomationStep {
    pub const ALL: [AutomationStep; 5] = [
        AutomationStep::DomainModel,
        AutomationStep::SystemDesign,
        AutomationStep::ObjectDesign,
        AutomationStep::Validation,
        AutomationStep::Report,
    ];

    /// 1-based position.
    pub fn index(&self) -> usize {
        match self {
            Self::DomainModel => 1,
            Self::SystemDesign => 2,
            Self::ObjectDesign => 3,
            Self::Validation => 4,
            Self::Report => 5,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::DomainModel => "Generating domain model...",
            Self::SystemDesign => "Designing system architecture...",
            Self::ObjectDesign => "Creating class diagrams...",
            Self::Validation => "Validating design...",
            Self::Report => "Generating final report...",
        }
    }

    /// Phase the document is in while this step runs.
    pub fn phase(&self) -> ProjectPhase {
        match self {
            Self::DomainModel => ProjectPhase::Analysis,
            Self::SystemDesign => ProjectPhase::SystemDesign,
            Self::ObjectDesign => ProjectPhase::ObjectDesign,
            Self::Validation | Self::Report => ProjectPhase::Validation,
        }
    }
}

impl fmt::Display for AutomationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DomainModel => "domainModel",
            Self::SystemDesign => "systemDesign",
            Self::ObjectDesign => "objectDesign",
            Self::Validation => "validation",
            Self::Report => "report",
        };
        f.write_str(name)
    }
}

/// Progress of an automated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationProgress {
    pub step: AutomationStep,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl From<AutomationStep> for AutomationProgress {
    fn from(step: AutomationStep) -> Self {
        Self {
            step,
            current: step.index(),
            total: AutomationStep::ALL.len(),
            message: step.message().to_string(),
        }
    }
}

/// Callback payload.
#[derive(Debug)]
pub enum AutomationEvent<'a> {
    /// A step is about to run.
    Started(AutomationProgress),
    /// A step finished; `document` holds its result.
    Finished { progress: AutomationProgress, document: &'a DesignDocument },
    /// The step had nothing to do.
    Skipped(AutomationProgress),
}

/// Move the document forward to `target`.
///
/// Moving to the current phase is a no-op; moving backward is rejected.
pub fn advance_phase(document: DesignDocument, target: ProjectPhase) -> Result<DesignDocument> {
    if target < document.current_phase {
        return Err(ArchitectError::validation(format!(
            "Cannot move from {} back to {}",
            document.current_phase, target
        ))
        .with_meta("documentId", document.id.as_str())
        .with_meta("currentPhase", document.current_phase.as_str())
        .with_meta("targetPhase", target.as_str()));
    }
    if target == document.current_phase {
        return Ok(document);
    }

    let mut document = document;
    document.current_phase = target;
    document.touch(Utc::now());
    Ok(document)
}

/// Runs every remaining phase in order.
#[derive(Debug, Clone, Default)]
pub struct PhaseAutomation {
    regenerate_domain_model: bool,
}

impl PhaseAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regenerate the domain model even when one exists.
    pub fn regenerate_domain_model(mut self, regenerate: bool) -> Self {
        self.regenerate_domain_model = regenerate;
        self
    }

    /// Run domain model, architecture, object design, validation, and report.
    ///
    /// The phase only moves forward, so a partially automated or completed
    /// document can be run again.
    pub async fn run<F>(
        &self,
        architect: &DesignArchitect,
        document: DesignDocument,
        mut on_progress: F,
    ) -> Result<DesignDocument>
    where
        F: FnMut(AutomationEvent<'_>),
    {
        let mut document = document;

        for step in AutomationStep::ALL {
            // Resumed or finished documents stay where they are
            if step.phase() > document.current_phase {
                document = advance_phase(document, step.phase())?;
            }

            if step == AutomationStep::DomainModel
                && document.domain_model().is_some()
                && !self.regenerate_domain_model
            {
                tracing::debug!(document_id = %document.id, "domain model present, skipping");
                on_progress(AutomationEvent::Skipped(step.into()));
                continue;
            }

            on_progress(AutomationEvent::Started(step.into()));
            document = self.run_step(architect, &document, step).await.map_err(|e| {
                tracing::warn!(document_id = %document.id, step = %step, error = %e, "automation step failed");
                e
            })?;
            on_progress(AutomationEvent::Finished { progress: step.into(), document: &document });
        }

        tracing::info!(document_id = %document.id, "automation complete");
        Ok(document)
    }

    async fn run_step(
        &self,
        architect: &DesignArchitect,
        document: &DesignDocument,
        step: AutomationStep,
    ) -> Result<DesignDocument> {
        match step {
            AutomationStep::DomainModel => {
                let mut updated = architect.generate_domain_model(document).await?;
                if let Some(analysis) = updated.analysis.as_mut() {
                    analysis.completed = true;
                }
                Ok(updated)
            }
            AutomationStep::SystemDesign => {
                let mut updated = architect.generate_system_architecture(document).await?;
                if let Some(system_design) = updated.system_design.as_mut() {
                    system_design.completed = true;
                }
                Ok(updated)
            }
            AutomationStep::ObjectDesign => {
                let mut updated = architect.generate_object_design(document).await?;
                if let Some(object_design) = updated.object_design.as_mut() {
                    object_design.completed = true;
                }
                Ok(updated)
            }
            AutomationStep::Validation => architect.validate_design(document).await,
            AutomationStep::Report => {
                let report = architect.generate_final_report(document);

                let mut updated = document.clone();
                updated.current_phase = ProjectPhase::Completed;
                updated.touch(Utc::now());
                let generated_at = updated.updated_at;
                let validation = updated.validation.get_or_insert_with(Default::default);
                validation.generated_report = Some(report);
                validation.report_generated_at = Some(generated_at);
                Ok(updated)
            }
        }
    }
}
