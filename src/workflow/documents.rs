//! Design document structures.
//!
//! A [`DesignDocument`] is the root aggregate of one design project. Each
//! workflow phase owns an optional sub-record that is populated once that
//! phase's generation step has run.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Author label for reviews produced by the validation phase.
pub const AI_VALIDATOR: &str = "AI Validator";

/// Workflow phase, ordered by dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectPhase {
    RequirementsSpec,
    Analysis,
    SystemDesign,
    ObjectDesign,
    Validation,
    Completed,
}

impl ProjectPhase {
    /// Stable identifier as stored in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequirementsSpec => "requirementsSpec",
            Self::Analysis => "analysis",
            Self::SystemDesign => "systemDesign",
            Self::ObjectDesign => "objectDesign",
            Self::Validation => "validation",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Design document - one per project, owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    /// Document identity
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Project name
    pub project_name: String,

    /// Free-text project description
    pub description: String,

    /// Phase the workflow is currently in
    pub current_phase: ProjectPhase,

    /// Phase 0: requirements specification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements_spec: Option<RequirementsSpecification>,

    /// Phase 1: analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisPhase>,

    /// Phase 2: system design
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_design: Option<SystemDesignPhase>,

    /// Phase 3: object design
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_design: Option<ObjectDesignPhase>,

    /// Phase 4: validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationPhase>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Analysis phase sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisPhase {
    pub use_cases: Vec<UseCase>,
    pub domain_model_mermaid: String,
    pub glossary: Vec<GlossaryTerm>,
    pub completed: bool,
}

/// System design phase sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemDesignPhase {
    /// Package/architecture diagram
    pub architecture_diagram_mermaid: String,
    pub subsystems: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_diagram_mermaid: Option<String>,
    pub completed: bool,
}

/// Object design phase sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDesignPhase {
    pub class_diagram_mermaid: String,
    pub sequence_diagrams_mermaid: Vec<String>,
    pub contracts: Vec<OperationContract>,
    pub completed: bool,
}

/// Validation phase sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationPhase {
    /// Append-only review log
    pub reviews: Vec<ReviewComment>,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_generated_at: Option<DateTime<Utc>>,
}

/// A functional use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCase {
    pub id: String,
    pub title: String,
    /// Multi-sentence textual description
    pub narrative: String,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContract {
    pub operation: String,
    pub pre_conditions: Vec<String>,
    pub post_conditions: Vec<String>,
}

/// A review entry. Appended, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

/// Requirements specification sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequirementsSpecification {
    pub project_purpose: String,
    pub stakeholders: Vec<Stakeholder>,
    pub constraints: Vec<Constraint>,
    pub functional_requirements: Vec<FunctionalRequirement>,
    pub quality_requirements: Vec<QualityRequirement>,
    pub completed: bool,
}

impl RequirementsSpecification {
    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.project_purpose.trim().is_empty()
            && self.stakeholders.is_empty()
            && self.constraints.is_empty()
            && self.functional_requirements.is_empty()
            && self.quality_requirements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    Technical,
    Business,
    Regulatory,
    Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalRequirement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRequirement {
    pub id: String,
    pub category: QualityCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityCategory {
    Performance,
    Security,
    Usability,
    Maintainability,
    Reliability,
}

impl fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityCategory::Performance => write!(f, "performance"),
            QualityCategory::Security => write!(f, "security"),
            QualityCategory::Usability => write!(f, "usability"),
            QualityCategory::Maintainability => write!(f, "maintainability"),
            QualityCategory::Reliability => write!(f, "reliability"),
        }
    }
}

/// Requirements fields extracted from one chat turn.
///
/// `None` means the backend did not mention the field; the prior value is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementsUpdate {
    pub project_purpose: Option<String>,
    pub stakeholders: Option<Vec<Stakeholder>>,
    pub constraints: Option<Vec<Constraint>>,
    pub functional_requirements: Option<Vec<FunctionalRequirement>>,
    pub quality_requirements: Option<Vec<QualityRequirement>>,
}

/// The artifact produced by one successful phase step.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutput {
    Requirements(RequirementsUpdate),
    UseCases(Vec<UseCase>),
    DomainModel(String),
    Architecture(String),
    ClassDiagram(String),
    Review(ReviewComment),
}

impl DesignDocument {
    /// Create a fresh document at the requirements phase.
    ///
    /// The analysis record starts empty so use cases can be gathered right away.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        project_name: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            project_name: project_name.into(),
            description: description.into(),
            current_phase: ProjectPhase::RequirementsSpec,
            requirements_spec: Some(RequirementsSpecification::default()),
            analysis: Some(AnalysisPhase::default()),
            system_design: None,
            object_design: None,
            validation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp `updated_at`, always moving it strictly forward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at =
            if now > self.updated_at { now } else { self.updated_at + Duration::milliseconds(1) };
    }

    /// Use cases captured so far.
    pub fn use_cases(&self) -> &[UseCase] {
        self.analysis.as_ref().map(|a| a.use_cases.as_slice()).unwrap_or(&[])
    }

    /// Domain model diagram, if generated.
    pub fn domain_model(&self) -> Option<&str> {
        self.analysis.as_ref().map(|a| a.domain_model_mermaid.as_str()).filter(|s| !s.is_empty())
    }

    /// Architecture diagram, if generated.
    pub fn architecture(&self) -> Option<&str> {
        self.system_design
            .as_ref()
            .map(|s| s.architecture_diagram_mermaid.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Class diagram, if generated.
    pub fn class_diagram(&self) -> Option<&str> {
        self.object_design
            .as_ref()
            .map(|o| o.class_diagram_mermaid.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Reviews in the order they were appended.
    pub fn reviews(&self) -> &[ReviewComment] {
        self.validation.as_ref().map(|v| v.reviews.as_slice()).unwrap_or(&[])
    }

    /// Most recent review written by the AI validator.
    pub fn latest_ai_review(&self) -> Option<&ReviewComment> {
        self.reviews().iter().rev().find(|r| r.author == AI_VALIDATOR)
    }

    /// Apply a phase output and stamp the document.
    ///
    /// Sub-records missing for the target phase are created with defaults.
    pub fn apply(mut self, output: PhaseOutput, now: DateTime<Utc>) -> Self {
        match output {
            PhaseOutput::Requirements(update) => {
                let spec = self.requirements_spec.get_or_insert_with(Default::default);
                if let Some(purpose) = update.project_purpose.filter(|p| !p.trim().is_empty()) {
                    spec.project_purpose = purpose;
                }
                if let Some(stakeholders) = update.stakeholders {
                    spec.stakeholders = stakeholders;
                }
                if let Some(constraints) = update.constraints {
                    spec.constraints = constraints;
                }
                if let Some(functional) = update.functional_requirements {
                    spec.functional_requirements = functional;
                }
                if let Some(quality) = update.quality_requirements {
                    spec.quality_requirements = quality;
                }
            }
            PhaseOutput::UseCases(incoming) => {
                let analysis = self.analysis.get_or_insert_with(Default::default);
                merge_use_cases(&mut analysis.use_cases, incoming);
            }
            PhaseOutput::DomainModel(diagram) => {
                self.analysis.get_or_insert_with(Default::default).domain_model_mermaid = diagram;
            }
            PhaseOutput::Architecture(diagram) => {
                self.system_design.get_or_insert_with(Default::default).architecture_diagram_mermaid =
                    diagram;
            }
            PhaseOutput::ClassDiagram(diagram) => {
                self.object_design.get_or_insert_with(Default::default).class_diagram_mermaid =
                    diagram;
            }
            PhaseOutput::Review(review) => {
                self.validation.get_or_insert_with(Default::default).reviews.push(review);
            }
        }

        self.touch(now);
        self
    }
}

/// Merge use cases by id: matching ids are replaced, new ids appended.
fn merge_use_cases(existing: &mut Vec<UseCase>, incoming: Vec<UseCase>) {
    for use_case in incoming {
        match existing.iter_mut().find(|uc| uc.id == use_case.id) {
            Some(slot) => *slot = use_case,
            None => existing.push(use_case),
        }
    }
}
