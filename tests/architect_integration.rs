//! Orchestrator Integration Tests
//!
//! Drives design documents through the phase operations against a scripted
//! text generator.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use archwright::workflow::{
    start_project, AutomationEvent, AutomationStep, ChatOutcome, ParseFailure, PhaseOutput,
    AI_VALIDATOR,
};
use archwright::{
    ArchitectError, DesignArchitect, DesignDocument, ErrorKind, PhaseAutomation, ProjectPhase,
    Result, TextGenerator,
};

// ============================================================================
// Scripted generator
// ============================================================================

/// Hands out canned responses in order and records every prompt.
struct ScriptedGenerator {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(|s| (*s).to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, response: &str) {
        self.responses.lock().insert(0, response.to_string());
    }

    fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.responses.lock().pop().ok_or_else(|| ArchitectError::ai_generation("No content generated"))
    }

    async fn generate_with_parameters(
        &self,
        prompt: &str,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<String> {
        self.generate_text(prompt).await
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn architect(generator: &Arc<ScriptedGenerator>) -> DesignArchitect {
    DesignArchitect::new(Arc::clone(generator) as Arc<dyn TextGenerator>)
}

fn new_document() -> DesignDocument {
    start_project("alex", "Bookshop", "Online book store").unwrap()
}

const ONE_USE_CASE: &str = r#"{"reply": "X", "useCases": [{"id": "1", "title": "T", "narrative": "0123456789", "actors": ["A"]}]}"#;

const DOMAIN_MODEL: &str = "```mermaid\nclassDiagram\n    class Test\n```";
const ARCHITECTURE: &str = "graph TD\n    UI --> API\n    API --> DB";
const CLASS_DIAGRAM: &str = "```mermaid\nclassDiagram\n    class OrderService\n```";

async fn with_use_case(generator: &Arc<ScriptedGenerator>) -> DesignDocument {
    generator.push(ONE_USE_CASE);
    architect(generator)
        .analyze_chat(&new_document(), "Customers buy books")
        .await
        .unwrap()
        .into_parts()
        .0
}

// ============================================================================
// Chat analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_chat_advances_updated_at() {
    let generator = ScriptedGenerator::new(&[ONE_USE_CASE]);
    let before = new_document();

    let outcome = architect(&generator).analyze_chat(&before, "Customers buy books").await.unwrap();

    assert!(!outcome.is_degraded());
    assert!(outcome.document().updated_at > before.updated_at);
}

#[tokio::test]
async fn test_use_case_round_trip() {
    let generator = ScriptedGenerator::new(&[ONE_USE_CASE]);
    let outcome = architect(&generator).analyze_chat(&new_document(), "hello").await.unwrap();

    assert_eq!(outcome.reply(), "X");
    let use_cases = outcome.document().use_cases();
    assert_eq!(use_cases.len(), 1);
    assert_eq!(use_cases[0].title, "T");
    assert_eq!(use_cases[0].actors, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_short_narrative_degrades_with_schema_failure() {
    let generator = ScriptedGenerator::new(&[
        r#"{"reply": "X", "useCases": [{"id": "1", "title": "T", "narrative": "too short", "actors": ["A"]}]}"#,
    ]);
    let before = new_document();
    let outcome = architect(&generator).analyze_chat(&before, "hello").await.unwrap();

    match outcome {
        ChatOutcome::Degraded { document, reply, failure: ParseFailure::Schema(issues) } => {
            assert_eq!(document, before);
            assert_eq!(reply, archwright::workflow::ANALYSIS_FALLBACK_REPLY);
            assert!(issues.iter().any(|i| i.contains("narrative")));
        }
        other => panic!("expected schema degradation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_degrades_with_json_failure() {
    let generator = ScriptedGenerator::new(&["I'd love to help! Tell me more."]);
    let before = new_document();
    let outcome = architect(&generator).analyze_chat(&before, "hello").await.unwrap();

    assert!(matches!(outcome, ChatOutcome::Degraded { failure: ParseFailure::Json(_), .. }));
    assert_eq!(outcome.document(), &before);
}

#[tokio::test]
async fn test_fenced_json_is_accepted() {
    let generator = ScriptedGenerator::new(&[&format!("Here you go:\n```json\n{ONE_USE_CASE}\n```")]);
    let outcome = architect(&generator).analyze_chat(&new_document(), "hello").await.unwrap();
    assert!(!outcome.is_degraded());
}

#[tokio::test]
async fn test_requirements_flow_into_use_case_prompt() {
    let generator = ScriptedGenerator::new(&[
        r#"{"reply": "Noted", "projectPurpose": "Sell second-hand books", "functionalRequirements": [{"id": "FR1", "title": "Search catalogue", "description": "Find books by title", "priority": "high"}]}"#,
        ONE_USE_CASE,
    ]);
    let architect = architect(&generator);

    let (document, _) = architect
        .analyze_requirements_chat(&new_document(), "We sell used books")
        .await
        .unwrap()
        .into_parts();
    architect.analyze_chat(&document, "Customers search").await.unwrap();

    let prompt = generator.last_prompt();
    assert!(prompt.contains("Sell second-hand books"));
    assert!(prompt.contains("- Search catalogue (high): Find books by title"));
}

// ============================================================================
// Diagram phases
// ============================================================================

#[tokio::test]
async fn test_domain_model_requires_use_cases() {
    let generator = ScriptedGenerator::new(&[DOMAIN_MODEL]);
    let err = architect(&generator).generate_domain_model(&new_document()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.metadata()["useCaseCount"], 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_domain_model_strips_fence() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    generator.push(DOMAIN_MODEL);

    let updated = architect(&generator).generate_domain_model(&document).await.unwrap();
    assert_eq!(updated.domain_model(), Some("classDiagram\n    class Test"));
}

#[tokio::test]
async fn test_invalid_diagram_leaves_document_unchanged() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    generator.push(DOMAIN_MODEL);
    let architect = architect(&generator);
    let document = architect.generate_domain_model(&document).await.unwrap();

    generator.push("Sorry, here is a description of the model instead.");
    let err = architect.generate_domain_model(&document).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "Invalid Mermaid diagram generated");
    assert!(err.metadata().contains_key("generatedCode"));
    assert_eq!(document.domain_model(), Some("classDiagram\n    class Test"));
}

#[tokio::test]
async fn test_invalid_architecture_and_class_diagram_rejected() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await
        .apply(PhaseOutput::DomainModel("classDiagram\n  class A".to_string()), chrono::Utc::now());
    let architect = architect(&generator);

    generator.push("no diagram here");
    let err = architect.generate_system_architecture(&document).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(document.architecture(), None);

    generator.push(ARCHITECTURE);
    let document = architect.generate_system_architecture(&document).await.unwrap();

    generator.push("plain prose");
    let err = architect.generate_object_design(&document).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(document.class_diagram(), None);
}

#[tokio::test]
async fn test_object_design_requires_architecture() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator)
        .await
        .apply(PhaseOutput::DomainModel("classDiagram\n  class A".to_string()), chrono::Utc::now());
    let calls = generator.calls();
    generator.push(CLASS_DIAGRAM);

    let err = architect(&generator).generate_object_design(&document).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "System Architecture is required for Object Design");
    assert_eq!(err.metadata()["documentId"], document.id.as_str());
    assert_eq!(err.metadata()["currentPhase"], "requirementsSpec");
    assert_eq!(generator.calls(), calls);
}

#[tokio::test]
async fn test_validate_design_requires_class_diagram() {
    let generator = ScriptedGenerator::new(&[]);
    let mut document = with_use_case(&generator)
        .await
        .apply(PhaseOutput::DomainModel("classDiagram\n  class A".to_string()), chrono::Utc::now())
        .apply(PhaseOutput::Architecture(ARCHITECTURE.to_string()), chrono::Utc::now());
    document.current_phase = ProjectPhase::ObjectDesign;
    let calls = generator.calls();
    generator.push("looks fine");

    let err = architect(&generator).validate_design(&document).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "Object Design is required for Validation");
    assert_eq!(err.metadata()["documentId"], document.id.as_str());
    assert_eq!(err.metadata()["currentPhase"], "objectDesign");
    assert_eq!(generator.calls(), calls);
}

#[tokio::test]
async fn test_validate_design_is_append_only() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator)
        .await
        .apply(PhaseOutput::ClassDiagram("classDiagram\n  class A".to_string()), chrono::Utc::now());
    let architect = architect(&generator);

    generator.push("first review");
    let document = architect.validate_design(&document).await.unwrap();
    generator.push("second review");
    let document = architect.validate_design(&document).await.unwrap();

    let reviews = document.reviews();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|r| r.author == AI_VALIDATOR && !r.resolved));
    assert_eq!(reviews[0].content, "first review");
    assert_eq!(reviews[1].content, "second review");
    assert_ne!(reviews[0].id, reviews[1].id);
}

#[tokio::test]
async fn test_final_report_is_pure() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    let calls = generator.calls();
    let architect = architect(&generator);

    let first = architect.generate_final_report(&document);
    let second = architect.generate_final_report(&document);

    assert_eq!(first, second);
    assert_eq!(generator.calls(), calls);
    assert!(first.starts_with("# Design Document: Bookshop"));
    assert!(first.contains("- **T**: 0123456789"));
}

#[tokio::test]
async fn test_backend_failure_propagates() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;

    let err = architect(&generator).generate_domain_model(&document).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AiGeneration);
    assert!(err.is_retryable());
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_end_to_end_phase_gating() {
    let generator = ScriptedGenerator::new(&[]);
    let architect = architect(&generator);
    let empty = new_document();

    assert!(architect.generate_domain_model(&empty).await.is_err());

    generator.push(ONE_USE_CASE);
    let (document, _) = architect.analyze_chat(&empty, "Customers buy books").await.unwrap().into_parts();

    let err = architect.generate_system_architecture(&document).await.unwrap_err();
    assert_eq!(err.metadata()["currentPhase"], "requirementsSpec");

    generator.push(DOMAIN_MODEL);
    let document = architect.generate_domain_model(&document).await.unwrap();

    generator.push(ARCHITECTURE);
    let document = architect.generate_system_architecture(&document).await.unwrap();
    assert_eq!(document.architecture(), Some(ARCHITECTURE));
    assert_eq!(generator.calls(), 3);
}

// ============================================================================
// Automation
// ============================================================================

#[tokio::test]
async fn test_automation_runs_every_step() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    for response in [DOMAIN_MODEL, ARCHITECTURE, CLASS_DIAGRAM, "All use cases are covered."] {
        generator.push(response);
    }

    let mut started = Vec::new();
    let mut finished = Vec::new();
    let result = PhaseAutomation::new()
        .run(&architect(&generator), document, |event| match event {
            AutomationEvent::Started(progress) => started.push((progress.current, progress.total)),
            AutomationEvent::Finished { progress, document } => {
                finished.push((progress.step, document.current_phase));
            }
            AutomationEvent::Skipped(_) => panic!("nothing should be skipped"),
        })
        .await
        .unwrap();

    assert_eq!(started, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
    assert_eq!(finished.len(), 5);
    assert_eq!(finished[0], (AutomationStep::DomainModel, ProjectPhase::Analysis));
    assert_eq!(finished[4], (AutomationStep::Report, ProjectPhase::Completed));

    assert_eq!(result.current_phase, ProjectPhase::Completed);
    assert!(result.system_design.as_ref().unwrap().completed);
    assert!(result.object_design.as_ref().unwrap().completed);
    let validation = result.validation.as_ref().unwrap();
    assert_eq!(validation.reviews.len(), 1);
    assert!(validation.report_generated_at.is_some());
    let report = validation.generated_report.as_deref().unwrap();
    assert!(report.contains("All use cases are covered."));
}

#[tokio::test]
async fn test_automation_skips_existing_domain_model() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator)
        .await
        .apply(PhaseOutput::DomainModel("classDiagram\n  class Book".to_string()), chrono::Utc::now());
    for response in [ARCHITECTURE, CLASS_DIAGRAM, "ok"] {
        generator.push(response);
    }

    let mut skipped = Vec::new();
    let result = PhaseAutomation::new()
        .run(&architect(&generator), document, |event| {
            if let AutomationEvent::Skipped(progress) = event {
                skipped.push(progress.step);
            }
        })
        .await
        .unwrap();

    assert_eq!(skipped, vec![AutomationStep::DomainModel]);
    assert_eq!(result.domain_model(), Some("classDiagram\n  class Book"));
}

#[tokio::test]
async fn test_automation_stops_at_failing_step() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    generator.push(DOMAIN_MODEL);
    generator.push("not a diagram");

    let mut saved = Vec::new();
    let err = PhaseAutomation::new()
        .run(&architect(&generator), document, |event| {
            if let AutomationEvent::Finished { document, .. } = event {
                saved.push(document.clone());
            }
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].domain_model(), Some("classDiagram\n    class Test"));
}

#[tokio::test]
async fn test_automation_resumes_after_failed_step() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    generator.push(DOMAIN_MODEL);
    generator.push(ARCHITECTURE);
    generator.push("not a diagram");
    let architect = architect(&generator);

    let mut saved = None;
    PhaseAutomation::new()
        .run(&architect, document, |event| {
            if let AutomationEvent::Finished { document, .. } = event {
                saved = Some(document.clone());
            }
        })
        .await
        .unwrap_err();
    let saved = saved.unwrap();
    assert_eq!(saved.current_phase, ProjectPhase::SystemDesign);

    for response in [ARCHITECTURE, CLASS_DIAGRAM, "Resumed review"] {
        generator.push(response);
    }
    let mut skipped = Vec::new();
    let result = PhaseAutomation::new()
        .run(&architect, saved, |event| {
            if let AutomationEvent::Skipped(progress) = event {
                skipped.push(progress.step);
            }
        })
        .await
        .unwrap();

    assert_eq!(skipped, vec![AutomationStep::DomainModel]);
    assert_eq!(result.current_phase, ProjectPhase::Completed);
    assert_eq!(result.class_diagram(), Some("classDiagram\n    class OrderService"));
    assert_eq!(result.reviews().len(), 1);
}

#[tokio::test]
async fn test_automation_reruns_completed_document() {
    let generator = ScriptedGenerator::new(&[]);
    let document = with_use_case(&generator).await;
    for response in [DOMAIN_MODEL, ARCHITECTURE, CLASS_DIAGRAM, "First review"] {
        generator.push(response);
    }
    let architect = architect(&generator);
    let completed = PhaseAutomation::new().run(&architect, document, |_| {}).await.unwrap();
    assert_eq!(completed.current_phase, ProjectPhase::Completed);

    for response in [ARCHITECTURE, CLASS_DIAGRAM, "Second review"] {
        generator.push(response);
    }
    let mut phases = Vec::new();
    let rerun = PhaseAutomation::new()
        .run(&architect, completed.clone(), |event| {
            if let AutomationEvent::Finished { document, .. } = event {
                phases.push(document.current_phase);
            }
        })
        .await
        .unwrap();

    assert!(phases.iter().all(|phase| *phase == ProjectPhase::Completed));
    assert_eq!(rerun.current_phase, ProjectPhase::Completed);
    assert_eq!(rerun.reviews().len(), 2);
    let validation = rerun.validation.as_ref().unwrap();
    assert!(validation.generated_report.as_deref().unwrap().contains("Second review"));
    assert_eq!(validation.report_generated_at, Some(rerun.updated_at));
    assert!(rerun.updated_at > completed.updated_at);
}
