//! Prompt builders.
//!
//! One pure function per phase. Builders never fail: absent optional input is
//! rendered as [`NOT_PROVIDED`] so the model never sees an empty section.

use super::documents::{RequirementsSpecification, UseCase};

/// Placeholder for optional inputs that are missing.
pub const NOT_PROVIDED: &str = "(not provided)";

const LANGUAGE_RULES: &str = r"LANGUAGE:
- ADAPT TO THE USER'S LANGUAGE. Write the `reply` in the same language the user writes in.
- Keep JSON keys in English exactly as specified below.";

const PROACTIVE_RULES: &str = r"CONVERSATION STYLE:
- Be PROACTIVE. When information is sparse or vague, do not stop at summarizing.
- Ask one or two LEADING questions that move the design forward (actors, edge cases, constraints).
- Keep the reply short and friendly.";

/// Prompt for phase 0: extract requirements from a chat message.
pub fn requirements_extraction_prompt(chat_log: &str) -> String {
    format!(
        r#"You are a senior requirements engineer helping a user write a requirements specification.
Analyze the conversation below and extract structured requirements.

CONVERSATION:
{chat_log}

{LANGUAGE_RULES}

{PROACTIVE_RULES}

OUTPUT FORMAT:
Respond with a single JSON object and nothing else:
{{
  "reply": "your conversational answer to the user",
  "projectPurpose": "one-paragraph purpose statement (omit if unknown)",
  "stakeholders": [{{"id": "s1", "name": "...", "role": "...", "interests": ["..."]}}],
  "constraints": [{{"id": "c1", "type": "technical|business|regulatory|schedule", "description": "..."}}],
  "functionalRequirements": [{{"id": "fr1", "title": "...", "description": "...", "priority": "high|medium|low"}}],
  "qualityRequirements": [{{"id": "qr1", "category": "performance|security|usability|maintainability|reliability", "description": "...", "metric": "optional measurable target"}}]
}}
Omit any list you have nothing to say about. When you include a list, include the complete list, not only new items."#
    )
}

/// Prompt for the analysis chat: extract use cases.
pub fn use_case_extraction_prompt(chat_log: &str, requirements_context: Option<&str>) -> String {
    let requirements = requirements_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NOT_PROVIDED);

    format!(
        r#"You are an expert software analyst applying use-case driven object-oriented analysis.
Analyze the user's message and identify the functional use cases of the system.

EXISTING REQUIREMENTS:
{requirements}

USER MESSAGE:
{chat_log}

{LANGUAGE_RULES}

{PROACTIVE_RULES}

OUTPUT FORMAT:
Respond with a single JSON object and nothing else:
{{
  "reply": "your conversational answer to the user",
  "useCases": [
    {{
      "id": "uc1",
      "title": "short verb phrase",
      "narrative": "several sentences describing the main success scenario",
      "actors": ["primary actor", "..."]
    }}
  ]
}}
Reuse the id of a use case you are refining. Every use case needs at least one actor and a narrative of at least two sentences."#
    )
}

/// Prompt for the domain model diagram.
pub fn domain_model_prompt(use_cases: &[UseCase]) -> String {
    let serialized = serde_json::to_string_pretty(use_cases).unwrap_or_else(|_| "[]".to_string());
    let titles = if use_cases.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        use_cases
            .iter()
            .map(|uc| format!("- {}: {}", uc.title, uc.narrative))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r"You are a domain modelling expert. Create a Domain Model (conceptual class model) from these use cases.

USE CASES:
{titles}

USE CASES (JSON):
{serialized}

INSTRUCTIONS:
- Identify the conceptual classes (entities) named or implied by the use cases.
- Give each entity its key attributes. No methods at this level.
- Show the relationships between entities with multiplicities and short association names.

OUTPUT:
Return only Mermaid `classDiagram` code inside a ```mermaid fenced block."
    )
}

/// Prompt for the system architecture diagram.
pub fn architecture_prompt(domain_model: &str, requirements: Option<&str>) -> String {
    let domain_model = non_empty_or_placeholder(domain_model);
    let requirements = requirements.map(non_empty_or_placeholder).unwrap_or(NOT_PROVIDED);

    format!(
        r"You are a software architect. Design the System Architecture for the domain model below.

DOMAIN MODEL:
{domain_model}

REQUIREMENTS AND DESCRIPTION:
{requirements}

INSTRUCTIONS:
- Choose a decomposition style that fits: Layered (presentation, application, domain, infrastructure) or Microservices.
- Identify the subsystems and the dependencies between them.
- Group domain entities into the subsystems that own them.

OUTPUT:
Return only Mermaid `graph TD` or `flowchart` code inside a ```mermaid fenced block."
    )
}

/// Prompt for the detailed class diagram.
pub fn class_diagram_prompt(domain_model: Option<&str>, architecture: &str) -> String {
    let domain_model = domain_model.map(non_empty_or_placeholder).unwrap_or(NOT_PROVIDED);
    let architecture = non_empty_or_placeholder(architecture);

    format!(
        r"You are an object design expert. Produce a Design Class Diagram.

DOMAIN MODEL:
{domain_model}

SYSTEM ARCHITECTURE:
{architecture}

INSTRUCTIONS:
- Refine the domain entities into design classes and add controller, service and repository classes where the architecture calls for them.
- Give every class its attributes with types and its methods with parameters and return types.
- Mark visibility on every member (+ public, - private, # protected).
- Apply GRASP (Information Expert, Creator, Controller, Low Coupling, High Cohesion) and SOLID principles.
- Aim for high Cohesion and low Coupling; prefer interfaces at subsystem boundaries.

OUTPUT:
Return only Mermaid `classDiagram` code inside a ```mermaid fenced block."
    )
}

/// Prompt for the validation report.
pub fn validation_prompt(use_cases: &[UseCase], class_diagram: &str) -> String {
    let use_case_list = if use_cases.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        use_cases
            .iter()
            .map(|uc| format!("- [{}] {}: {}", uc.id, uc.title, uc.narrative))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let class_diagram = non_empty_or_placeholder(class_diagram);

    format!(
        r"You are a software quality reviewer. Check the Traceability between the use cases and the class design.

USE CASES:
{use_case_list}

CLASS DIAGRAM:
{class_diagram}

Write a Markdown report with these sections:
1. **Traceability Matrix** - a table mapping every use case to the classes and methods that realize it.
2. **Gaps** - use cases with no or partial coverage, and classes no use case needs.
3. **Design Quality** - comments on cohesion, coupling and responsibility assignment.
4. **Quality Score** - an overall score from 0 to 100 with a one-line justification.

Return only the Markdown report."
    )
}

/// Render requirements as context for use-case extraction.
///
/// Returns `None` when nothing has been captured.
pub fn render_requirements_context(spec: &RequirementsSpecification) -> Option<String> {
    if spec.is_empty() {
        return None;
    }

    let purpose = non_empty_or_placeholder(&spec.project_purpose);
    let functional = if spec.functional_requirements.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        spec.functional_requirements
            .iter()
            .map(|fr| format!("- {} ({}): {}", fr.title, fr.priority, fr.description))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let quality = if spec.quality_requirements.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        spec.quality_requirements
            .iter()
            .map(|qr| format!("- {}: {}", qr.category, qr.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Some(format!(
        "Purpose: {purpose}\n\nFunctional Requirements:\n{functional}\n\nQuality Requirements:\n{quality}"
    ))
}

fn non_empty_or_placeholder(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NOT_PROVIDED
    } else {
        trimmed
    }
}
