//! Response parsing.
//!
//! Turns raw model text into validated data. JSON responses soft-fail into
//! [`ParseOutcome::Malformed`]; diagram responses hard-fail with a
//! validation error because a bad diagram cannot be silently substituted.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::schema::{
    validate_chat_analysis, validate_requirements_analysis, ChatAnalysisResponse,
    RequirementsAnalysisResponse,
};
use crate::core::{ArchitectError, Result};

/// Characters of offending output kept in error metadata.
pub const SNIPPET_CHARS: usize = 200;

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)```").expect("valid json fence pattern"));

static MERMAID_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```mermaid([\s\S]*?)```").expect("valid mermaid fence pattern"));

static DIAGRAM_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(graph|classDiagram|sequenceDiagram|flowchart|stateDiagram|erDiagram)")
        .expect("valid diagram pattern")
});

/// Which diagram a phase produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    DomainModel,
    Architecture,
    ClassDiagram,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 3] =
        [DiagramKind::DomainModel, DiagramKind::Architecture, DiagramKind::ClassDiagram];

    /// Phase label used in error metadata.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::DomainModel => "domainModel",
            Self::Architecture => "systemArchitecture",
            Self::ClassDiagram => "objectDesign",
        }
    }

    /// Kebab-case name used for file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::DomainModel => "domain-model",
            Self::Architecture => "architecture",
            Self::ClassDiagram => "class-diagram",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainModel => write!(f, "Domain Model"),
            Self::Architecture => write!(f, "Architecture"),
            Self::ClassDiagram => write!(f, "Class Diagram"),
        }
    }
}

/// Outcome of parsing a JSON-shaped response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Valid(T),
    Malformed(ParseFailure),
}

impl<T> ParseOutcome<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> std::result::Result<T, ParseFailure> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Malformed(failure) => Err(failure),
        }
    }
}

/// Why a JSON-shaped response was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No parseable JSON found
    Json(String),
    /// JSON parsed but violated the schema
    Schema(Vec<String>),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid JSON: {err}"),
            Self::Schema(issues) => write!(f, "schema violations: {}", issues.join(", ")),
        }
    }
}

/// Extract a JSON value from model text.
///
/// Uses the first fenced block when present, else the whole text. If that is
/// not valid JSON, retries on the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> std::result::Result<Value, String> {
    let trimmed = text.trim();
    let candidate = JSON_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str().trim());

    let first_error = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str(&trimmed[start..=end]).map_err(|_| first_error)
        }
        _ => Err(first_error),
    }
}

/// Parse a use-case extraction response.
pub fn parse_chat_analysis(text: &str) -> ParseOutcome<ChatAnalysisResponse> {
    parse_with(text, validate_chat_analysis)
}

/// Parse a requirements extraction response.
pub fn parse_requirements_analysis(text: &str) -> ParseOutcome<RequirementsAnalysisResponse> {
    parse_with(text, validate_requirements_analysis)
}

fn parse_with<T>(
    text: &str,
    validate: impl Fn(&Value) -> std::result::Result<T, Vec<String>>,
) -> ParseOutcome<T> {
    let value = match extract_json(text) {
        Ok(value) => value,
        Err(e) => return ParseOutcome::Malformed(ParseFailure::Json(e)),
    };
    match validate(&value) {
        Ok(parsed) => ParseOutcome::Valid(parsed),
        Err(issues) => ParseOutcome::Malformed(ParseFailure::Schema(issues)),
    }
}

/// Whether text starts with a recognized diagram declaration.
pub fn is_valid_diagram(code: &str) -> bool {
    DIAGRAM_DECLARATION.is_match(code.trim())
}

/// Extract diagram markup from model text and check its declaration.
pub fn extract_diagram(text: &str, kind: DiagramKind) -> Result<String> {
    let code = MERMAID_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| text.trim(), |m| m.as_str().trim())
        .to_string();

    if is_valid_diagram(&code) {
        return Ok(code);
    }

    let snippet: String = code.chars().take(SNIPPET_CHARS).collect();
    Err(ArchitectError::validation("Invalid Mermaid diagram generated")
        .with_meta("phase", kind.phase())
        .with_meta("generatedCode", snippet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    const VALID: &str =
        r#"{"reply": "X", "useCases": [{"id": "1", "title": "T", "narrative": "0123456789", "actors": ["A"]}]}"#;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(VALID).unwrap()["reply"], "X");
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = format!("```json\n{VALID}\n```");
        assert_eq!(extract_json(&text).unwrap()["reply"], "X");

        let bare = format!("```\n{VALID}\n```");
        assert_eq!(extract_json(&bare).unwrap()["reply"], "X");
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let text = format!("Sure! Here you go:\n{VALID}\nLet me know.");
        assert_eq!(extract_json(&text).unwrap()["reply"], "X");
    }

    #[test]
    fn test_extract_json_failure() {
        assert!(extract_json("I cannot help with that").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_chat_analysis_outcomes() {
        let parsed = parse_chat_analysis(VALID).into_result().unwrap();
        assert_eq!(parsed.use_cases[0].title, "T");

        match parse_chat_analysis("not json at all") {
            ParseOutcome::Malformed(ParseFailure::Json(_)) => {}
            other => panic!("expected json failure, got {other:?}"),
        }

        let short = VALID.replace("0123456789", "short");
        match parse_chat_analysis(&short) {
            ParseOutcome::Malformed(ParseFailure::Schema(issues)) => {
                assert!(issues[0].contains("narrative"));
            }
            other => panic!("expected schema failure, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_diagram_strips_fence() {
        let code = extract_diagram("```mermaid\nclassDiagram\n    class Test\n```", DiagramKind::DomainModel)
            .unwrap();
        assert_eq!(code, "classDiagram\n    class Test");
    }

    #[test]
    fn test_extract_diagram_raw_text() {
        let code = extract_diagram("  graph TD\n  A-->B  \n", DiagramKind::Architecture).unwrap();
        assert_eq!(code, "graph TD\n  A-->B");
        assert!(is_valid_diagram("stateDiagram-v2\n  [*] --> Idle"));
        assert!(is_valid_diagram("erDiagram"));
    }

    #[test]
    fn test_extract_diagram_rejects_prose() {
        let long = format!("Here is your diagram: {}", "x".repeat(400));
        let err = extract_diagram(&long, DiagramKind::ClassDiagram).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Invalid Mermaid diagram generated");
        assert_eq!(err.metadata()["phase"], "objectDesign");
        let snippet = err.metadata()["generatedCode"].as_str().unwrap();
        assert_eq!(snippet.chars().count(), SNIPPET_CHARS);
    }

    #[test]
    fn test_diagram_kind_labels() {
        assert_eq!(DiagramKind::DomainModel.slug(), "domain-model");
        assert_eq!(DiagramKind::ClassDiagram.to_string(), "Class Diagram");
    }
}
