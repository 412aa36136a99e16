//! Final report compilation.
//!
//! Deterministic Markdown assembly from a document. No backend calls and no
//! placeholders: a section is emitted only when its artifact exists.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::documents::DesignDocument;
use super::parsing::DiagramKind;
use crate::core::ReportConfig;

/// Report rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Image service root; the base64 diagram is appended as a path segment
    pub image_base_url: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self { image_base_url: config.image_base_url.clone() }
    }
}

/// Image URL for a diagram: `<base>/<base64(markup)>`.
pub fn diagram_image_url(base_url: &str, markup: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), STANDARD.encode(markup.as_bytes()))
}

/// Compile the Markdown design document.
pub fn compile_report(document: &DesignDocument, options: &ReportOptions) -> String {
    let mut md = format!("# Design Document: {}\n\n", document.project_name);

    if !document.description.trim().is_empty() {
        md.push_str(&format!("**Description:** {}\n\n", document.description));
    }

    let use_cases = document.use_cases();
    let domain_model = document.domain_model();
    if !use_cases.is_empty() || domain_model.is_some() {
        md.push_str("## Phase 1: Analysis\n\n");

        if !use_cases.is_empty() {
            md.push_str("### Use Cases\n");
            for uc in use_cases {
                md.push_str(&format!("- **{}**: {}\n", uc.title, uc.narrative));
            }
            md.push('\n');
        }

        if let Some(code) = domain_model {
            push_diagram(&mut md, DiagramKind::DomainModel, code, options);
        }
    }

    if let Some(code) = document.architecture() {
        md.push_str("## Phase 2: System Design\n\n");
        push_diagram(&mut md, DiagramKind::Architecture, code, options);
    }

    if let Some(code) = document.class_diagram() {
        md.push_str("## Phase 3: Object Design\n\n");
        push_diagram(&mut md, DiagramKind::ClassDiagram, code, options);
    }

    if let Some(review) = document.latest_ai_review() {
        md.push_str("## Phase 4: Validation\n\n");
        md.push_str("### AI Traceability Report\n");
        md.push_str(&review.content);
        md.push_str("\n\n");
    }

    md
}

fn push_diagram(md: &mut String, kind: DiagramKind, code: &str, options: &ReportOptions) {
    md.push_str(&format!("### {kind}\n\n"));
    md.push_str("**Diagram:**\n");
    md.push_str(&format!("![{kind}]({})\n\n", diagram_image_url(&options.image_base_url, code)));
    md.push_str("**Mermaid Code:**\n");
    md.push_str(&format!("```mermaid\n{code}\n```\n\n"));
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::workflow::documents::{PhaseOutput, ReviewComment, UseCase, AI_VALIDATOR};

    fn document() -> DesignDocument {
        DesignDocument::new("doc-1", "alex", "Bookshop", "Sells books", Utc::now())
    }

    #[test]
    fn test_title_only() {
        let mut doc = document();
        doc.description.clear();
        let md = compile_report(&doc, &ReportOptions::default());
        assert_eq!(md, "# Design Document: Bookshop\n\n");
    }

    #[test]
    fn test_image_url() {
        assert_eq!(diagram_image_url("https://mermaid.ink/img/", "graph TD"), "https://mermaid.ink/img/Z3JhcGggVEQ=");
    }

    #[test]
    fn test_sections_follow_artifacts() {
        let now = Utc::now();
        let doc = document()
            .apply(
                PhaseOutput::UseCases(vec![UseCase {
                    id: "uc1".to_string(),
                    title: "Buy Book".to_string(),
                    narrative: "The customer buys a book.".to_string(),
                    actors: vec!["Customer".to_string()],
                }]),
                now,
            )
            .apply(PhaseOutput::ClassDiagram("classDiagram\n  class Book".to_string()), now);

        let md = compile_report(&doc, &ReportOptions::default());
        assert!(md.starts_with("# Design Document: Bookshop\n\n**Description:** Sells books\n\n"));
        assert!(md.contains("## Phase 1: Analysis\n\n### Use Cases\n- **Buy Book**: The customer buys a book.\n\n"));
        assert!(!md.contains("### Domain Model"));
        assert!(!md.contains("Phase 2"));
        assert!(md.contains("## Phase 3: Object Design\n\n### Class Diagram\n\n**Diagram:**\n![Class Diagram](https://mermaid.ink/img/"));
        assert!(md.contains("**Mermaid Code:**\n```mermaid\nclassDiagram\n  class Book\n```\n\n"));
        assert!(!md.contains("Phase 4"));
    }

    #[test]
    fn test_latest_ai_review_only() {
        let now = Utc::now();
        let review = |content: &str, author: &str| {
            PhaseOutput::Review(ReviewComment {
                id: content.to_string(),
                author: author.to_string(),
                content: content.to_string(),
                timestamp: now,
                resolved: false,
            })
        };
        let doc = document()
            .apply(review("first report", AI_VALIDATOR), now)
            .apply(review("second report", AI_VALIDATOR), now)
            .apply(review("human note", "alex"), now);

        let md = compile_report(&doc, &ReportOptions::default());
        assert!(md.ends_with("## Phase 4: Validation\n\n### AI Traceability Report\nsecond report\n\n"));
        assert!(!md.contains("first report"));
        assert!(!md.contains("human note"));
    }
}
