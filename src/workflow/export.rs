//! Multi-document export bundle.
//!
//! Writes one Markdown report per document, the raw diagram sources, and a
//! README index into a directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use super::documents::DesignDocument;
use super::parsing::DiagramKind;
use super::report::{compile_report, ReportOptions};
use crate::core::{ArchitectError, Result};

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Also write each diagram as a `.mmd` file
    pub include_diagrams: bool,
    /// Used when a document has no current cached report
    pub report: ReportOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { include_diagrams: true, report: ReportOptions::default() }
    }
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub out_dir: PathBuf,
    pub documents: usize,
    /// Paths relative to `out_dir`, in write order
    pub files: Vec<PathBuf>,
}

/// File-name stem for a document.
///
/// Lower-cased project name with every non-alphanumeric character replaced
/// by `_`; the id when the name is empty.
pub fn slug(document: &DesignDocument) -> String {
    if document.project_name.is_empty() {
        return document.id.clone();
    }
    document
        .project_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Write the bundle for `documents` into `out_dir`.
pub fn export_bundle(
    documents: &[DesignDocument],
    options: &ExportOptions,
    out_dir: &Path,
) -> Result<ExportSummary> {
    export_bundle_at(documents, options, out_dir, Utc::now())
}

fn export_bundle_at(
    documents: &[DesignDocument],
    options: &ExportOptions,
    out_dir: &Path,
    generated_at: DateTime<Utc>,
) -> Result<ExportSummary> {
    fs::create_dir_all(out_dir).map_err(|e| write_error(out_dir, &e))?;

    let mut files = Vec::new();
    let mut used = HashSet::new();

    for document in documents {
        let mut stem = slug(document);
        if !used.insert(stem.clone()) {
            stem = format!("{stem}_{}", document.id.chars().take(8).collect::<String>());
            used.insert(stem.clone());
        }

        let report = match cached_report(document) {
            Some(report) => report.to_string(),
            None => compile_report(document, &options.report),
        };
        files.push(write_file(out_dir, &format!("{stem}.md"), &report)?);

        if options.include_diagrams {
            for kind in DiagramKind::ALL {
                let code = match kind {
                    DiagramKind::DomainModel => document.domain_model(),
                    DiagramKind::Architecture => document.architecture(),
                    DiagramKind::ClassDiagram => document.class_diagram(),
                };
                if let Some(code) = code {
                    files.push(write_file(out_dir, &format!("{stem}.{}.mmd", kind.slug()), code)?);
                }
            }
        }
    }

    files.push(write_file(out_dir, "README.md", &readme(documents, generated_at))?);

    tracing::info!(out_dir = %out_dir.display(), documents = documents.len(), files = files.len(), "export complete");
    Ok(ExportSummary { out_dir: out_dir.to_path_buf(), documents: documents.len(), files })
}

/// The stored report, unless the document changed after it was generated.
fn cached_report(document: &DesignDocument) -> Option<&str> {
    let validation = document.validation.as_ref()?;
    let generated_at = validation.report_generated_at?;
    if document.updated_at > generated_at {
        tracing::debug!(document_id = %document.id, "cached report is stale, recompiling");
        return None;
    }
    validation.generated_report.as_deref()
}

fn readme(documents: &[DesignDocument], generated_at: DateTime<Utc>) -> String {
    let listing = documents
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {} (ID: {})", i + 1, d.project_name, d.id))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Archwright Design Documents\n\
         Generated: {}\n\
         Total Projects: {}\n\n\
         ## Projects Included:\n\
         {listing}\n\n\
         ---\n\
         Generated with Archwright\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        documents.len()
    )
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content).map_err(|e| write_error(&path, &e))?;
    Ok(PathBuf::from(name))
}

fn write_error(path: &Path, err: &std::io::Error) -> ArchitectError {
    ArchitectError::persistence(format!("Failed to write {}: {err}", path.display()))
        .with_meta("path", path.display().to_string())
}
