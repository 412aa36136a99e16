//! Archwright - AI-guided software design from the terminal.
//!
//! Run `archwright --help` for usage information.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use archwright::core::{log_error, normalize, retry_async, Metadata, RetryConfig};
use archwright::workflow::{
    export_bundle, start_project, suggest_patterns, AutomationEvent, AutomationStep,
    ExportOptions,
};
use archwright::{
    compile_report, create_generator, ArchitectError, Config, DesignArchitect, DesignDocument,
    DocumentStore, FileDocumentStore, PhaseAutomation, ReportOptions,
};

/// Archwright - AI-guided software design
#[derive(Parser)]
#[command(name = "archwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding persisted documents
    #[arg(long, global = true, env = "ARCHWRIGHT_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new design project
    New {
        /// Project name
        name: String,

        /// Short project description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List your design documents
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one design document
    Show {
        /// Document id
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Discuss purpose, stakeholders, constraints, and requirements
    Requirements {
        /// Document id
        id: String,

        /// Your message
        message: String,
    },

    /// Discuss the system and extract use cases
    Chat {
        /// Document id
        id: String,

        /// Your message
        message: String,
    },

    /// Run a single design phase
    Phase {
        /// Document id
        id: String,

        /// Phase to run
        #[arg(value_enum)]
        step: PhaseStep,
    },

    /// Run every remaining phase and compile the report
    Automate {
        /// Document id
        id: String,

        /// Regenerate the domain model even when one exists
        #[arg(long)]
        regenerate: bool,
    },

    /// Compile the Markdown design report
    Report {
        /// Document id
        id: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export all your documents into a directory bundle
    Export {
        /// Output directory
        #[arg(short, long, default_value = "archwright-export")]
        output: PathBuf,

        /// Skip the raw diagram sources
        #[arg(long)]
        no_diagrams: bool,
    },

    /// Suggest design patterns for a document's use cases
    Patterns {
        /// Document id
        id: String,
    },

    /// Delete a design document
    Delete {
        /// Document id
        id: String,
    },

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PhaseStep {
    DomainModel,
    Architecture,
    ObjectDesign,
    Validate,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = normalize(e);
            log_error(&err, &Metadata::new());
            eprintln!("Error: {}", err.message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir;

    match cli.command {
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
        Some(Commands::New { name, description }) => cmd_new(data_dir, &name, &description),
        Some(Commands::List { format }) => cmd_list(data_dir, format),
        Some(Commands::Show { id, format }) => cmd_show(data_dir, &id, format),
        Some(Commands::Requirements { id, message }) => cmd_requirements(data_dir, &id, &message),
        Some(Commands::Chat { id, message }) => cmd_chat(data_dir, &id, &message),
        Some(Commands::Phase { id, step }) => cmd_phase(data_dir, &id, step),
        Some(Commands::Automate { id, regenerate }) => cmd_automate(data_dir, &id, regenerate),
        Some(Commands::Report { id, output }) => cmd_report(data_dir, &id, output.as_deref()),
        Some(Commands::Export { output, no_diagrams }) => cmd_export(data_dir, &output, no_diagrams),
        Some(Commands::Patterns { id }) => cmd_patterns(data_dir, &id),
        Some(Commands::Delete { id }) => cmd_delete(data_dir, &id),
        Some(Commands::Config { path }) => cmd_config(path),
        Some(Commands::Completions { shell }) => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Loaded configuration plus the document store it points at.
struct Session {
    config: Config,
    store: FileDocumentStore,
}

impl Session {
    fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(dir) = data_dir {
            config.general.data_dir = Some(dir);
        }

        let dir = config
            .data_dir()
            .ok_or_else(|| ArchitectError::configuration("Could not determine data directory"))?;
        tracing::debug!(data_dir = %dir.display(), user = %config.general.user_id, "opening document store");

        Ok(Self { store: FileDocumentStore::new(dir), config })
    }

    fn document(&self, id: &str) -> Result<DesignDocument> {
        let document = self.store.load(id)?.ok_or_else(|| not_found(id))?;
        Ok(document)
    }

    fn report_options(&self) -> ReportOptions {
        ReportOptions::from(&self.config.report)
    }

    fn architect(&self) -> Result<DesignArchitect> {
        self.config.validate()?;
        let generator = create_generator(&self.config.ai)?;
        Ok(DesignArchitect::new(generator).with_report_options(self.report_options()))
    }

    /// Run a backend-calling operation under the configured timeout and retry policy.
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = archwright::Result<T>>,
    {
        let retry = RetryConfig::from_ai_config(&self.config.ai);
        let outcome = retry_async(&retry, operation, ArchitectError::is_retryable, timed_out).await;
        if outcome.was_retried {
            tracing::info!(
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_time.as_millis() as u64,
                "generation retried"
            );
        }
        Ok(outcome.into_result()?)
    }
}

fn not_found(id: &str) -> ArchitectError {
    ArchitectError::validation(format!("Document not found: {id}")).with_meta("documentId", id)
}

fn timed_out(limit: Duration) -> ArchitectError {
    ArchitectError::ai_generation(format!("Generation timed out after {}s", limit.as_secs()))
        .with_meta("timeoutSecs", limit.as_secs())
}

fn cmd_new(data_dir: Option<PathBuf>, name: &str, description: &str) -> Result<()> {
    let session = Session::open(data_dir)?;
    let document = start_project(&session.config.general.user_id, name, description)?;
    session.store.save(&document)?;

    println!("Created project '{}'", document.project_name);
    println!("  ID: {}", document.id);
    println!();
    println!("Next: archwright chat {} \"<describe your system>\"", document.id);
    Ok(())
}

fn cmd_list(data_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let session = Session::open(data_dir)?;
    let documents = session.store.list_by_user(&session.config.general.user_id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&documents)?),
        OutputFormat::Text => {
            if documents.is_empty() {
                println!("No documents yet. Create one with: archwright new <name>");
                return Ok(());
            }
            for document in &documents {
                println!(
                    "{}  {:<16} {}",
                    document.id,
                    document.current_phase.to_string(),
                    document.project_name
                );
            }
            println!();
            println!("Total: {} documents", documents.len());
        }
    }
    Ok(())
}

fn cmd_show(data_dir: Option<PathBuf>, id: &str, format: OutputFormat) -> Result<()> {
    let session = Session::open(data_dir)?;
    let document = session.document(id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
        OutputFormat::Text => print_document(&document),
    }
    Ok(())
}

fn print_document(document: &DesignDocument) {
    println!("{}", document.project_name);
    println!("  ID:      {}", document.id);
    println!("  Phase:   {}", document.current_phase);
    println!("  Updated: {}", document.updated_at.to_rfc3339());
    if !document.description.is_empty() {
        println!("  {}", document.description);
    }

    let use_cases = document.use_cases();
    println!();
    println!("Use cases ({}):", use_cases.len());
    for use_case in use_cases {
        println!("  {} - {}", use_case.id, use_case.title);
    }

    println!();
    println!("Diagrams:");
    for (label, present) in [
        ("Domain model", document.domain_model().is_some()),
        ("Architecture", document.architecture().is_some()),
        ("Class diagram", document.class_diagram().is_some()),
    ] {
        println!("  {:<14} {}", label, if present { "yes" } else { "-" });
    }

    let reviews = document.reviews();
    if !reviews.is_empty() {
        println!();
        println!("Reviews: {}", reviews.len());
    }
}

fn cmd_requirements(data_dir: Option<PathBuf>, id: &str, message: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let session = Session::open(data_dir)?;
        let architect = session.architect()?;
        let _lock = session.store.lock(id).await?;

        let document = session.document(id)?;
        let outcome =
            session.call(|| architect.analyze_requirements_chat(&document, message)).await?;
        if outcome.is_degraded() {
            tracing::warn!(document_id = %id, "requirements response could not be parsed");
        }
        session.store.save(outcome.document())?;

        println!("{}", outcome.reply());
        Ok(())
    })
}

fn cmd_chat(data_dir: Option<PathBuf>, id: &str, message: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let session = Session::open(data_dir)?;
        let architect = session.architect()?;
        let _lock = session.store.lock(id).await?;

        let document = session.document(id)?;
        let outcome = session.call(|| architect.analyze_chat(&document, message)).await?;
        if outcome.is_degraded() {
            tracing::warn!(document_id = %id, "analysis response could not be parsed");
        }
        session.store.save(outcome.document())?;

        println!("{}", outcome.reply());
        let use_cases = outcome.document().use_cases();
        if !use_cases.is_empty() {
            println!();
            println!("Use cases ({}):", use_cases.len());
            for use_case in use_cases {
                println!("  {} - {}", use_case.id, use_case.title);
            }
        }
        Ok(())
    })
}

fn cmd_phase(data_dir: Option<PathBuf>, id: &str, step: PhaseStep) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let session = Session::open(data_dir)?;
        let architect = session.architect()?;
        let _lock = session.store.lock(id).await?;

        let document = session.document(id)?;
        let updated = match step {
            PhaseStep::DomainModel => {
                session.call(|| architect.generate_domain_model(&document)).await?
            }
            PhaseStep::Architecture => {
                session.call(|| architect.generate_system_architecture(&document)).await?
            }
            PhaseStep::ObjectDesign => {
                session.call(|| architect.generate_object_design(&document)).await?
            }
            PhaseStep::Validate => session.call(|| architect.validate_design(&document)).await?,
        };
        session.store.save(&updated)?;

        let output = match step {
            PhaseStep::DomainModel => updated.domain_model(),
            PhaseStep::Architecture => updated.architecture(),
            PhaseStep::ObjectDesign => updated.class_diagram(),
            PhaseStep::Validate => updated.latest_ai_review().map(|r| r.content.as_str()),
        };
        if let Some(output) = output {
            println!("{output}");
        }
        Ok(())
    })
}

fn cmd_automate(data_dir: Option<PathBuf>, id: &str, regenerate: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let session = Session::open(data_dir)?;
        let architect = session.architect()?;
        let lock = session.store.lock(id).await?;

        let document = session.document(id)?;
        let automation = PhaseAutomation::new().regenerate_domain_model(regenerate);
        let store = &session.store;

        let limit = Duration::from_secs(
            session.config.ai.timeout_secs.saturating_mul(AutomationStep::ALL.len() as u64),
        );
        let run = automation.run(&architect, document, |event| match event {
            AutomationEvent::Started(progress) => {
                println!("[{}/{}] {}", progress.current, progress.total, progress.message);
            }
            AutomationEvent::Skipped(progress) => {
                println!("[{}/{}] {} skipped", progress.current, progress.total, progress.step);
            }
            AutomationEvent::Finished { progress, document } => {
                if let Err(e) = store.save(document) {
                    tracing::warn!(step = %progress.step, error = %e, "failed to save intermediate result");
                }
                if let Err(e) = lock.refresh() {
                    tracing::warn!(error = %e, "failed to refresh document lock");
                }
            }
        });
        let document = tokio::time::timeout(limit, run).await.map_err(|_| timed_out(limit))??;
        store.save(&document)?;

        println!();
        println!("Design complete: {}", document.project_name);
        println!("Next: archwright report {} -o {}.md", document.id, document.id);
        Ok(())
    })
}

fn cmd_report(data_dir: Option<PathBuf>, id: &str, output: Option<&Path>) -> Result<()> {
    let session = Session::open(data_dir)?;
    let document = session.document(id)?;
    let report = compile_report(&document, &session.report_options());

    match output {
        Some(path) => {
            std::fs::write(path, &report).map_err(|e| {
                ArchitectError::persistence(format!("Failed to write {}: {e}", path.display()))
            })?;
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
    }
    Ok(())
}

fn cmd_export(data_dir: Option<PathBuf>, output: &Path, no_diagrams: bool) -> Result<()> {
    let session = Session::open(data_dir)?;
    let documents = session.store.list_by_user(&session.config.general.user_id)?;
    if documents.is_empty() {
        println!("No documents to export.");
        return Ok(());
    }

    let options =
        ExportOptions { include_diagrams: !no_diagrams, report: session.report_options() };
    let summary = export_bundle(&documents, &options, output)?;

    println!(
        "Exported {} documents ({} files) to {}",
        summary.documents,
        summary.files.len(),
        summary.out_dir.display()
    );
    Ok(())
}

fn cmd_patterns(data_dir: Option<PathBuf>, id: &str) -> Result<()> {
    let session = Session::open(data_dir)?;
    let document = session.document(id)?;
    let suggestions = suggest_patterns(&document);

    if suggestions.is_empty() {
        println!("No pattern suggestions. Add use cases with: archwright chat {id} \"...\"");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!("{} ({}, {} likelihood)", suggestion.name, suggestion.category, suggestion.likelihood);
        println!("  {}", suggestion.reason);
        println!("  Matched: {}", suggestion.matched_keywords.join(", "));
        println!("  When: {}", suggestion.applicability);
        println!();
    }
    Ok(())
}

fn cmd_delete(data_dir: Option<PathBuf>, id: &str) -> Result<()> {
    let session = Session::open(data_dir)?;
    let _lock = session.store.try_lock(id)?.ok_or_else(|| {
        ArchitectError::persistence(format!("Document {id} is locked by another process"))
            .with_meta("documentId", id)
    })?;
    if !session.store.delete(id)? {
        return Err(not_found(id).into());
    }
    println!("Deleted {id}");
    Ok(())
}

fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_config_path() {
            println!("{}", path.display());
        } else {
            println!("Could not determine config directory");
        }
        return Ok(());
    }

    let mut config = Config::load()?;
    if config.ai.gemini.api_key.is_some() {
        config.ai.gemini.api_key = Some("********".to_string());
    }
    if config.ai.vertex.access_token.is_some() {
        config.ai.vertex.access_token = Some("********".to_string());
    }

    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");
    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "archwright", &mut io::stdout());
}
