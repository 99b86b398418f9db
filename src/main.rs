//! # Paper Cast CLI (`pcast`)
//!
//! Drives the search → summarize → audio workflow against a Paper Cast
//! backend from the command line.
//!
//! ## Usage
//!
//! ```bash
//! pcast --config ./config/pcast.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pcast health` | Check that the backend is reachable |
//! | `pcast search "<query>"` | List matching papers |
//! | `pcast run "<query>"` | Search, select, summarize, and optionally generate audio |
//! | `pcast upload` | Summarize an uploaded PDF or a paper URL / arXiv id |
//! | `pcast audio <id>` | Generate audio for an already summarized identifier |
//!
//! The backend URL comes from `[backend].base_url` in the config file or the
//! `PAPERCAST_API_URL` environment variable (default `http://localhost:8000`).

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use paper_cast::audio::{AudioOutcome, AudioRequestController};
use paper_cast::backend::{Backend, HttpBackend};
use paper_cast::config::{self, Config};
use paper_cast::models::{ActionOutcome, Identifier, PipelineKind, PipelineView};
use paper_cast::orchestrator::WorkflowOrchestrator;

/// Paper Cast CLI: search research papers, summarize them, and listen to
/// the summary.
#[derive(Parser)]
#[command(
    name = "pcast",
    about = "Paper Cast: search research papers, summarize them, and turn summaries into audio",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used if it does not exist.
    #[arg(long, global = true, default_value = "./config/pcast.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable.
    Health,

    /// Search for papers and list the results.
    Search {
        /// Search terms (e.g. "neural networks").
        query: String,
    },

    /// Run the full search pipeline.
    ///
    /// Searches, selects a result, summarizes it, and optionally generates
    /// audio for the summary.
    Run {
        /// Search terms.
        query: String,

        /// Position of the result to summarize in the listed results.
        #[arg(long, default_value_t = 0)]
        select: usize,

        /// Generate audio for the summary.
        #[arg(long)]
        audio: bool,

        /// Save the generated audio to this file (implies `--audio`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Summarize a PDF file or a paper given by URL / arXiv id.
    #[command(group(ArgGroup::new("input").required(true).args(["file", "paper"])))]
    Upload {
        /// PDF file to upload.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Paper URL or arXiv id (e.g. `2106.09685`).
        #[arg(long)]
        paper: Option<String>,

        /// Generate audio for the summary.
        #[arg(long)]
        audio: bool,

        /// Save the generated audio to this file (implies `--audio`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate audio for an identifier the backend already has a summary for.
    Audio {
        /// Result index or upload identifier.
        identifier: String,

        /// Save the generated audio to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "paper_cast=debug,pcast=debug"
    } else {
        "paper_cast=warn,pcast=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let backend = Arc::new(HttpBackend::new(&cfg.backend)?);

    match cli.command {
        Commands::Health => run_health(&backend).await?,
        Commands::Search { query } => {
            let orchestrator = orchestrator(&backend, &cfg);
            expect_applied(orchestrator.search(&query).await)?;
            print_results(&orchestrator.search_view());
        }
        Commands::Run {
            query,
            select,
            audio,
            output,
        } => {
            let orchestrator = orchestrator(&backend, &cfg);
            run_pipeline(&orchestrator, &backend, &query, select, audio, output.as_deref())
                .await?;
        }
        Commands::Upload {
            file,
            paper,
            audio,
            output,
        } => {
            let orchestrator = orchestrator(&backend, &cfg);
            let outcome = match (file, paper) {
                (Some(path), _) => orchestrator.upload_pdf_file(&path).await,
                (None, Some(paper)) => orchestrator.summarize_paper(&paper).await,
                (None, None) => bail!("Pass either --file or --paper"),
            };
            let result = finish_upload(&orchestrator, &backend, outcome, audio, output.as_deref()).await;
            orchestrator.wait_for_registrations().await;
            result?;
        }
        Commands::Audio { identifier, output } => {
            let controller = AudioRequestController::new(backend.clone());
            match controller.request_audio(Identifier::new(identifier)).await {
                AudioOutcome::Ready { url } => {
                    println!("Audio: {}", url);
                    if let Some(path) = output {
                        save_audio(&backend, &url, &path).await?;
                    }
                }
                AudioOutcome::Failed(message) => bail!("Audio generation failed: {}", message),
                AudioOutcome::Suppressed => bail!("Audio is already being generated"),
            }
        }
    }

    Ok(())
}

fn orchestrator(backend: &Arc<HttpBackend>, cfg: &Config) -> WorkflowOrchestrator {
    let shared: Arc<dyn Backend> = backend.clone();
    WorkflowOrchestrator::new(shared, cfg.workflow.clone())
}

async fn run_health(backend: &HttpBackend) -> Result<()> {
    match backend.health().await {
        Ok(text) => {
            println!("Backend at {} is up: {}", backend.base_url(), text.trim());
            Ok(())
        }
        Err(e) => bail!(
            "Backend at {} is not healthy: {}\nIs the backend server running?",
            backend.base_url(),
            e
        ),
    }
}

async fn run_pipeline(
    orchestrator: &WorkflowOrchestrator,
    backend: &HttpBackend,
    query: &str,
    select: usize,
    audio: bool,
    output: Option<&Path>,
) -> Result<()> {
    expect_applied(orchestrator.search(query).await)?;
    let view = orchestrator.search_view();
    print_results(&view);
    if view.results.is_empty() {
        return Ok(());
    }

    expect_applied(orchestrator.select(select))?;
    if let Some(record) = orchestrator.search_view().selected() {
        println!("Selected {}: {}", record.id, record.title);
    }

    expect_applied(orchestrator.summarize_selected().await)?;
    print_summary(&orchestrator.search_view());

    if audio || output.is_some() {
        expect_applied(orchestrator.request_audio(PipelineKind::Search).await)?;
        finish_audio(&orchestrator.search_view(), backend, output).await?;
    }
    Ok(())
}

async fn finish_upload(
    orchestrator: &WorkflowOrchestrator,
    backend: &HttpBackend,
    outcome: ActionOutcome,
    audio: bool,
    output: Option<&Path>,
) -> Result<()> {
    expect_applied(outcome)?;
    let view = orchestrator.upload_view();
    if let Some(summary) = &view.summary {
        println!("Identifier: {}", summary.for_id);
    }
    print_summary(&view);

    if audio || output.is_some() {
        expect_applied(orchestrator.request_audio(PipelineKind::Upload).await)?;
        finish_audio(&orchestrator.upload_view(), backend, output).await?;
    }
    Ok(())
}

async fn finish_audio(view: &PipelineView, backend: &HttpBackend, output: Option<&Path>) -> Result<()> {
    let Some(url) = view.audio.url.as_deref() else {
        bail!("Audio finished without a playback URL");
    };
    println!("Audio: {}", url);
    if let Some(path) = output {
        save_audio(backend, url, path).await?;
    }
    Ok(())
}

async fn save_audio(backend: &HttpBackend, url: &str, path: &Path) -> Result<()> {
    let bytes = backend
        .fetch_audio(url)
        .await
        .with_context(|| format!("Failed to download audio from {}", url))?;
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write audio to {}", path.display()))?;
    println!("Saved audio to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn expect_applied(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Applied => Ok(()),
        ActionOutcome::Failed(message) | ActionOutcome::Rejected(message) => bail!(message),
        ActionOutcome::Discarded => bail!("Response arrived after the request was superseded"),
        ActionOutcome::Suppressed => bail!("Audio is already being generated"),
    }
}

fn print_results(view: &PipelineView) {
    if view.results.is_empty() {
        println!("No results.");
        return;
    }
    for record in &view.results {
        println!("{}: {}", record.id, record.title);
        if !record.link.is_empty() {
            println!("    link: {}", record.link);
        }
    }
    println!();
}

fn print_summary(view: &PipelineView) {
    if let Some(text) = &view.display_text {
        println!("Summary:\n{}\n", text);
    }
}
