//! Curriculum ingestion CLI
//!
//! Run with: cargo run -p curriculum-ingest -- <files or directories>

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use curriculum_ingest::config::ExtractionBackend;
use curriculum_ingest::processing::BatchSummary;
use curriculum_ingest::{BatchWorker, PipelineConfig, SourceDocument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(
    name = "curriculum-ingest",
    version,
    about = "Extract bounded, compressed text from curriculum documents"
)]
struct Cli {
    /// Files or directories to ingest
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documents extracted concurrently
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Return extracted text without compression
    #[arg(long)]
    no_compress: bool,

    /// Prefer pdftotext and pandoc where installed
    #[arg(long)]
    external_tools: bool,

    /// Skip the upload file count and size limits
    #[arg(long)]
    no_limits: bool,

    /// What to print on stdout
    #[arg(short, long, value_enum, default_value_t = Output::Records)]
    output: Output,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    /// One JSON document record per successful extraction
    Records,
    /// One JSON report per input, including parser attempts
    Reports,
    /// Batch counts only
    Summary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curriculum_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(concurrency) = cli.concurrency {
        config.processing.max_concurrent_documents = Some(concurrency);
    }
    if cli.no_compress {
        config.compression.enabled = false;
    }
    if cli.external_tools {
        config.extraction.backend = ExtractionBackend::External;
    }

    let files = collect_files(&cli.paths)?;
    tracing::info!("Found {} files", files.len());

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(SourceDocument::new(filename, data));
    }

    let worker = BatchWorker::from_config(config)?;
    let reports = if cli.no_limits {
        worker.extract_all(documents).await
    } else {
        worker.extract_upload(documents).await?
    };
    let summary = BatchSummary::from_reports(&reports);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        Output::Records => {
            for record in reports.iter().filter_map(|r| r.to_record()) {
                serde_json::to_writer(&mut out, &record)?;
                writeln!(out)?;
            }
        }
        Output::Reports => {
            for report in &reports {
                serde_json::to_writer(&mut out, report)?;
                writeln!(out)?;
            }
        }
        Output::Summary => {
            serde_json::to_writer_pretty(&mut out, &summary)?;
            writeln!(out)?;
        }
    }

    if !reports.is_empty() && summary.succeeded == 0 {
        anyhow::bail!("no document could be extracted");
    }

    Ok(())
}

/// Expand directories into their files (hidden entries skipped), keeping input order
fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
            for entry in walker {
                let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            anyhow::bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
