//! Bounded concurrent extraction of a batch of uploads

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::pipeline::ExtractionPipeline;
use crate::config::{PipelineConfig, UploadLimits};
use crate::error::{Error, Result};
use crate::ingestion::FormatDetector;
use crate::types::{DocumentReport, ExtractionOutcome, FailureKind, SourceDocument};

impl UploadLimits {
    /// Reject an upload that exceeds the file count or size ceilings
    pub fn validate(&self, documents: &[SourceDocument]) -> Result<()> {
        if documents.len() > self.max_files {
            return Err(Error::UploadRejected(format!(
                "{} files exceeds the limit of {}",
                documents.len(),
                self.max_files
            )));
        }

        let mut total: u64 = 0;
        for document in documents {
            if document.size() > self.max_file_bytes {
                return Err(Error::UploadRejected(format!(
                    "'{}' is {} bytes, above the per-file limit of {}",
                    document.filename(),
                    document.size(),
                    self.max_file_bytes
                )));
            }
            total += document.size();
        }

        if total > self.max_total_bytes {
            return Err(Error::UploadRejected(format!(
                "upload totals {} bytes, above the limit of {}",
                total, self.max_total_bytes
            )));
        }

        Ok(())
    }
}

/// Counts over a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Documents extracted successfully
    pub succeeded: usize,
    /// Documents rejected for their extension
    pub unsupported: usize,
    /// Documents whose extraction failed
    pub failed: usize,
}

impl BatchSummary {
    /// Tally a set of reports
    pub fn from_reports(reports: &[DocumentReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match report.outcome.failure_kind() {
                None => summary.succeeded += 1,
                Some(FailureKind::UnsupportedFormat) => summary.unsupported += 1,
                Some(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Extracts uploads concurrently with a bounded number in flight
///
/// Extraction is CPU-bound and blocking, so each document runs on tokio's
/// blocking pool. A semaphore caps how many run at once.
pub struct BatchWorker {
    pipeline: Arc<ExtractionPipeline>,
    concurrency: usize,
    limits: UploadLimits,
}

impl BatchWorker {
    /// Create a worker around a shared pipeline
    pub fn new(pipeline: Arc<ExtractionPipeline>, concurrency: usize) -> Self {
        let limits = pipeline.config().upload.clone();
        Self {
            pipeline,
            concurrency: concurrency.max(1),
            limits,
        }
    }

    /// Build the pipeline and worker from configuration
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let concurrency = config.processing.concurrency();
        let pipeline = Arc::new(ExtractionPipeline::new(config)?);

        tracing::info!("Worker configured: {} parallel documents", concurrency);

        Ok(Self::new(pipeline, concurrency))
    }

    /// Shared pipeline
    pub fn pipeline(&self) -> &Arc<ExtractionPipeline> {
        &self.pipeline
    }

    /// Concurrency limit
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Check the upload limits, then extract every document
    pub async fn extract_upload(&self, documents: Vec<SourceDocument>) -> Result<Vec<DocumentReport>> {
        self.limits.validate(&documents)?;
        Ok(self.extract_all(documents).await)
    }

    /// Extract every document; reports come back in input order
    pub async fn extract_all(&self, documents: Vec<SourceDocument>) -> Vec<DocumentReport> {
        let started = Instant::now();
        let count = documents.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let futures: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let sem = Arc::clone(&semaphore);
                let pipeline = Arc::clone(&self.pipeline);

                async move {
                    let _permit = match sem.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return task_failure(&document, "worker semaphore closed"),
                    };

                    let failed_doc = document.clone();
                    match tokio::task::spawn_blocking(move || pipeline.extract_report(&document)).await {
                        Ok(report) => report,
                        Err(e) => {
                            tracing::error!("[{}] Extraction task failed: {}", failed_doc.filename(), e);
                            task_failure(&failed_doc, &format!("extraction task failed: {}", e))
                        }
                    }
                }
            })
            .collect();

        let reports = join_all(futures).await;
        let summary = BatchSummary::from_reports(&reports);

        tracing::info!(
            "Batch of {} documents done in {:.1}s: {} succeeded, {} unsupported, {} failed",
            count,
            started.elapsed().as_secs_f64(),
            summary.succeeded,
            summary.unsupported,
            summary.failed
        );

        reports
    }
}

fn task_failure(document: &SourceDocument, reason: &str) -> DocumentReport {
    DocumentReport {
        filename: document.filename().to_string(),
        size: document.size(),
        format: FormatDetector::detect(document.filename()),
        outcome: ExtractionOutcome::failure(FailureKind::ExtractionFailure, reason),
        attempts: Vec::new(),
        duration_ms: 0,
    }
}
