//! Extraction orchestrator
//!
//! Drives one upload through staging, detection, dispatch, extraction with
//! fallback, compression and the output ceiling. Every call returns an
//! [`ExtractionOutcome`]; parser errors and panics never escape.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::artifact::TemporaryArtifact;
use super::dispatcher::{ExtractionVariant, SizeDispatcher};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::ingestion::{ExtractorRegistry, FormatDetector, FormatExtractor, TextCompressor};
use crate::types::{DocumentFormat, DocumentReport, ExtractionOutcome, FailureKind, ParserAttempt, SourceDocument};

const FALLBACK_METHOD: &str = "raw-scan";

/// Outcome of one extraction together with how it was reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracedExtraction {
    /// Detected format
    pub format: DocumentFormat,
    /// Variant chosen by the dispatcher (absent when extraction never started)
    pub variant: Option<ExtractionVariant>,
    /// Final outcome
    pub outcome: ExtractionOutcome,
    /// Every method tried, in order
    pub attempts: Vec<ParserAttempt>,
}

/// The extraction pipeline
///
/// Holds no per-call state, so one instance serves any number of concurrent
/// calls.
pub struct ExtractionPipeline {
    config: PipelineConfig,
    dispatcher: SizeDispatcher,
    compressor: TextCompressor,
    registry: ExtractorRegistry,
}

impl ExtractionPipeline {
    /// Create a pipeline with the default extractors for `config`
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let registry = ExtractorRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// Create a pipeline around a custom extractor registry
    pub fn with_registry(config: PipelineConfig, registry: ExtractorRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dispatcher: SizeDispatcher::new(&config.dispatch),
            compressor: TextCompressor::new(&config.compression),
            registry,
            config,
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract bounded, compressed text from an upload
    pub fn extract(&self, data: &[u8], filename: &str) -> ExtractionOutcome {
        self.extract_with_trace(data, filename).outcome
    }

    /// Extract a source document
    pub fn extract_document(&self, document: &SourceDocument) -> ExtractionOutcome {
        self.extract(document.data(), document.filename())
    }

    /// Extract a source document into a full report
    pub fn extract_report(&self, document: &SourceDocument) -> DocumentReport {
        let started = Instant::now();
        let traced = self.extract_with_trace(document.data(), document.filename());
        DocumentReport {
            filename: document.filename().to_string(),
            size: document.size(),
            format: traced.format,
            outcome: traced.outcome,
            attempts: traced.attempts,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Extract and record every method attempted
    pub fn extract_with_trace(&self, data: &[u8], filename: &str) -> TracedExtraction {
        let format = FormatDetector::detect(filename);
        if !format.is_supported() {
            let ext = FormatDetector::extension(filename).unwrap_or_else(|| "(none)".to_string());
            tracing::warn!("[{}] Rejected unsupported file type: {}", filename, ext);
            return TracedExtraction {
                format,
                variant: None,
                outcome: ExtractionOutcome::failure(
                    FailureKind::UnsupportedFormat,
                    format!("Unsupported file type: {}", ext),
                ),
                attempts: Vec::new(),
            };
        }

        let artifact = match TemporaryArtifact::stage(&self.config.staging, filename, data) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!("[{}] Could not stage upload: {}", filename, e);
                return TracedExtraction {
                    format,
                    variant: None,
                    outcome: ExtractionOutcome::failure(FailureKind::ResourceFailure, e.to_string()),
                    attempts: Vec::new(),
                };
            }
        };

        let size = data.len() as u64;
        let variant = self.dispatcher.select(format, size);
        tracing::info!(
            "[{}] Extracting {} ({} bytes, {} variant)",
            filename,
            format.display_name(),
            size,
            variant
        );

        let mut attempts = Vec::new();
        let extracted = self.run_extractors(format, variant, artifact.path(), filename, &mut attempts);

        if let Err(e) = artifact.release() {
            tracing::warn!("[{}] {}", filename, e);
        }

        let outcome = match extracted {
            Ok(text) => ExtractionOutcome::success(self.finish(text, filename)),
            Err(reason) => {
                tracing::error!("[{}] {}", filename, reason);
                ExtractionOutcome::failure(FailureKind::ExtractionFailure, reason)
            }
        };

        TracedExtraction {
            format,
            variant: Some(variant),
            outcome,
            attempts,
        }
    }

    /// Primary method, then fallback; `Err` carries the failure reason
    fn run_extractors(
        &self,
        format: DocumentFormat,
        variant: ExtractionVariant,
        path: &Path,
        filename: &str,
        attempts: &mut Vec<ParserAttempt>,
    ) -> std::result::Result<String, String> {
        let extractor = self.registry.get(format);
        let primary_name = extractor.as_ref().map(|e| e.name()).unwrap_or("unregistered");

        // Blank primary output counts as a failure so the fallback gets a chance
        let primary = attempt(primary_name, attempts, || match &extractor {
            Some(extractor) => extractor
                .try_primary(path, variant)
                .and_then(|text| require_text(text, primary_name)),
            None => Err(Error::extraction(
                "unregistered",
                format!("no parser built for {}", format.display_name()),
            )),
        });

        let primary_error = match primary {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        tracing::warn!(
            "[{}] {} failed ({}), falling back to {}",
            filename,
            primary_name,
            primary_error,
            FALLBACK_METHOD
        );

        let scanner = self.registry.scanner();
        attempt(FALLBACK_METHOD, attempts, || match &extractor {
            Some(extractor) => extractor.try_fallback(path, scanner),
            None => scanner.scan_file(path),
        })
        .map_err(|fallback_error| {
            format!(
                "Failed to extract text from '{}' ({}): {}: {}; {}: {}",
                filename,
                format.display_name(),
                primary_name,
                primary_error,
                FALLBACK_METHOD,
                fallback_error
            )
        })
    }

    /// Compression then the ceiling, in that order, so the truncation marker survives
    fn finish(&self, text: String, filename: &str) -> String {
        let raw_len = text.len();
        let text = if self.config.compression.enabled {
            self.compressor.compress(&text)
        } else {
            text
        };
        let text = self.dispatcher.enforce_ceiling(text);

        tracing::info!(
            "[{}] Extracted {} bytes (raw {} bytes)",
            filename,
            text.len(),
            raw_len
        );
        text
    }
}

/// Run one extraction method, converting errors and panics into a message
fn attempt<F>(method: &str, attempts: &mut Vec<ParserAttempt>, f: F) -> std::result::Result<String, String>
where
    F: FnOnce() -> Result<String>,
{
    let started = Instant::now();
    let result = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(describe(&e)),
        Err(payload) => Err(format!("parser panicked: {}", panic_message(payload.as_ref()))),
    };

    attempts.push(ParserAttempt {
        method: method.to_string(),
        success: result.is_ok(),
        error: result.as_ref().err().cloned(),
        chars_extracted: result.as_ref().ok().map(|t| t.chars().count()),
        duration_ms: started.elapsed().as_millis() as u64,
    });

    result
}

fn require_text(text: String, method: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(Error::extraction(method, "no text extracted"))
    } else {
        Ok(text)
    }
}

/// Error text without the artifact name, which means nothing to the uploader
fn describe(error: &Error) -> String {
    match error {
        Error::Extraction { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::RawScanner;
    use std::sync::Arc;

    struct PanickingExtractor;

    impl FormatExtractor for PanickingExtractor {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn try_primary(&self, _path: &Path, _variant: ExtractionVariant) -> Result<String> {
            panic!("font table corrupted");
        }
    }

    struct FailingExtractor;

    impl FormatExtractor for FailingExtractor {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn try_primary(&self, _path: &Path, _variant: ExtractionVariant) -> Result<String> {
            Err(Error::extraction("failing", "bad header"))
        }

        fn try_fallback(&self, _path: &Path, _scanner: &RawScanner) -> Result<String> {
            Err(Error::extraction("failing", "nothing readable"))
        }
    }

    fn test_config(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.staging.dir = dir.to_path_buf();
        config
    }

    fn pipeline_with(dir: &Path, format: DocumentFormat, extractor: Arc<dyn FormatExtractor>) -> ExtractionPipeline {
        let config = test_config(dir);
        let mut registry = ExtractorRegistry::from_config(&config);
        registry.register(format, extractor);
        ExtractionPipeline::with_registry(config, registry).unwrap()
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_text_success() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(test_config(dir.path())).unwrap();

        let outcome = pipeline.extract(b"Students learn to compare fractions.", "notes.txt");
        assert_eq!(outcome.text(), Some("Students learn to compare fractions."));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn test_unsupported_never_stages() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        let pipeline = ExtractionPipeline::new(test_config(&staging)).unwrap();

        let traced = pipeline.extract_with_trace(b"MZ\x90\x00", "setup.exe");
        assert_eq!(traced.outcome.failure_kind(), Some(FailureKind::UnsupportedFormat));
        assert!(traced.outcome.reason().unwrap().contains("Unsupported"));
        assert!(traced.outcome.reason().unwrap().contains("exe"));
        assert!(traced.attempts.is_empty());
        assert!(!staging.exists());
    }

    #[test]
    fn test_panicking_primary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), DocumentFormat::Pdf, Arc::new(PanickingExtractor));

        let traced = pipeline.extract_with_trace(b"\x00\x01Learning objectives for unit one\x00", "unit.pdf");
        assert_eq!(traced.outcome.text(), Some("Learning objectives for unit one"));
        assert_eq!(traced.attempts.len(), 2);
        assert!(!traced.attempts[0].success);
        assert!(traced.attempts[0].error.as_deref().unwrap().contains("font table corrupted"));
        assert_eq!(traced.attempts[1].method, "raw-scan");
        assert!(traced.attempts[1].success);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn test_both_methods_failing_reports_both_causes() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), DocumentFormat::Word, Arc::new(FailingExtractor));

        let outcome = pipeline.extract(b"garbage", "plan.docx");
        assert_eq!(outcome.failure_kind(), Some(FailureKind::ExtractionFailure));
        let reason = outcome.reason().unwrap();
        assert!(reason.contains("'plan.docx'"));
        assert!(!reason.contains("''"));
        assert!(reason.contains("bad header"));
        assert!(reason.contains("nothing readable"));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn test_empty_primary_output_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(test_config(dir.path())).unwrap();

        let traced = pipeline.extract_with_trace(b"   \n\n  ", "blank.txt");
        assert_eq!(traced.outcome.text(), Some(""));
        assert_eq!(traced.attempts.len(), 2);
        assert!(!traced.attempts[0].success);
        assert!(traced.attempts[1].success);
    }

    #[test]
    fn test_staging_failure_is_resource_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let pipeline = ExtractionPipeline::new(test_config(&blocker)).unwrap();

        let outcome = pipeline.extract(b"text", "notes.txt");
        assert_eq!(outcome.failure_kind(), Some(FailureKind::ResourceFailure));
    }

    #[test]
    fn test_compression_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.compression.enabled = false;
        let pipeline = ExtractionPipeline::new(config).unwrap();

        let outcome = pipeline.extract(b"Page 1\n\nPage 1\n\nPage 1", "notes.txt");
        assert_eq!(outcome.text(), Some("Page 1\n\nPage 1\n\nPage 1"));
    }

    #[test]
    fn test_report_carries_size_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(test_config(dir.path())).unwrap();
        let document = SourceDocument::new("Standards.MD", b"Standard 4.2: students evaluate claims".to_vec());

        let report = pipeline.extract_report(&document);
        assert_eq!(report.format, DocumentFormat::PlainText);
        assert_eq!(report.size, 38);
        assert!(report.outcome.is_success());
    }
}
