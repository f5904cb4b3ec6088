//! Per-format text extractors
//!
//! Every extractor exposes a primary structural method and a fallback. The
//! fallback defaults to the shared [`RawScanner`], so every supported format
//! degrades to printable-run recovery when its parser gives up.

mod command;
mod excel;
mod pdf;
mod powerpoint;
mod raw_scan;
mod text;
mod word;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ExtractionBackend, PipelineConfig};
use crate::error::Result;
use crate::processing::ExtractionVariant;
use crate::types::DocumentFormat;

pub use command::{run_with_limits, CommandExtractor, ExternalTool, ExternalToolConfig};
pub use excel::ExcelExtractor;
pub use pdf::PdfExtractor;
pub use powerpoint::PowerPointExtractor;
pub use raw_scan::RawScanner;
pub use text::TextExtractor;
pub use word::WordExtractor;

/// A text extractor for one document format
///
/// Implementations are synchronous and blocking; callers run them on a
/// blocking thread. They read the staged artifact from disk and never
/// delete it.
pub trait FormatExtractor: Send + Sync {
    /// Name of the primary method, used in logs and parser attempts
    fn name(&self) -> &'static str;

    /// Structural extraction
    fn try_primary(&self, path: &Path, variant: ExtractionVariant) -> Result<String>;

    /// Format-agnostic recovery after the primary method failed
    fn try_fallback(&self, path: &Path, scanner: &RawScanner) -> Result<String> {
        scanner.scan_file(path)
    }
}

/// Registry mapping formats to extractors
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentFormat, Arc<dyn FormatExtractor>>,
    scanner: RawScanner,
}

impl ExtractorRegistry {
    /// Create an empty registry around a fallback scanner
    pub fn new(scanner: RawScanner) -> Self {
        Self {
            extractors: HashMap::new(),
            scanner,
        }
    }

    /// Build the registry for a pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let scanner = RawScanner::new(
            config.extraction.raw_scan_min_run,
            config.dispatch.max_text_bytes,
        );
        let mut registry = Self::new(scanner.clone());
        let external = &config.extraction.external;
        let use_external = config.extraction.backend == ExtractionBackend::External;

        registry.register(DocumentFormat::PlainText, Arc::new(TextExtractor));

        if cfg!(feature = "pdf") {
            let native = PdfExtractor::new(
                std::time::Duration::from_secs(config.extraction.pdf_parse_timeout_secs),
                scanner,
            );
            if use_external && ExternalTool::Pdftotext.is_available(external) {
                registry.register(
                    DocumentFormat::Pdf,
                    Arc::new(CommandExtractor::new(ExternalTool::Pdftotext, external.clone())),
                );
            } else {
                if use_external {
                    tracing::warn!("pdftotext not available, using native PDF extraction");
                }
                registry.register(DocumentFormat::Pdf, Arc::new(native));
            }
        }

        let office_formats = [
            (DocumentFormat::Word, cfg!(feature = "docx")),
            (DocumentFormat::PowerPoint, cfg!(feature = "pptx")),
        ];
        let pandoc = use_external
            && office_formats.iter().any(|(_, enabled)| *enabled)
            && ExternalTool::Pandoc.is_available(external);
        if use_external && !pandoc {
            tracing::warn!("pandoc not available, using native Word and PowerPoint extraction");
        }
        for (format, enabled) in office_formats {
            if !enabled {
                continue;
            }
            let extractor: Arc<dyn FormatExtractor> = if pandoc {
                Arc::new(CommandExtractor::new(ExternalTool::Pandoc, external.clone()))
            } else if format == DocumentFormat::Word {
                Arc::new(WordExtractor)
            } else {
                Arc::new(PowerPointExtractor)
            };
            registry.register(format, extractor);
        }

        if cfg!(feature = "xlsx") {
            registry.register(
                DocumentFormat::Excel,
                Arc::new(ExcelExtractor::new(config.dispatch.excel_fast_row_limit)),
            );
        }

        tracing::debug!(
            "Extractor registry ready: {} formats, backend {:?}",
            registry.extractors.len(),
            config.extraction.backend
        );

        registry
    }

    /// Register (or replace) the extractor for a format
    pub fn register(&mut self, format: DocumentFormat, extractor: Arc<dyn FormatExtractor>) {
        self.extractors.insert(format, extractor);
    }

    /// Extractor for a format, if one is registered
    pub fn get(&self, format: DocumentFormat) -> Option<Arc<dyn FormatExtractor>> {
        self.extractors.get(&format).cloned()
    }

    /// Shared fallback scanner
    pub fn scanner(&self) -> &RawScanner {
        &self.scanner
    }

    /// Formats with a registered extractor
    pub fn formats(&self) -> Vec<DocumentFormat> {
        let mut formats: Vec<_> = self.extractors.keys().copied().collect();
        formats.sort();
        formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_supported_formats() {
        let registry = ExtractorRegistry::from_config(&PipelineConfig::default());
        assert_eq!(registry.formats(), DocumentFormat::supported().to_vec());
        assert!(registry.get(DocumentFormat::Unsupported).is_none());
        assert_eq!(registry.get(DocumentFormat::Pdf).unwrap().name(), "pdf-extract");
    }

    fn external_config(pdftotext: &str, pandoc: &str) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.extraction.backend = ExtractionBackend::External;
        config.extraction.external.pdftotext_path = pdftotext.to_string();
        config.extraction.external.pandoc_path = pandoc.to_string();
        config
    }

    #[cfg(unix)]
    #[test]
    fn test_external_backend_routes_office_formats_to_pandoc() {
        // `true` accepts any flag and exits 0, so both tools look installed
        let registry = ExtractorRegistry::from_config(&external_config("true", "true"));
        assert_eq!(registry.get(DocumentFormat::Pdf).unwrap().name(), "pdftotext");
        assert_eq!(registry.get(DocumentFormat::Word).unwrap().name(), "pandoc");
        assert_eq!(registry.get(DocumentFormat::PowerPoint).unwrap().name(), "pandoc");
        assert_eq!(registry.get(DocumentFormat::Excel).unwrap().name(), "calamine");
    }

    #[test]
    fn test_external_backend_without_tools_keeps_native_parsers() {
        let registry = ExtractorRegistry::from_config(&external_config(
            "/nonexistent/pdftotext",
            "/nonexistent/pandoc",
        ));
        assert_eq!(registry.get(DocumentFormat::Pdf).unwrap().name(), "pdf-extract");
        assert_eq!(registry.get(DocumentFormat::Word).unwrap().name(), "docx-rs");
        assert_eq!(registry.get(DocumentFormat::PowerPoint).unwrap().name(), "pptx-xml");
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = ExtractorRegistry::new(RawScanner::default());
        registry.register(DocumentFormat::Pdf, Arc::new(TextExtractor));
        assert_eq!(registry.get(DocumentFormat::Pdf).unwrap().name(), "utf8-text");

        registry.register(DocumentFormat::Pdf, Arc::new(WordExtractor));
        assert_eq!(registry.get(DocumentFormat::Pdf).unwrap().name(), "docx-rs");
    }
}
