//! Configuration for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::RetryPolicy;
use crate::error::{Error, Result};
use crate::ingestion::ExternalToolConfig;
use crate::types::DocumentFormat;

const MB: u64 = 1024 * 1024;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Temporary artifact staging
    #[serde(default)]
    pub staging: StagingConfig,
    /// Size-aware dispatch thresholds and output ceiling
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Text compression heuristics
    #[serde(default)]
    pub compression: CompressionConfig,
    /// Extractor selection and limits
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Batch processing
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Caller-side upload ceilings
    #[serde(default)]
    pub upload: UploadLimits,
    /// Analysis boundary (cache and retry)
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else the default location if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => {
                tracing::info!("Loading configuration from {}", default.display());
                Self::from_file(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Default config file location (`<config dir>/curriculum-ingest/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("curriculum-ingest").join("config.toml"))
    }

    /// Reject settings that would break pipeline invariants
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.max_text_bytes < MIN_TEXT_CEILING {
            return Err(Error::Config(format!(
                "dispatch.max_text_bytes must be at least {} bytes",
                MIN_TEXT_CEILING
            )));
        }
        if self.dispatch.excel_fast_row_limit == 0 {
            return Err(Error::Config(
                "dispatch.excel_fast_row_limit must be greater than zero".to_string(),
            ));
        }
        if self.extraction.raw_scan_min_run == 0 {
            return Err(Error::Config(
                "extraction.raw_scan_min_run must be greater than zero".to_string(),
            ));
        }
        if self.processing.max_concurrent_documents == Some(0) {
            return Err(Error::Config(
                "processing.max_concurrent_documents must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Smallest ceiling that still leaves room for head, tail and the truncation marker
pub const MIN_TEXT_CEILING: usize = 1024;

/// Temporary artifact staging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory artifacts are written to
    pub dir: PathBuf,
    /// Name prefix for staged files
    pub prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("curriculum-ingest"),
            prefix: "upload".to_string(),
        }
    }
}

/// Size-aware dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Uploads at or above these sizes use the fast extraction variant.
    /// Formats without an entry always use full extraction.
    #[serde(default = "default_fast_thresholds")]
    pub fast_thresholds: BTreeMap<DocumentFormat, u64>,
    /// Absolute ceiling on returned text, in bytes (default: 5MB)
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: usize,
    /// Data rows kept by fast spreadsheet extraction
    #[serde(default = "default_excel_fast_row_limit")]
    pub excel_fast_row_limit: usize,
}

fn default_fast_thresholds() -> BTreeMap<DocumentFormat, u64> {
    BTreeMap::from([
        (DocumentFormat::Pdf, 50 * MB),
        (DocumentFormat::Excel, 20 * MB),
    ])
}
fn default_max_text_bytes() -> usize { 5 * MB as usize }
fn default_excel_fast_row_limit() -> usize { 2000 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fast_thresholds: default_fast_thresholds(),
            max_text_bytes: default_max_text_bytes(),
            excel_fast_row_limit: default_excel_fast_row_limit(),
        }
    }
}

/// Text compression configuration
///
/// The thresholds and keywords are empirical; tune them here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Run the compressor on extracted text
    pub enabled: bool,
    /// Paragraphs shorter than this (in chars) are dropped as headers/footers
    pub min_paragraph_chars: usize,
    /// Paragraphs longer than this are kept without a keyword hit
    pub long_paragraph_chars: usize,
    /// Below this many filtered paragraphs the relevance filter is abandoned
    pub min_retained_paragraphs: usize,
    /// Case-insensitive keywords marking instructional content
    pub keywords: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_paragraph_chars: 10,
            long_paragraph_chars: 100,
            min_retained_paragraphs: 5,
            keywords: [
                "standard",
                "objective",
                "learn",
                "student",
                "assessment",
                "skill",
                "concept",
                "understand",
                "analyze",
                "evaluate",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

/// Which implementation backs the primary extraction methods
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    /// In-process parsers (pdf-extract, docx-rs, calamine, zip + quick-xml)
    #[default]
    Native,
    /// Subprocess tools (pdftotext, pandoc) where available; native elsewhere
    External,
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Primary extraction backend
    #[serde(default)]
    pub backend: ExtractionBackend,
    /// Watchdog limit for structural PDF parsing (default: 60s)
    #[serde(default = "default_pdf_parse_timeout")]
    pub pdf_parse_timeout_secs: u64,
    /// Minimum printable run length kept by the raw scanner
    #[serde(default = "default_raw_scan_min_run")]
    pub raw_scan_min_run: usize,
    /// External tool settings
    #[serde(default)]
    pub external: ExternalToolConfig,
}

fn default_pdf_parse_timeout() -> u64 { 60 }
fn default_raw_scan_min_run() -> usize { 4 }

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: ExtractionBackend::Native,
            pdf_parse_timeout_secs: default_pdf_parse_timeout(),
            raw_scan_min_run: default_raw_scan_min_run(),
            external: ExternalToolConfig::default(),
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Documents extracted concurrently (default: CPU count, max 8)
    pub max_concurrent_documents: Option<usize>,
}

impl ProcessingConfig {
    /// Resolved concurrency limit
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_documents
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}

/// Per-upload ceilings the caller enforces before invoking the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Maximum number of files per upload
    pub max_files: usize,
    /// Maximum size of a single file in bytes (default: 100MB)
    pub max_file_bytes: u64,
    /// Maximum size of the whole upload in bytes (default: 250MB)
    pub max_total_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_file_bytes: 100 * MB,
            max_total_bytes: 250 * MB,
        }
    }
}

/// Analysis boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum cached analysis results
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Seconds a cached result stays valid (default: 1 hour)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Retry policy for rate-limited analysis calls
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_cache_max_entries() -> usize { 1000 }
fn default_cache_ttl() -> u64 { 3600 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_secs: default_cache_ttl(),
            retry: RetryPolicy::default(),
        }
    }
}
