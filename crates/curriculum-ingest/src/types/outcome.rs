//! Extraction outcomes and per-document diagnostics

use serde::{Deserialize, Serialize};

use super::{DocumentFormat, DocumentRecord};
use crate::error::{Error, Result};

/// Why an extraction did not produce text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Extension not in the known set; a validation failure, not retryable
    UnsupportedFormat,
    /// Primary and fallback extraction both failed
    ExtractionFailure,
    /// The temporary artifact could not be staged
    ResourceFailure,
}

/// Result of one extraction call
///
/// Exactly one of text or reason exists; the enum makes it impossible to read
/// text off a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Extraction finished; text may be empty
    Success {
        /// Compressed, bounded text; may be empty
        text: String,
    },
    /// Extraction failed with a human-readable reason
    Failure {
        /// Category used for batch summaries
        kind: FailureKind,
        /// Message naming the file and each failed method
        reason: String,
    },
}

impl ExtractionOutcome {
    /// Create a success outcome
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    /// Create a failure outcome
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            reason: reason.into(),
        }
    }

    /// Whether extraction produced text (possibly empty)
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Extracted text, if successful
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text } => Some(text),
            Self::Failure { .. } => None,
        }
    }

    /// Failure reason, if failed
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }

    /// Failure tag, if failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Convert into a `Result`, mapping each failure kind to its error variant
    pub fn into_result(self) -> Result<String> {
        match self {
            Self::Success { text } => Ok(text),
            Self::Failure { kind, reason } => Err(match kind {
                FailureKind::UnsupportedFormat => Error::UnsupportedFormat(reason),
                FailureKind::ExtractionFailure => Error::extraction("pipeline", reason),
                FailureKind::ResourceFailure => Error::Resource(reason),
            }),
        }
    }
}

/// Record of a single extraction attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserAttempt {
    /// Extraction method name
    pub method: String,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Number of characters extracted (if successful)
    pub chars_extracted: Option<usize>,
    /// Duration of the attempt in milliseconds
    pub duration_ms: u64,
}

/// Per-document result of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Original filename
    pub filename: String,
    /// Upload size in bytes
    pub size: u64,
    /// Detected format
    pub format: DocumentFormat,
    /// Final outcome
    pub outcome: ExtractionOutcome,
    /// Every method tried, in order
    pub attempts: Vec<ParserAttempt>,
    /// Wall-clock time for the whole document
    pub duration_ms: u64,
}

impl DocumentReport {
    /// Persistence record for a successful extraction
    pub fn to_record(&self) -> Option<DocumentRecord> {
        self.outcome.text().map(|text| {
            DocumentRecord::from_parts(&self.filename, self.format, self.size, text.to_string())
        })
    }
}
