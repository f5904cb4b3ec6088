//! Error types for the ingestion pipeline

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Variants are tagged at the point of failure so callers branch on the
/// variant, never on the rendered message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File extension not in the known set
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// An extraction method failed for a supported format
    ///
    /// The pipeline prefixes the filename when it records the failure.
    #[error("{method} failed: {message}")]
    Extraction {
        /// Extraction method that failed
        method: String,
        /// Cause reported by the method
        message: String,
    },

    /// Temporary artifact could not be written or removed
    #[error("Resource error: {0}")]
    Resource(String),

    /// External tool or parser exceeded its time budget
    #[error("{operation} timed out after {secs}s", secs = .limit.as_secs())]
    Timeout {
        /// Tool or parser that was stopped
        operation: String,
        /// Budget that was exceeded
        limit: Duration,
    },

    /// External tool produced more output than allowed
    #[error("{operation} exceeded the output limit of {limit} bytes")]
    OutputLimit {
        /// Tool that was stopped
        operation: String,
        /// Output ceiling in bytes
        limit: usize,
    },

    /// Upload rejected by the caller-side limits
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Analysis service asked us to back off
    #[error("Analysis service rate limited the request")]
    RateLimited {
        /// Delay requested by the service, if it sent one
        retry_after: Option<Duration>,
    },

    /// Analysis service failed
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create a resource error
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit,
        }
    }

    /// Create an analysis error
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the analysis boundary should retry this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}
