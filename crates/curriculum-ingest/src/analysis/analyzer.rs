//! Boundary to the external curriculum analysis service

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Structured gap analysis produced for a set of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    /// Identifier results are fetched by
    pub id: Uuid,
    /// Names of the documents analysed, in submission order
    pub document_names: Vec<String>,
    /// Result as returned by the analysis service
    pub result: serde_json::Value,
    /// When the analysis completed
    pub created_at: DateTime<Utc>,
}

impl GapAnalysis {
    /// Wrap a service result under a fresh id
    pub fn new(document_names: Vec<String>, result: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_names,
            result,
            created_at: Utc::now(),
        }
    }
}

/// External analysis service
///
/// Implementations own prompt construction and transport. They report
/// throttling as [`Error::RateLimited`] so callers can back off.
#[async_trait]
pub trait CurriculumAnalyzer: Send + Sync {
    /// Service name for logging
    fn name(&self) -> &str;

    /// Analyse combined curriculum text
    async fn analyze(&self, text: &str) -> Result<serde_json::Value>;
}

/// Retry policy for rate-limited analysis calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based)
    ///
    /// A server-supplied `retry_after` wins over exponential backoff; both are
    /// capped at `max_backoff_ms`.
    pub fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(self.max_backoff_ms);
        let delay = retry_after.unwrap_or_else(|| {
            let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
            Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
        });
        delay.min(cap)
    }
}

/// Call the analyzer, retrying only rate-limit errors
pub async fn analyze_with_retry(
    analyzer: &dyn CurriculumAnalyzer,
    text: &str,
    policy: &RetryPolicy,
) -> Result<serde_json::Value> {
    let mut retry = 0;
    loop {
        match analyzer.analyze(text).await {
            Ok(result) => return Ok(result),
            Err(Error::RateLimited { retry_after }) if retry < policy.max_retries => {
                let delay = policy.delay(retry, retry_after);
                tracing::warn!(
                    "{} rate limited, retrying in {}ms (attempt {}/{})",
                    analyzer.name(),
                    delay.as_millis(),
                    retry + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
