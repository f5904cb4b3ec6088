//! Submits extracted documents for analysis and serves results by id

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::analyzer::{analyze_with_retry, CurriculumAnalyzer, GapAnalysis, RetryPolicy};
use super::cache::{AnalysisCache, ResultCache};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::types::DocumentRecord;

/// Separator between documents in the combined analysis input
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Analysis service
pub struct AnalysisService {
    analyzer: Arc<dyn CurriculumAnalyzer>,
    cache: Arc<dyn ResultCache>,
    retry: RetryPolicy,
}

impl AnalysisService {
    /// Create a service with an explicit cache
    pub fn new(analyzer: Arc<dyn CurriculumAnalyzer>, cache: Arc<dyn ResultCache>, retry: RetryPolicy) -> Self {
        Self {
            analyzer,
            cache,
            retry,
        }
    }

    /// Create a service with the in-memory cache from configuration
    pub fn from_config(analyzer: Arc<dyn CurriculumAnalyzer>, config: &AnalysisConfig) -> Self {
        let cache = AnalysisCache::new(config.cache_max_entries, Duration::from_secs(config.cache_ttl_secs));
        Self::new(analyzer, Arc::new(cache), config.retry.clone())
    }

    /// Analyse the extracted text of a set of documents
    ///
    /// Texts are concatenated in input order. The result is cached under its
    /// id before being returned.
    pub async fn analyze(&self, records: &[DocumentRecord]) -> Result<GapAnalysis> {
        if records.is_empty() {
            return Err(Error::analysis("no documents to analyze"));
        }

        let combined = records
            .iter()
            .map(|r| r.extracted_text.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);
        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();

        tracing::info!(
            "Submitting {} documents ({} bytes) to {}",
            records.len(),
            combined.len(),
            self.analyzer.name()
        );

        let result = analyze_with_retry(self.analyzer.as_ref(), &combined, &self.retry).await?;
        let analysis = GapAnalysis::new(names, result);
        self.cache.put(analysis.id.to_string(), analysis.clone());

        tracing::info!("Analysis {} complete", analysis.id);
        Ok(analysis)
    }

    /// Fetch a previously completed analysis
    pub fn fetch(&self, id: &Uuid) -> Option<GapAnalysis> {
        self.cache.get(&id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentFormat;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingAnalyzer {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CurriculumAnalyzer for RecordingAnalyzer {
        fn name(&self) -> &str {
            "recording"
        }

        async fn analyze(&self, text: &str) -> Result<serde_json::Value> {
            self.inputs.lock().push(text.to_string());
            Ok(serde_json::json!({ "gaps": ["fractions"] }))
        }
    }

    fn record(name: &str, text: &str) -> DocumentRecord {
        DocumentRecord::from_parts(name, DocumentFormat::PlainText, text.len() as u64, text.to_string())
    }

    #[tokio::test]
    async fn test_analyze_joins_in_order_and_caches() {
        let analyzer = Arc::new(RecordingAnalyzer::default());
        let service = AnalysisService::from_config(analyzer.clone(), &AnalysisConfig::default());

        let analysis = service
            .analyze(&[record("a.txt", "First unit"), record("b.txt", "Second unit")])
            .await
            .unwrap();

        assert_eq!(analyzer.inputs.lock().as_slice(), ["First unit\n\nSecond unit"]);
        assert_eq!(analysis.document_names, vec!["a.txt", "b.txt"]);
        assert_eq!(service.fetch(&analysis.id), Some(analysis));
        assert_eq!(service.fetch(&Uuid::new_v4()), None);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_input() {
        let service = AnalysisService::from_config(
            Arc::new(RecordingAnalyzer::default()),
            &AnalysisConfig::default(),
        );
        assert!(matches!(service.analyze(&[]).await, Err(Error::Analysis(_))));
    }
}
