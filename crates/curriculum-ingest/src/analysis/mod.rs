//! Analysis boundary: retrying calls to the analysis service and caching results

mod analyzer;
mod cache;
mod service;

pub use analyzer::{analyze_with_retry, CurriculumAnalyzer, GapAnalysis, RetryPolicy};
pub use cache::{AnalysisCache, CacheStats, ResultCache};
pub use service::AnalysisService;
