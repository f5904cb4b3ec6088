//! Extraction orchestration: dispatch, staging and batch processing

mod artifact;
mod dispatcher;
mod pipeline;
mod worker;

pub use artifact::TemporaryArtifact;
pub use dispatcher::{truncate_middle, ExtractionVariant, SizeDispatcher};
pub use pipeline::{ExtractionPipeline, TracedExtraction};
pub use worker::{BatchSummary, BatchWorker};
