//! curriculum-ingest: curriculum document ingestion and compression
//!
//! Turns heterogeneous curriculum uploads (PDF, Word, Excel, PowerPoint and
//! plain text) into bounded, compressed text for downstream analysis. Every
//! supported format degrades to a raw printable-run scan when its structural
//! parser fails, large inputs take cheaper extraction paths, and the returned
//! text never exceeds a configured ceiling.

#![warn(missing_docs)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod processing;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use processing::{BatchWorker, ExtractionPipeline, ExtractionVariant};
pub use types::{
    DocumentFormat, DocumentRecord, DocumentReport, ExtractionOutcome, FailureKind, SourceDocument,
};
