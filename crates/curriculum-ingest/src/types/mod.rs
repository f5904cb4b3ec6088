//! Core types for the ingestion pipeline

pub mod document;
pub mod outcome;

pub use document::{hash_content, mime_type_for, DocumentFormat, DocumentRecord, SourceDocument};
pub use outcome::{DocumentReport, ExtractionOutcome, FailureKind, ParserAttempt};
