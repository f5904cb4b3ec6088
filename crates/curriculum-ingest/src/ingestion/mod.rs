//! Document ingestion: format detection, per-format extraction and compression

mod compressor;
mod detector;
pub mod extractors;

pub use compressor::{normalize, split_paragraphs, TextCompressor};
pub use detector::FormatDetector;
pub use extractors::{
    CommandExtractor, ExternalTool, ExternalToolConfig, ExtractorRegistry, FormatExtractor,
    RawScanner,
};
