//! Format detection from the declared filename

use std::path::Path;

use crate::types::DocumentFormat;

/// Maps filenames to formats by extension
///
/// No content sniffing: a misnamed file goes to the wrong primary extractor
/// and recovers through its fallback.
pub struct FormatDetector;

impl FormatDetector {
    /// Detect the format of a filename; anything unknown is `Unsupported`
    pub fn detect(filename: &str) -> DocumentFormat {
        match Self::extension(filename) {
            Some(ext) => DocumentFormat::from_extension(&ext),
            None => DocumentFormat::Unsupported,
        }
    }

    /// Lowercased extension after the last dot, if any
    pub fn extension(filename: &str) -> Option<String> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }
}
