//! Plain text and markdown

use std::path::Path;

use super::FormatExtractor;
use crate::error::Result;
use crate::processing::ExtractionVariant;

/// Decodes the artifact as UTF-8, replacing invalid sequences
pub struct TextExtractor;

impl FormatExtractor for TextExtractor {
    fn name(&self) -> &'static str {
        "utf8-text"
    }

    fn try_primary(&self, path: &Path, _variant: ExtractionVariant) -> Result<String> {
        let data = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&data);
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }
}
