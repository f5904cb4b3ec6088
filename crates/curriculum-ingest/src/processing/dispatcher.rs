//! Size-aware dispatch and the output ceiling
//!
//! Large uploads of formats whose structural parsers scale badly get a fast
//! extraction variant. Whatever comes back is bounded by an absolute ceiling
//! that keeps the head and tail of the text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::DispatchConfig;
use crate::types::DocumentFormat;

/// Which extraction path a document takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionVariant {
    /// Complete structural extraction
    Full,
    /// Cheaper extraction for oversized inputs
    Fast,
}

impl std::fmt::Display for ExtractionVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionVariant::Full => write!(f, "full"),
            ExtractionVariant::Fast => write!(f, "fast"),
        }
    }
}

/// Chooses extraction variants and enforces the text ceiling
#[derive(Debug, Clone)]
pub struct SizeDispatcher {
    fast_thresholds: BTreeMap<DocumentFormat, u64>,
    max_text_bytes: usize,
}

impl SizeDispatcher {
    /// Create a dispatcher from configuration
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            fast_thresholds: config.fast_thresholds.clone(),
            max_text_bytes: config.max_text_bytes,
        }
    }

    /// Pick the variant for a document of the given format and declared size
    pub fn select(&self, format: DocumentFormat, size: u64) -> ExtractionVariant {
        match self.fast_thresholds.get(&format) {
            Some(&threshold) if size >= threshold => ExtractionVariant::Fast,
            _ => ExtractionVariant::Full,
        }
    }

    /// Ceiling on returned text in bytes
    pub fn max_text_bytes(&self) -> usize {
        self.max_text_bytes
    }

    /// Bound text to the ceiling, keeping its head and tail
    pub fn enforce_ceiling(&self, text: String) -> String {
        if text.len() <= self.max_text_bytes {
            return text;
        }
        tracing::info!(
            "Truncating extracted text from {} to at most {} bytes",
            text.len(),
            self.max_text_bytes
        );
        truncate_middle(&text, self.max_text_bytes)
    }
}

fn truncation_marker(omitted: usize) -> String {
    format!("\n\n[... {} bytes omitted ...]\n\n", omitted)
}

/// Keep the head and tail of `text` around a marker so the result fits `ceiling`
///
/// Cuts land on grapheme cluster boundaries, so the result is always valid
/// UTF-8 and never splits a character. Text already within the ceiling is
/// returned unchanged.
pub fn truncate_middle(text: &str, ceiling: usize) -> String {
    if text.len() <= ceiling {
        return text.to_string();
    }

    // Sized for the largest possible omission so the final marker never exceeds it
    let marker_budget = truncation_marker(text.len()).len();
    let available = ceiling.saturating_sub(marker_budget);
    let head_target = available / 2;
    let tail_target = available - head_target;

    let mut head_end = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let end = idx + grapheme.len();
        if end > head_target {
            break;
        }
        head_end = end;
    }

    let tail_limit = text.len() - tail_target;
    let mut tail_start = text.len();
    for (idx, _) in text.grapheme_indices(true).rev() {
        if idx < tail_limit || idx < head_end {
            break;
        }
        tail_start = idx;
    }

    let omitted = tail_start - head_end;
    let mut result = String::with_capacity(head_end + marker_budget + (text.len() - tail_start));
    result.push_str(&text[..head_end]);
    result.push_str(&truncation_marker(omitted));
    result.push_str(&text[tail_start..]);
    result
}
