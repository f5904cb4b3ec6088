//! Relevance-preserving text compression
//!
//! Shrinks extracted text before it reaches the analysis service: normalizes
//! whitespace, drops short and duplicate paragraphs, and keeps paragraphs that
//! look instructional. Output is never longer than the input and compressing
//! twice gives the same result as compressing once.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CompressionConfig;

static HORIZONTAL_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\x0B\x0C]+").expect("valid whitespace pattern"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line pattern"));

/// Text compressor
#[derive(Debug, Clone)]
pub struct TextCompressor {
    min_paragraph_chars: usize,
    long_paragraph_chars: usize,
    min_retained_paragraphs: usize,
    keywords: Vec<String>,
}

impl TextCompressor {
    /// Create a compressor from configuration
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            min_paragraph_chars: config.min_paragraph_chars,
            long_paragraph_chars: config.long_paragraph_chars,
            min_retained_paragraphs: config.min_retained_paragraphs,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Compress extracted text
    pub fn compress(&self, text: &str) -> String {
        let normalized = normalize(text);

        let mut seen = HashSet::new();
        let unique: Vec<&str> = split_paragraphs(&normalized)
            .filter(|p| p.chars().count() >= self.min_paragraph_chars)
            .filter(|p| seen.insert(*p))
            .collect();

        let relevant: Vec<&str> = unique.iter().copied().filter(|p| self.is_relevant(p)).collect();

        // Too little survived the filter; the keywords don't fit this document
        let kept = if relevant.len() < self.min_retained_paragraphs {
            unique
        } else {
            relevant
        };

        kept.join("\n\n")
    }

    fn is_relevant(&self, paragraph: &str) -> bool {
        if paragraph.chars().count() > self.long_paragraph_chars {
            return true;
        }
        let lower = paragraph.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for TextCompressor {
    fn default() -> Self {
        Self::new(&CompressionConfig::default())
    }
}

/// Normalize line endings and whitespace
///
/// Line endings become `\n`, runs of spaces and tabs collapse to one space,
/// lines are trimmed and three or more consecutive newlines become two.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| HORIZONTAL_WS.replace_all(line.trim(), " ").into_owned())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(joined.trim(), "\n\n").into_owned()
}

/// Non-empty paragraphs of normalized text
pub fn split_paragraphs(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
}
