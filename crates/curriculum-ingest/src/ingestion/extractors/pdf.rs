//! PDF extraction
//!
//! Full extraction runs pdf-extract on a watchdog thread, since some fonts
//! make it spin for minutes, then falls back to lopdf's text operators. Fast
//! extraction skips structural parsing entirely and scans raw bytes.

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use super::{FormatExtractor, RawScanner};
use crate::error::{Error, Result};
use crate::processing::ExtractionVariant;

/// Glyph names some PDF fonts leak into extracted text, with plain replacements
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
    ("uni2212", "-"),
];

/// Typographic characters mapped to ASCII approximations
const TYPOGRAPHIC: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up PDF text: replace leaked glyph names and typographic characters,
/// strip NULs and trim each line. Blank lines survive since they separate
/// paragraphs.
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (glyph, replacement) in GLYPH_NAMES {
        if result.contains(glyph) {
            result = result.replace(glyph, replacement);
        }
    }
    for (ch, replacement) in TYPOGRAPHIC {
        if result.contains(*ch) {
            result = result.replace(*ch, replacement);
        }
    }

    result
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// PDF extractor
pub struct PdfExtractor {
    parse_timeout: Duration,
    scanner: RawScanner,
}

impl PdfExtractor {
    /// Create a new PDF extractor
    pub fn new(parse_timeout: Duration, scanner: RawScanner) -> Self {
        Self {
            parse_timeout,
            scanner,
        }
    }

    /// Run pdf-extract on a separate thread, giving up after the watchdog limit
    ///
    /// A timed-out thread cannot be killed; it is detached and finishes (or
    /// not) on its own while the caller moves on.
    fn extract_with_timeout(&self, data: Arc<Vec<u8>>) -> Result<String> {
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("pdf-extract".to_string())
            .spawn(move || {
                let result = pdf_extract::extract_text_from_mem(&data);
                let _ = tx.send(result.map_err(|e| e.to_string()));
            })
            .map_err(|e| Error::internal(format!("Failed to spawn PDF parser thread: {}", e)))?;

        match rx.recv_timeout(self.parse_timeout) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::extraction("pdf-extract", e))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF parsing timed out after {}s, font handling may be stuck",
                    self.parse_timeout.as_secs()
                );
                Err(Error::timeout("pdf-extract", self.parse_timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // The parser panicked before sending a result
                let _ = handle.join();
                Err(Error::extraction("pdf-extract", "parser thread crashed"))
            }
        }
    }

    /// Page-by-page extraction through lopdf's text operators
    fn extract_with_lopdf(data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction("lopdf", format!("Failed to load PDF: {}", e)))?;

        let mut pages_text = Vec::new();
        for (page_num, page_id) in doc.get_pages() {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) | Err(_) => match doc.get_page_content(page_id) {
                    Ok(content) => scan_text_operators(&content),
                    Err(e) => {
                        tracing::debug!("Could not get content for page {}: {}", page_num, e);
                        continue;
                    }
                },
            };
            if !text.trim().is_empty() {
                pages_text.push(text);
            }
        }

        if pages_text.is_empty() {
            return Err(Error::extraction(
                "lopdf",
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(pages_text.join("\n\n"))
    }
}

impl FormatExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn try_primary(&self, path: &Path, variant: ExtractionVariant) -> Result<String> {
        if variant == ExtractionVariant::Fast {
            tracing::info!("Large PDF, skipping structural parsing for raw scan");
            return self.scanner.scan_file(path);
        }

        let data = Arc::new(std::fs::read(path)?);
        let text = match self.extract_with_timeout(Arc::clone(&data)) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("pdf-extract returned no text, trying lopdf");
                Self::extract_with_lopdf(&data)?
            }
            Err(e) => {
                tracing::warn!("{}, trying lopdf", e);
                Self::extract_with_lopdf(&data)?
            }
        };

        Ok(cleanup_pdf_text(&text))
    }
}

/// Pull literal strings out of Tj/TJ operators inside BT/ET blocks
fn scan_text_operators(content: &[u8]) -> String {
    let content = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current = String::new();

    for line in content.lines().map(str::trim) {
        match line {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                if !current.is_empty() {
                    text.push_str(current.trim_end());
                    text.push('\n');
                    current.clear();
                }
            }
            _ if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) => {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        current.push_str(&decode_literal(&line[start + 1..end]));
                        current.push(' ');
                    }
                }
            }
            _ => {}
        }
    }

    text
}

fn decode_literal(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\(", "(")
        .replace("\\)", ")")
        .replace("\\\\", "\\")
}
