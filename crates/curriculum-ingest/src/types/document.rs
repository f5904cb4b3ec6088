//! Document types: detected formats, upload inputs and persisted records

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Closed set of formats the pipeline knows how to extract
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Plain text or markdown
    PlainText,
    /// PDF document
    Pdf,
    /// Word document (.docx, legacy .doc)
    Word,
    /// Spreadsheet (.xlsx, .xls, .ods, ...)
    Excel,
    /// Presentation (.pptx, legacy .ppt)
    PowerPoint,
    /// Extension not in the known set
    Unsupported,
}

impl DocumentFormat {
    /// Map a file extension (without the dot) to a format, case-insensitively
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" | "md" | "markdown" => Self::PlainText,
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Word,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::Excel,
            "pptx" | "ppt" => Self::PowerPoint,
            _ => Self::Unsupported,
        }
    }

    /// Check if this format can be extracted
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// All supported formats
    pub fn supported() -> [DocumentFormat; 5] {
        [
            Self::PlainText,
            Self::Pdf,
            Self::Word,
            Self::Excel,
            Self::PowerPoint,
        ]
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PlainText => "Text File",
            Self::Pdf => "PDF",
            Self::Word => "Word Document",
            Self::Excel => "Excel Spreadsheet",
            Self::PowerPoint => "PowerPoint",
            Self::Unsupported => "Unsupported",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainText => write!(f, "plaintext"),
            Self::Pdf => write!(f, "pdf"),
            Self::Word => write!(f, "word"),
            Self::Excel => write!(f, "excel"),
            Self::PowerPoint => write!(f, "powerpoint"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// An uploaded document: raw bytes plus the declared filename
///
/// Constructed once per upload and never mutated. Cloning is cheap since the
/// bytes are reference counted.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    filename: String,
    data: Bytes,
}

impl SourceDocument {
    /// Create a new source document
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Declared filename
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Value handed to the persistence layer for each successfully extracted document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Original filename as uploaded
    pub name: String,
    /// Detected format
    pub format: DocumentFormat,
    /// MIME type guessed from the filename
    pub mime_type: String,
    /// Upload size in bytes
    pub size: u64,
    /// Final (compressed, bounded) text
    pub extracted_text: String,
    /// SHA-256 of `extracted_text` for deduplication
    pub content_hash: String,
}

impl DocumentRecord {
    /// Build the record for a source document and its extracted text
    pub fn new(source: &SourceDocument, format: DocumentFormat, extracted_text: String) -> Self {
        Self::from_parts(source.filename(), format, source.size(), extracted_text)
    }

    /// Build a record from its individual parts
    pub fn from_parts(name: &str, format: DocumentFormat, size: u64, extracted_text: String) -> Self {
        Self {
            name: name.to_string(),
            format,
            mime_type: mime_type_for(name),
            size,
            content_hash: hash_content(&extracted_text),
            extracted_text,
        }
    }
}

/// Guess a MIME type from the filename
pub fn mime_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Hash content for deduplication
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_extension("Docx"), DocumentFormat::Word);
        assert_eq!(DocumentFormat::from_extension("XLSX"), DocumentFormat::Excel);
        assert_eq!(DocumentFormat::from_extension("pPtX"), DocumentFormat::PowerPoint);
        assert_eq!(DocumentFormat::from_extension("md"), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_extension("exe"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_extension(""), DocumentFormat::Unsupported);
    }

    #[test]
    fn test_record_carries_hash_and_mime() {
        let source = SourceDocument::new("unit-plan.pdf", b"%PDF-1.4".to_vec());
        let record = DocumentRecord::new(&source, DocumentFormat::Pdf, "hello".to_string());

        assert_eq!(record.name, "unit-plan.pdf");
        assert_eq!(record.mime_type, "application/pdf");
        assert_eq!(record.size, 8);
        assert_eq!(
            record.content_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_format_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentFormat::PowerPoint).unwrap();
        assert_eq!(json, "\"powerpoint\"");
        let parsed: DocumentFormat = serde_json::from_str("\"excel\"").unwrap();
        assert_eq!(parsed, DocumentFormat::Excel);
    }
}
