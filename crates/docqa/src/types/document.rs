//! Document, text unit and chunk types with source tracking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// CSV file
    Csv,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
}

impl FileType {
    /// Detect file type from extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Lowercase extension of a path, including the leading dot (empty if none)
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// Detect file type from a path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Csv => "CSV",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
        }
    }
}

/// SHA-256 fingerprint of a document's raw bytes, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a hex digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document version that has been processed into a corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Original filename as uploaded; the registry key
    pub filename: String,
    /// Fingerprint of the raw bytes
    pub fingerprint: ContentHash,
    /// File type
    pub file_type: FileType,
    /// File size in bytes
    pub file_size: u64,
    /// Text units produced by extraction
    pub total_units: u32,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(
        filename: String,
        fingerprint: ContentHash,
        file_type: FileType,
        file_size: u64,
    ) -> Self {
        Self {
            filename,
            fingerprint,
            file_type,
            file_size,
            total_units: 0,
            total_chunks: 0,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information carried from extraction into every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Original filename as uploaded
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page number (1-indexed, PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Slide number (1-indexed, PPTX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_number: Option<u32>,
    /// Sheet name (XLSX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    /// Row range, 1-indexed inclusive (CSV/XLSX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_range: Option<(u32, u32)>,
}

impl ChunkSource {
    /// Source covering a whole document
    pub fn new(filename: impl Into<String>, file_type: FileType) -> Self {
        Self {
            filename: filename.into(),
            file_type,
            page_number: None,
            slide_number: None,
            sheet_name: None,
            row_range: None,
        }
    }

    /// Source for a single PDF page
    pub fn page(filename: impl Into<String>, page: u32) -> Self {
        Self {
            page_number: Some(page),
            ..Self::new(filename, FileType::Pdf)
        }
    }

    /// Format source for display
    pub fn format_reference(&self) -> String {
        let mut parts = vec![self.filename.clone()];

        if let Some(page) = self.page_number {
            parts.push(format!("Page {}", page));
        }

        if let Some(slide) = self.slide_number {
            parts.push(format!("Slide {}", slide));
        }

        if let Some(sheet) = &self.sheet_name {
            parts.push(format!("Sheet: {}", sheet));
        }

        if let Some((start, end)) = self.row_range {
            parts.push(format!("Rows {}-{}", start, end));
        }

        parts.join(", ")
    }
}

/// Plain text produced by an extractor, with its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Extracted text
    pub content: String,
    /// Where the text came from
    pub source: ChunkSource,
}

impl TextUnit {
    /// Create a text unit
    pub fn new(content: String, source: ChunkSource) -> Self {
        Self { content, source }
    }
}

/// A bounded span of extracted text prepared for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,
    /// Source information
    pub source: ChunkSource,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: String, source: ChunkSource, chunk_index: u32) -> Self {
        Self {
            content,
            source,
            chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("xlsx"), Some(FileType::Xlsx));
        assert_eq!(FileType::from_extension("txt"), None);
        assert_eq!(FileType::from_path(Path::new("deck.PPTX")), Some(FileType::Pptx));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(FileType::extension_of(Path::new("notes.TXT")), ".txt");
        assert_eq!(FileType::extension_of(Path::new("README")), "");
    }

    #[test]
    fn test_format_reference() {
        let mut source = ChunkSource::new("sales.xlsx", FileType::Xlsx);
        source.sheet_name = Some("Q1".to_string());
        source.row_range = Some((1, 12));
        assert_eq!(source.format_reference(), "sales.xlsx, Sheet: Q1, Rows 1-12");

        assert_eq!(ChunkSource::page("report.pdf", 3).format_reference(), "report.pdf, Page 3");
    }
}
