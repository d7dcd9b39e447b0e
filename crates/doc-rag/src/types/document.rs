//! Source document types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// XML document
    Xml,
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Old Microsoft Word document (.doc)
    Doc,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Old Microsoft PowerPoint (.ppt)
    Ppt,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Old Excel spreadsheet (.xls)
    Xls,
    /// Plain text file
    Txt,
    /// CSV file
    Csv,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "xml" => Self::Xml,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "pptx" => Self::Pptx,
            "ppt" => Self::Ppt,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "txt" | "text" => Self::Txt,
            "csv" => Self::Csv,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name
    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Xml => "XML",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Doc => "Word Document (.doc)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Ppt => "PowerPoint (.ppt)",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Xls => "Excel Spreadsheet (.xls)",
            Self::Txt => "Text File",
            Self::Csv => "CSV",
            Self::Unknown => "Unknown",
        }
    }
}

/// Source format tag of an uploaded document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "file_type", rename_all = "lowercase")]
pub enum SourceFormat {
    /// Structured XML document
    Xml,
    /// Office or PDF document
    Office(FileType),
}

impl SourceFormat {
    /// Classify a file by name
    pub fn detect(filename: &str) -> Self {
        match FileType::from_filename(filename) {
            FileType::Xml => Self::Xml,
            other => Self::Office(other),
        }
    }
}

/// Raw document content as read from disk or an upload
#[derive(Debug, Clone)]
pub struct Document {
    /// Where the bytes came from
    pub path: PathBuf,
    /// Source format tag
    pub format: SourceFormat,
    /// Raw content
    pub data: Vec<u8>,
}

impl Document {
    /// Build a document from uploaded bytes
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        let path = path.into();
        let format = SourceFormat::detect(&path.to_string_lossy());
        Self { path, format, data }
    }

    /// Read a document from disk
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(path, data))
    }

    /// File name component of the path
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the document has no content
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Operation mode of an evaluation run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Pretty-printed XML ("Only XML")
    OnlyXml,
    /// Cleaned JSON ("XML to JSON")
    XmlToJson,
    /// Cleaned and enriched XML ("XML to ENRICHED XML")
    XmlToEnrichedXml,
    /// Office document text ("OFFICE File")
    OfficeFile,
}

impl ProcessingMode {
    /// All modes in display order
    pub const ALL: [ProcessingMode; 4] = [
        Self::OnlyXml,
        Self::XmlToJson,
        Self::XmlToEnrichedXml,
        Self::OfficeFile,
    ];

    /// Label shown to operators
    pub fn label(&self) -> &'static str {
        match self {
            Self::OnlyXml => "Only XML",
            Self::XmlToJson => "XML to JSON",
            Self::XmlToEnrichedXml => "XML to ENRICHED XML",
            Self::OfficeFile => "OFFICE File",
        }
    }

    /// Parse either the snake_case key or the operator label
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|mode| {
            mode.label().eq_ignore_ascii_case(value)
                || serde_json::to_value(mode)
                    .ok()
                    .and_then(|v| v.as_str().map(|s| s == value))
                    .unwrap_or(false)
        })
    }

    /// Whether the mode runs the XML normalizer
    pub fn is_xml(&self) -> bool {
        !matches!(self, Self::OfficeFile)
    }
}
