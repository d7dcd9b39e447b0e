//! Split an XML tree into element records

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::SystemTime;

use super::tree::{XmlElement, XmlTree};
use crate::types::record::{ElementRecord, ElementType, Metadata, FILE_DIRECTORY, LANGUAGES, LAST_MODIFIED};

/// MIME type recorded for every XML element
pub const XML_FILETYPE: &str = "application/xml";

/// Where a document came from
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    /// File name with extension
    pub filename: String,
    /// Containing directory
    pub directory: String,
    /// Modification time, when known
    pub last_modified: Option<DateTime<Utc>>,
}

impl SourceInfo {
    /// Describe a file on disk
    pub fn from_path(path: &Path, modified: Option<SystemTime>) -> Self {
        Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            directory: path
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            last_modified: modified.map(DateTime::<Utc>::from),
        }
    }

    /// Describe in-memory content with only a name
    pub fn named(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }
}

/// Produce one record per element with non-blank direct text, in document order
pub fn partition(tree: &XmlTree, source: &SourceInfo) -> Vec<ElementRecord> {
    let mut records = Vec::new();
    visit(&tree.root, None, None, source, &mut records);
    records
}

fn visit(
    element: &XmlElement,
    inherited_lang: Option<&str>,
    parent_id: Option<&str>,
    source: &SourceInfo,
    records: &mut Vec<ElementRecord>,
) {
    let lang = element.attribute("lang").or(inherited_lang);
    let text = element.direct_text();
    let text = text.trim();

    let mut own_id = None;
    if !text.is_empty() {
        let record = make_record(element, text, records.len(), lang, parent_id, source);
        own_id = Some(record.element_id.clone());
        records.push(record);
    }

    let parent_for_children = own_id.as_deref().or(parent_id);
    for child in element.child_elements() {
        visit(child, lang, parent_for_children, source, records);
    }
}

fn make_record(
    element: &XmlElement,
    text: &str,
    index: usize,
    lang: Option<&str>,
    parent_id: Option<&str>,
    source: &SourceInfo,
) -> ElementRecord {
    let mut metadata = Metadata::new();
    metadata.insert(FILE_DIRECTORY.to_string(), Value::from(source.directory.clone()));
    if let Some(modified) = source.last_modified {
        metadata.insert(
            LAST_MODIFIED.to_string(),
            Value::from(modified.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
    metadata.insert("filename".to_string(), Value::from(source.filename.clone()));
    metadata.insert("filetype".to_string(), Value::from(XML_FILETYPE));
    metadata.insert("tag".to_string(), Value::from(element.name.clone()));
    if let Some(lang) = lang {
        metadata.insert(
            LANGUAGES.to_string(),
            Value::Array(vec![Value::from(iso639_3(lang))]),
        );
    }
    if let Some(parent_id) = parent_id {
        metadata.insert("parent_id".to_string(), Value::from(parent_id));
    }

    ElementRecord {
        element_type: ElementType::classify(text),
        element_id: element_id(text, index, &source.filename),
        text: text.to_string(),
        metadata,
    }
}

/// Deterministic identifier from text, position and file name
pub fn element_id(text: &str, index: usize, filename: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(index.to_string().as_bytes());
    hasher.update(filename.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(32);
    id
}

/// Map a language tag to its ISO 639-3 code; unknown tags pass through
pub fn iso639_3(tag: &str) -> String {
    let primary = tag
        .split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .to_ascii_lowercase();
    let mapped = match primary.as_str() {
        "de" => "deu",
        "en" => "eng",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "nl" => "nld",
        "pt" => "por",
        "pl" => "pol",
        "sv" => "swe",
        "da" => "dan",
        "fi" => "fin",
        "cs" => "ces",
        "ru" => "rus",
        "ja" => "jpn",
        "zh" => "zho",
        _ => return tag.to_string(),
    };
    mapped.to_string()
}
