//! Normalized element records produced by the XML normalizer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding the source directory (non-reproducible)
pub const FILE_DIRECTORY: &str = "file_directory";
/// Metadata key holding the source modification time (non-reproducible)
pub const LAST_MODIFIED: &str = "last_modified";
/// Metadata key holding the detected language codes
pub const LANGUAGES: &str = "languages";

/// Keys removed from every element before serialization
pub const VOLATILE_KEYS: [&str; 2] = [FILE_DIRECTORY, LAST_MODIFIED];

/// Element metadata, keys unique
pub type Metadata = Map<String, Value>;

/// Category assigned to a text-bearing element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ElementType {
    /// Short heading-like text
    Title,
    /// Running text
    NarrativeText,
    /// Numbers, codes and other text that is neither
    UncategorizedText,
}

impl ElementType {
    /// Classify element text
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if !trimmed.chars().any(char::is_alphabetic) {
            return Self::UncategorizedText;
        }
        let words = trimmed.split_whitespace().count();
        let ends_sentence = trimmed.ends_with(['.', '!', '?', ':', ';', ',']);
        if words <= 12 && !ends_sentence {
            Self::Title
        } else {
            Self::NarrativeText
        }
    }
}

/// One partitioned element of a source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementRecord {
    /// Element category
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Stable element identifier
    pub element_id: String,
    /// Element text
    pub text: String,
    /// Element metadata
    pub metadata: Metadata,
}

impl ElementRecord {
    /// Remove the non-reproducible metadata keys
    pub fn strip_volatile(&mut self) {
        for key in VOLATILE_KEYS {
            self.metadata.shift_remove(key);
        }
    }

    /// Rewrite `languages` when it is exactly the one-element list `[from]`
    ///
    /// Returns whether the value changed.
    pub fn remap_language(&mut self, from: &str, to: &str) -> bool {
        let matches = match self.metadata.get(LANGUAGES) {
            Some(Value::Array(langs)) => langs.len() == 1 && langs[0].as_str() == Some(from),
            _ => false,
        };
        if matches {
            self.metadata
                .insert(LANGUAGES.to_string(), Value::Array(vec![Value::from(to)]));
        }
        matches
    }

    /// Language codes recorded for the element
    pub fn languages(&self) -> Vec<String> {
        match self.metadata.get(LANGUAGES) {
            Some(Value::Array(langs)) => langs
                .iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(metadata: Value) -> ElementRecord {
        ElementRecord {
            element_type: ElementType::Title,
            element_id: "abc".to_string(),
            text: "Hello".to_string(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_strip_volatile() {
        let mut rec = record(json!({
            "file_directory": "/tmp/in",
            "last_modified": "2024-01-01T00:00:00",
            "filename": "parts.xml"
        }));
        rec.strip_volatile();
        assert!(!rec.metadata.contains_key(FILE_DIRECTORY));
        assert!(!rec.metadata.contains_key(LAST_MODIFIED));
        assert_eq!(rec.metadata["filename"], "parts.xml");
    }

    #[test]
    fn test_strip_volatile_keeps_key_order() {
        let mut rec = record(json!({
            "file_directory": "/tmp/in",
            "filename": "parts.xml",
            "filetype": "application/xml",
            "tag": "part",
            "last_modified": "2024-01-01T00:00:00",
            "languages": ["deu"]
        }));
        rec.strip_volatile();
        let keys: Vec<&str> = rec.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["filename", "filetype", "tag", "languages"]);
    }

    #[test]
    fn test_remap_language_exact_match_only() {
        let mut rec = record(json!({"languages": ["deu"]}));
        assert!(rec.remap_language("deu", "eng"));
        assert_eq!(rec.languages(), vec!["eng"]);

        // Second pass is a no-op
        assert!(!rec.remap_language("deu", "eng"));
        assert_eq!(rec.languages(), vec!["eng"]);

        let mut multi = record(json!({"languages": ["deu", "fra"]}));
        assert!(!multi.remap_language("deu", "eng"));
        assert_eq!(multi.languages(), vec!["deu", "fra"]);

        let mut scalar = record(json!({"languages": "deu"}));
        assert!(!scalar.remap_language("deu", "eng"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(ElementType::classify("Introduction"), ElementType::Title);
        assert_eq!(ElementType::classify("12.5 / 3"), ElementType::UncategorizedText);
        assert_eq!(
            ElementType::classify("The pump must be serviced every year."),
            ElementType::NarrativeText
        );
    }

    #[test]
    fn test_serialized_shape() {
        let rec = record(json!({"filename": "parts.xml"}));
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["type"], "Title");
        assert_eq!(value["metadata"]["filename"], "parts.xml");
    }
}
