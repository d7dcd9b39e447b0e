//! XML normalization into text artifacts
//!
//! A source document is parsed, stripped of unwanted tags, partitioned into
//! element records, cleaned and written to `<dir>/data/<stem><suffix>`.

pub mod clean;
pub mod partition;
pub mod render;
pub mod tree;

pub use clean::{clean_text, clean_value};
pub use partition::{partition, SourceInfo};
pub use tree::{XmlElement, XmlNode, XmlTree};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::NormalizerConfig;
use crate::error::{Error, Result};
use crate::types::{ElementRecord, ProcessingMode};

/// Serialized form of a normalized document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Pretty-printed source tree
    PrettyXml,
    /// Cleaned element list as JSON
    CleanedJson,
    /// Cleaned, language-remapped element list as XML
    CleanedXml,
    /// Raw tree converted directly to JSON
    DirectJson,
}

impl OutputFormat {
    /// Suffix appended to the source stem
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::PrettyXml => ".txt",
            Self::CleanedJson => "_cleaned_json.txt",
            Self::CleanedXml => "_cleaned_xml.txt",
            Self::DirectJson => "_direct_json.txt",
        }
    }

    /// Format used by an evaluation mode, `None` for Office documents
    pub fn for_mode(mode: ProcessingMode) -> Option<Self> {
        match mode {
            ProcessingMode::OnlyXml => Some(Self::PrettyXml),
            ProcessingMode::XmlToJson => Some(Self::CleanedJson),
            ProcessingMode::XmlToEnrichedXml => Some(Self::CleanedXml),
            ProcessingMode::OfficeFile => None,
        }
    }

    /// Parse a snake_case name
    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(Value::from(value.trim())).ok()
    }
}

/// Result of normalizing one document in a batch
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// Artifact written
    Written(PathBuf),
    /// Document skipped
    Failed {
        /// Source document
        source: PathBuf,
        /// Error message
        reason: String,
    },
}

impl NormalizeOutcome {
    /// Whether the document was written
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// XML normalizer
#[derive(Debug, Clone)]
pub struct XmlNormalizer {
    config: NormalizerConfig,
}

impl Default for XmlNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl XmlNormalizer {
    /// Create a normalizer
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Replace the removal list
    pub fn with_remove_tags(mut self, tags: Vec<String>) -> Self {
        self.config.remove_tags = tags;
        self
    }

    /// Tags deleted before partitioning
    pub fn remove_tags(&self) -> &[String] {
        &self.config.remove_tags
    }

    /// Where the artifact for `source` in `format` is written
    pub fn artifact_path(&self, source: &Path, format: OutputFormat) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        source
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.config.output_dir_name)
            .join(format!("{}{}", stem, format.suffix()))
    }

    /// Element records with volatile metadata stripped and, if `enrich`, languages remapped
    pub fn records(&self, tree: &XmlTree, source: &SourceInfo, enrich: bool) -> Vec<ElementRecord> {
        let mut records = partition(tree, source);
        for record in &mut records {
            record.strip_volatile();
            if enrich {
                record.remap_language(&self.config.language_from, &self.config.language_to);
            }
        }
        records
    }

    /// Normalize XML text in memory
    pub fn normalize_str(&self, xml: &str, source: &SourceInfo, format: OutputFormat) -> Result<String> {
        let raw = XmlTree::parse(xml, &source.filename)?;
        if format == OutputFormat::DirectJson {
            return render::direct_json(&raw);
        }

        let mut tree = raw;
        let removed = tree.remove_tags(&self.config.remove_tags);
        if removed > 0 {
            tracing::debug!("Removed {} elements from {}", removed, source.filename);
        }

        match format {
            OutputFormat::PrettyXml => tree.to_pretty_string(b' ', 2),
            OutputFormat::CleanedJson | OutputFormat::CleanedXml => {
                let enrich = format == OutputFormat::CleanedXml;
                let values = self
                    .records(&tree, source, enrich)
                    .iter()
                    .map(|r| serde_json::to_value(r).map(clean_value))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                if enrich {
                    render::cleaned_xml(&values)
                } else {
                    render::cleaned_json(&values)
                }
            }
            OutputFormat::DirectJson => render::direct_json(&tree),
        }
    }

    /// Normalize one file and write its artifact
    pub async fn normalize(&self, path: &Path, format: OutputFormat) -> Result<PathBuf> {
        self.normalize_as(path, path, format).await
    }

    /// Normalize the file at `path` as if it were `source`
    ///
    /// Element metadata and the artifact location are derived from `source`.
    pub async fn normalize_as(&self, path: &Path, source: &Path, format: OutputFormat) -> Result<PathBuf> {
        let xml = tokio::fs::read_to_string(path).await?;
        let modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok());
        let info = SourceInfo::from_path(source, modified);

        let content = self.normalize_str(&xml, &info, format)?;

        let output = self.artifact_path(source, format);
        if let Some(dir) = output.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&output, content).await?;

        tracing::info!("Normalized {} -> {}", path.display(), output.display());
        Ok(output)
    }

    /// Normalize several files, continuing past failures
    pub async fn normalize_batch(&self, paths: &[PathBuf], format: OutputFormat) -> Vec<NormalizeOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            match self.normalize(path, format).await {
                Ok(output) => outcomes.push(NormalizeOutcome::Written(output)),
                Err(e) => {
                    tracing::error!("Failed to normalize {}: {}", path.display(), e);
                    outcomes.push(NormalizeOutcome::Failed {
                        source: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcomes
    }
}

/// Reject anything that is not an XML file name
pub fn ensure_xml(filename: &str) -> Result<()> {
    match crate::types::SourceFormat::detect(filename) {
        crate::types::SourceFormat::Xml => Ok(()),
        _ => Err(Error::UnsupportedFileType(filename.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<manual xml:lang="de">
  <title>Wartung</title>
  <nav>Menu</nav>
  <item>  Hello,   World!-- </item>
</manual>"#;

    async fn write_sample(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("manual.xml");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        path
    }

    #[test]
    fn test_artifact_names() {
        let n = XmlNormalizer::default();
        let src = Path::new("/docs/manual.xml");
        assert_eq!(
            n.artifact_path(src, OutputFormat::PrettyXml),
            PathBuf::from("/docs/data/manual.txt")
        );
        assert_eq!(
            n.artifact_path(src, OutputFormat::CleanedJson),
            PathBuf::from("/docs/data/manual_cleaned_json.txt")
        );
        assert_eq!(
            n.artifact_path(src, OutputFormat::CleanedXml),
            PathBuf::from("/docs/data/manual_cleaned_xml.txt")
        );
        assert_eq!(
            n.artifact_path(src, OutputFormat::DirectJson),
            PathBuf::from("/docs/data/manual_direct_json.txt")
        );
    }

    #[tokio::test]
    async fn test_cleaned_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir).await;
        let normalizer = XmlNormalizer::default().with_remove_tags(vec!["nav".to_string()]);

        let output = normalizer.normalize(&path, OutputFormat::CleanedJson).await.unwrap();
        assert!(output.ends_with("data/manual_cleaned_json.txt"));

        let text = tokio::fs::read_to_string(&output).await.unwrap();
        let records: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["text"], "Hello, World!");
        assert!(!text.contains("Menu"));
        for record in &records {
            assert!(record["metadata"].get("file_directory").is_none());
            assert!(record["metadata"].get("last_modified").is_none());
        }
        // Not enriched
        assert_eq!(records[0]["metadata"]["languages"][0], "deu");
    }

    #[tokio::test]
    async fn test_enriched_xml_file() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir).await;
        let output = XmlNormalizer::default()
            .normalize(&path, OutputFormat::CleanedXml)
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(text.contains("<item>eng</item>"));
        assert!(!text.contains("<item>deu</item>"));
        assert!(text.contains("<text>Hello, World!</text>"));
    }

    #[tokio::test]
    async fn test_pretty_xml_keeps_source_text() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir).await;
        let output = XmlNormalizer::default()
            .normalize(&path, OutputFormat::PrettyXml)
            .await
            .unwrap();

        assert!(output.ends_with("data/manual.txt"));
        let text = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(text.contains("  <title>Wartung</title>"));
        assert!(text.contains("Menu"));
    }

    #[tokio::test]
    async fn test_output_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir).await;
        let normalizer = XmlNormalizer::default();

        let first = normalizer.normalize(&path, OutputFormat::CleanedJson).await.unwrap();
        let a = tokio::fs::read(&first).await.unwrap();
        let second = normalizer.normalize(&path, OutputFormat::CleanedJson).await.unwrap();
        let b = tokio::fs::read(&second).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_normalize_as_uses_source_name() {
        let dir = TempDir::new().unwrap();
        let upload = dir.path().join("tmp-upload-1a2b.xml");
        tokio::fs::write(&upload, SAMPLE).await.unwrap();

        let output = XmlNormalizer::default()
            .normalize_as(&upload, &dir.path().join("manual.xml"), OutputFormat::CleanedJson)
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("data/manual_cleaned_json.txt"));
        let records: Vec<Value> =
            serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
        assert_eq!(records[0]["metadata"]["filename"], "manual.xml");
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let good = write_sample(&dir).await;
        let bad = dir.path().join("broken.xml");
        tokio::fs::write(&bad, "<a><b></a>").await.unwrap();
        let missing = dir.path().join("missing.xml");

        let outcomes = XmlNormalizer::default()
            .normalize_batch(&[bad.clone(), missing, good], OutputFormat::PrettyXml)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], NormalizeOutcome::Failed { source, .. } if source == &bad));
        assert!(!outcomes[1].is_written());
        assert!(outcomes[2].is_written());
        assert!(!dir.path().join("data/broken.txt").exists());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("cleaned_json"), Some(OutputFormat::CleanedJson));
        assert_eq!(OutputFormat::parse("yaml"), None);
        assert_eq!(
            OutputFormat::for_mode(ProcessingMode::XmlToEnrichedXml),
            Some(OutputFormat::CleanedXml)
        );
        assert!(ensure_xml("a.xml").is_ok());
        assert!(ensure_xml("a.docx").is_err());
    }
}
