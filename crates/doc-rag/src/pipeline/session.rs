//! Evaluation session: document + questions + mode -> scored answers

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::evaluation::{parse_questions, ScoreTarget, Scorer, TokenOverlapScorer};
use crate::generation::AnswerGenerator;
use crate::ingestion::{read_extracts, FileParser};
use crate::normalizer::{OutputFormat, XmlNormalizer};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::IndexBuilder;
use crate::types::{Document, EvaluationReport, ProcessingMode, QuestionError, SourceFormat};

/// Runs one document through normalization, indexing, answering and scoring
pub struct EvaluationSession {
    normalizer: XmlNormalizer,
    builder: IndexBuilder,
    generator: AnswerGenerator,
    scorer: Arc<dyn Scorer>,
    score_target: ScoreTarget,
    work_dir: PathBuf,
}

impl EvaluationSession {
    /// Create a session from configuration and providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            normalizer: XmlNormalizer::new(config.normalizer.clone()),
            builder: IndexBuilder::new(Arc::clone(&embedder), &config.embeddings),
            generator: AnswerGenerator::new(embedder, llm, config.retrieval.top_k),
            scorer: Arc::new(TokenOverlapScorer),
            score_target: config.evaluation.score_target,
            work_dir: config.server.work_dir.clone(),
        }
    }

    /// Replace the answer scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the index builder
    pub fn with_builder(mut self, builder: IndexBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Directory holding uploads and artifacts
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Produce the text artifact for a document under `mode`
    pub async fn prepare_artifact(&self, document: &Document, mode: ProcessingMode) -> Result<PathBuf> {
        let filename = document.filename();
        if filename.is_empty() {
            return Err(Error::UnsupportedFileType("upload has no file name".to_string()));
        }
        tokio::fs::create_dir_all(&self.work_dir).await?;

        match OutputFormat::for_mode(mode) {
            Some(format) => self.normalize_upload(document, &filename, format).await,
            None => self.extract_office_text(document, &filename).await,
        }
    }

    async fn normalize_upload(
        &self,
        document: &Document,
        filename: &str,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        if document.format != SourceFormat::Xml {
            return Err(Error::UnsupportedFileType(format!(
                "{} is not an XML document",
                filename
            )));
        }

        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        // Removed when the guard drops, on every path
        let temp = tempfile::Builder::new()
            .prefix(&format!("{}-", stem))
            .suffix(".xml")
            .tempfile_in(&self.work_dir)?;
        tokio::fs::write(temp.path(), &document.data).await?;

        self.normalizer
            .normalize_as(temp.path(), &self.work_dir.join(filename), format)
            .await
    }

    async fn extract_office_text(&self, document: &Document, filename: &str) -> Result<PathBuf> {
        if document.format == SourceFormat::Xml {
            return Err(Error::UnsupportedFileType(format!(
                "{} is XML; choose an XML mode",
                filename
            )));
        }

        let data_dir = self.work_dir.join("data");
        tokio::fs::create_dir_all(&data_dir).await?;
        let saved = data_dir.join(filename);
        tokio::fs::write(&saved, &document.data).await?;

        let parsed = FileParser::parse(filename, &document.data)?;
        tracing::info!(
            "Extracted {} ({}) from {}",
            parsed.file_type.display_name(),
            parsed.content_hash.get(..12).unwrap_or_default(),
            filename
        );

        let text_path = saved.with_extension("txt");
        let text_path = if text_path == saved {
            data_dir.join(format!("{}.extracted.txt", filename))
        } else {
            text_path
        };
        tokio::fs::write(&text_path, parsed.content).await?;
        Ok(text_path)
    }

    /// Run the full evaluation
    pub async fn run(
        &self,
        document: &Document,
        questions_csv: &[u8],
        mode: ProcessingMode,
    ) -> Result<EvaluationReport> {
        let started = Instant::now();

        let questions = parse_questions(questions_csv)?;
        if questions.is_empty() {
            return Err(Error::Config("questions file contains no questions".to_string()));
        }

        let artifact_path = self.prepare_artifact(document, mode).await?;
        let extracts = read_extracts(&artifact_path).await?;
        let (index, _) = self.builder.build(&extracts).await?;

        let mut results = Vec::with_capacity(questions.len());
        let mut errors = Vec::new();
        for question in &questions {
            match self.generator.answer(&question.text, &index, &extracts).await {
                Ok(mut result) => {
                    let reference = self.score_target.comparison_text(question);
                    result.scores = Some(self.scorer.score(&result.answers, reference));
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("Question {:?} failed: {}", question.text, e);
                    errors.push(QuestionError {
                        question: question.text.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = EvaluationReport {
            id: Uuid::new_v4(),
            mode,
            document: document.filename(),
            artifact_path,
            extract_count: extracts.len(),
            dimensions: index.dimensions(),
            results,
            errors,
            processing_time_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        tracing::info!(
            "Evaluated {} in mode {:?}: {} answered, {} failed, {}ms",
            report.document,
            mode,
            report.results.len(),
            report.errors.len(),
            report.processing_time_ms
        );
        Ok(report)
    }
}
