//! Result types returned by the pipeline and the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::types::ProcessingMode;

/// Precision / recall / F1 of an answer set against a comparison text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Scores {
    /// Share of answer tokens found in the comparison text
    pub precision: f32,
    /// Share of comparison tokens found in the answer
    pub recall: f32,
    /// Harmonic mean of precision and recall
    pub f1: f32,
}

/// A generation request that failed for one retrieved extract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationFailure {
    /// Position of the extract in the corpus
    pub extract_index: usize,
    /// Error message reported to the operator
    pub error: String,
}

/// A question with its generated answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswerResult {
    /// The question asked
    pub question: String,
    /// Positions of the retrieved extracts, nearest first
    pub retrieved: Vec<usize>,
    /// One answer per successfully answered extract, in retrieval order
    pub answers: Vec<String>,
    /// Extracts whose generation failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<GenerationFailure>,
    /// Scores against the configured comparison text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
}

impl QuestionAnswerResult {
    /// Empty result for a question
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            retrieved: Vec::new(),
            answers: Vec::new(),
            failures: Vec::new(),
            scores: None,
        }
    }
}

/// A question that could not be processed at all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionError {
    /// The question
    pub question: String,
    /// Error message
    pub error: String,
}

/// Outcome of one evaluation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Report identifier
    pub id: Uuid,
    /// Mode the document was processed with
    pub mode: ProcessingMode,
    /// Uploaded document name
    pub document: String,
    /// Generated text artifact
    pub artifact_path: PathBuf,
    /// Number of extracts indexed
    pub extract_count: usize,
    /// Embedding dimension of the index
    pub dimensions: usize,
    /// Per-question results
    pub results: Vec<QuestionAnswerResult>,
    /// Questions that failed entirely
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QuestionError>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Response of the normalize endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeResponse {
    /// Generated artifact path
    pub artifact_path: PathBuf,
    /// Number of lines in the artifact
    pub line_count: usize,
    /// Artifact text
    pub content: String,
}

/// Answer from the managed retrieve-and-generate service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseAnswer {
    /// The question
    pub question: String,
    /// Generated answer, absent when the call failed
    pub answer: Option<String>,
    /// Error message when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the teardown endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownResponse {
    /// Bucket or index name
    pub target: String,
    /// Number of objects or vectors deleted
    pub deleted: usize,
}
