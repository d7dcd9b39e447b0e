//! Core types for the document pipeline

pub mod document;
pub mod record;
pub mod response;

pub use document::{Document, FileType, ProcessingMode, SourceFormat};
pub use record::{ElementRecord, ElementType, Metadata};
pub use response::{
    EvaluationReport, GenerationFailure, KnowledgeBaseAnswer, NormalizeResponse,
    QuestionAnswerResult, QuestionError, Scores, TeardownResponse,
};
