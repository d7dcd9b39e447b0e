//! doc-rag: document normalization, retrieval-augmented answering and evaluation
//!
//! XML documents are normalized into text artifacts and Office documents are
//! reduced to plain text. Either artifact is split into extracts, embedded into
//! an in-memory flat index and queried with questions from a CSV file; each
//! retrieved extract yields one generated answer. Files can also be pushed to
//! object storage and ingested into a managed knowledge base.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod ingestion;
pub mod normalizer;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{Document, EvaluationReport, FileType, ProcessingMode, SourceFormat};
