//! Error types for the document pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source document is not well-formed XML
    #[error("Failed to parse XML '{filename}': {message}")]
    XmlParse { filename: String, message: String },

    /// Office/binary document could not be read
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type for the requested operation
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Chat completion provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Local index or managed vector store error
    #[error("Vector store error: {0}")]
    VectorDb(String),

    /// Object storage error
    #[error("Object storage error: {0}")]
    Storage(String),

    /// Managed knowledge base error (ingestion jobs, retrieve-and-generate)
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an XML parse error
    pub fn xml_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::XmlParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a vector store error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an object storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a knowledge base error
    pub fn knowledge_base(message: impl Into<String>) -> Self {
        Self::KnowledgeBase(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error came from an external service call
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Error::Embedding(_)
                | Error::Llm(_)
                | Error::VectorDb(_)
                | Error::Storage(_)
                | Error::KnowledgeBase(_)
                | Error::Http(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::XmlParse { .. } | Error::FileParse { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "parse_error")
            }
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::VectorDb(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error"),
            Error::Storage(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            Error::KnowledgeBase(_) => (StatusCode::BAD_GATEWAY, "knowledge_base_error"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Csv(_) => (StatusCode::BAD_REQUEST, "csv_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_classification() {
        assert!(Error::embedding("timeout").is_provider());
        assert!(Error::storage("denied").is_provider());
        assert!(!Error::xml_parse("a.xml", "unclosed tag").is_provider());
        assert!(!Error::Config("missing key".to_string()).is_provider());
    }

    #[test]
    fn test_parse_error_message() {
        let err = Error::xml_parse("parts.xml", "unexpected end of input");
        assert_eq!(
            err.to_string(),
            "Failed to parse XML 'parts.xml': unexpected end of input"
        );
    }
}
