//! API routes

pub mod evaluate;
pub mod ingest;
pub mod knowledge_base;
pub mod normalize;
pub mod teardown;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart},
    routing::{delete, get, post},
    Json, Router,
};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Uploads get the larger body limit
        .route(
            "/evaluate",
            post(evaluate::evaluate).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/evaluations/:id", get(evaluate::get_evaluation))
        .route(
            "/normalize",
            post(normalize::normalize).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/ingest",
            post(ingest::ingest).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/kb/query", post(knowledge_base::query))
        .route("/buckets/:bucket", delete(teardown::delete_bucket))
        .route("/vector-indexes/:name", delete(teardown::delete_vector_index))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "doc-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document normalization, retrieval-augmented answering and evaluation",
        "endpoints": {
            "POST /api/evaluate": "Normalize a document, answer questions from a CSV and score the answers",
            "GET /api/evaluations/:id": "Fetch a stored evaluation report",
            "POST /api/normalize": "Normalize an XML document into a text artifact",
            "POST /api/ingest": "Upload a file to object storage and start knowledge base ingestion",
            "POST /api/kb/query": "Answer questions with the managed knowledge base",
            "DELETE /api/buckets/:bucket": "Delete every object in a bucket",
            "DELETE /api/vector-indexes/:name": "Delete every vector in a managed index"
        },
        "modes": crate::types::ProcessingMode::ALL
            .iter()
            .map(|m| m.label())
            .collect::<Vec<_>>()
    }))
}

/// One multipart field
#[derive(Debug, Clone)]
pub struct FormField {
    /// Client-supplied file name
    pub filename: Option<String>,
    /// Field content
    pub data: Bytes,
}

/// Multipart fields by name; a repeated name keeps the last value
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, FormField>,
}

impl Form {
    /// Read every field of a multipart body
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::Internal(format!("Failed to read field {}: {}", name, e)))?;
            form.fields.insert(name, FormField { filename, data });
        }
        Ok(form)
    }

    /// A required field
    pub fn file(&self, name: &str) -> Result<&FormField> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::Config(format!("Missing multipart field '{}'", name)))
    }

    /// A text field, trimmed; `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|f| String::from_utf8_lossy(&f.data).trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// A required text field
    pub fn required_text(&self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| Error::Config(format!("Missing multipart field '{}'", name)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::generation::answer::tests::StubLlm;
    use crate::pipeline::orchestrator::tests::StubKnowledgeBase;
    use crate::providers::{LocalObjectStore, VectorIdPage, VectorIndexAdmin};
    use crate::retrieval::builder::tests::StubEmbedder;
    use crate::server::state::Providers;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndexAdmin for EmptyIndex {
        async fn list_ids(&self, _index: &str, _token: Option<&str>) -> Result<VectorIdPage> {
            Ok(VectorIdPage {
                ids: vec!["v1".to_string(), "v2".to_string()],
                next_token: None,
            })
        }

        async fn delete_ids(&self, _index: &str, _ids: &[String]) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    /// State over stub providers rooted in `dir`
    pub(crate) fn stub_state(dir: &TempDir, with_kb: bool) -> AppState {
        let mut config = RagConfig::default();
        config.server.work_dir = dir.path().join("work");
        config.storage.local_root = dir.path().join("buckets");
        config.embeddings.max_retries = 0;

        let store = LocalObjectStore::new(config.storage.local_root.clone()).unwrap();
        let providers = Providers {
            embedder: Arc::new(StubEmbedder::default()),
            llm: Arc::new(StubLlm::default()),
            store: Arc::new(store),
            knowledge_base: if with_kb {
                Some(Arc::new(StubKnowledgeBase::default()))
            } else {
                None
            },
            vector_admin: Some(Arc::new(EmptyIndex)),
        };
        let state = AppState::from_parts(config, providers);
        state.set_ready(true);
        state
    }

    /// Serve the API on an ephemeral port, returning its base URL
    pub(crate) async fn serve(state: AppState) -> String {
        let router = Router::new()
            .nest("/api", api_routes(10 * 1024 * 1024))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    #[tokio::test]
    async fn test_info_lists_modes() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, false)).await;

        let info: serde_json::Value = reqwest::get(format!("{}/info", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(info["name"], "doc-rag");
        assert_eq!(info["modes"][3], "OFFICE File");
    }
}
