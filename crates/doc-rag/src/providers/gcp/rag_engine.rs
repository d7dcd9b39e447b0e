//! Vertex AI RAG Engine as a managed knowledge base
//!
//! A knowledge base is a RAG corpus; a data source is a `gs://` URI whose
//! files are imported into it. Answers come from `generateContent` with the
//! corpus attached as a retrieval tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::auth::GcpAuth;
use crate::error::{Error, Result};
use crate::providers::knowledge_base::{IngestionJob, KnowledgeBaseService};

/// Vertex AI RAG Engine client
pub struct VertexRagEngine {
    auth: Arc<GcpAuth>,
    location: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl VertexRagEngine {
    /// Create a client for the given region
    pub fn new(auth: Arc<GcpAuth>, location: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: format!("https://{}-aiplatform.googleapis.com/v1", location),
            auth,
            location,
            client,
        })
    }

    /// Full resource name of a corpus; accepts a bare ID or a full name
    fn corpus_name(&self, knowledge_base_id: &str) -> String {
        if knowledge_base_id.starts_with("projects/") {
            knowledge_base_id.to_string()
        } else {
            format!(
                "projects/{}/locations/{}/ragCorpora/{}",
                self.auth.project_id(),
                self.location,
                knowledge_base_id
            )
        }
    }

    fn model_name(&self, model_id: &str) -> String {
        if model_id.starts_with("projects/") {
            model_id.to_string()
        } else {
            format!(
                "projects/{}/locations/{}/publishers/google/models/{}",
                self.auth.project_id(),
                self.location,
                model_id
            )
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let headers = self.auth.headers().await?;
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::knowledge_base(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::knowledge_base(format!("HTTP {} - {}", status, text)));
        }
        Ok(response)
    }
}

pub(crate) fn import_request(data_source_id: &str) -> Value {
    json!({
        "importRagFilesConfig": {
            "gcsSource": { "uris": [data_source_id] }
        }
    })
}

pub(crate) fn grounded_request(text: &str, corpus: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": text }]
        }],
        "tools": [{
            "retrieval": {
                "vertexRagStore": {
                    "ragResources": [{ "ragCorpus": corpus }]
                }
            }
        }]
    })
}

#[async_trait]
impl KnowledgeBaseService for VertexRagEngine {
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob> {
        if !data_source_id.starts_with("gs://") {
            return Err(Error::knowledge_base(format!(
                "Data source must be a gs:// URI, got {}",
                data_source_id
            )));
        }

        let url = format!(
            "{}/{}/ragFiles:import",
            self.base_url,
            self.corpus_name(knowledge_base_id)
        );
        let operation: Operation = self
            .post(&url, &import_request(data_source_id))
            .await?
            .json()
            .await
            .map_err(|e| Error::knowledge_base(format!("Failed to parse import operation: {}", e)))?;

        tracing::info!("Started import {} into {}", operation.name, knowledge_base_id);
        Ok(IngestionJob {
            job_id: operation.name,
            status: if operation.done { "DONE" } else { "RUNNING" }.to_string(),
        })
    }

    async fn retrieve_and_generate(
        &self,
        text: &str,
        knowledge_base_id: &str,
        model_id: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url,
            self.model_name(model_id)
        );
        let body = grounded_request(text, &self.corpus_name(knowledge_base_id));

        let response: GenerateResponse = self
            .post(&url, &body)
            .await?
            .json()
            .await
            .map_err(|e| Error::knowledge_base(format!("Failed to parse generation response: {}", e)))?;

        let answer: String = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(Error::knowledge_base("Response contained no text"));
        }
        Ok(answer)
    }

    fn name(&self) -> &str {
        "vertex-rag-engine"
    }
}
