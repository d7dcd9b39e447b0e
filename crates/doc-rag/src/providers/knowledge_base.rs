//! Managed knowledge base provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Handle of a started ingestion job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionJob {
    /// Provider job identifier
    pub job_id: String,
    /// Provider-reported status at submission time
    pub status: String,
}

/// Trait for managed knowledge bases that ingest stored documents and
/// answer questions grounded in them
#[async_trait]
pub trait KnowledgeBaseService: Send + Sync {
    /// Start ingesting the data source into the knowledge base
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob>;

    /// Retrieve from the knowledge base and generate an answer with `model_id`
    async fn retrieve_and_generate(
        &self,
        text: &str,
        knowledge_base_id: &str,
        model_id: &str,
    ) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
