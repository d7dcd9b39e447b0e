//! Provider abstractions for embeddings, chat, object storage, managed
//! knowledge bases and managed vector indexes
//!
//! Every external service sits behind a trait so components receive
//! `Arc<dyn Trait>` values built once from `RagConfig`.

pub mod embedding;
pub mod knowledge_base;
pub mod llm;
pub mod local;
pub mod object_store;
pub mod ollama;
pub mod openai;
pub mod pinecone;
pub mod vector_admin;

#[cfg(feature = "gcp")]
pub mod gcp;

pub use embedding::EmbeddingProvider;
pub use knowledge_base::{IngestionJob, KnowledgeBaseService};
pub use llm::LlmProvider;
pub use local::LocalObjectStore;
pub use object_store::ObjectStore;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use openai::{OpenAiChat, OpenAiEmbedder};
pub use pinecone::PineconeIndexAdmin;
pub use vector_admin::{VectorIdPage, VectorIndexAdmin};

use std::sync::Arc;

use crate::config::{ProviderBackend, RagConfig, StorageBackend};
use crate::error::Result;
#[cfg(not(feature = "gcp"))]
use crate::error::Error;

/// Build the configured embedding provider
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        ProviderBackend::OpenAi => Arc::new(OpenAiEmbedder::new(
            &config.embeddings,
            config.openai_api_key()?,
        )?),
        ProviderBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.embeddings)?),
    };
    tracing::info!(
        "Embedding provider: {} ({})",
        provider.name(),
        provider.model()
    );
    Ok(provider)
}

/// Build the configured chat provider
pub fn llm_from_config(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.llm.backend {
        ProviderBackend::OpenAi => Arc::new(OpenAiChat::new(&config.llm, config.openai_api_key()?)?),
        ProviderBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
    };
    tracing::info!("LLM provider: {} ({})", provider.name(), provider.model());
    Ok(provider)
}

/// Build the configured object store
pub async fn object_store_from_config(config: &RagConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.storage.backend {
        StorageBackend::Local => Ok(Arc::new(LocalObjectStore::new(
            config.storage.local_root.clone(),
        )?)),
        #[cfg(feature = "gcp")]
        StorageBackend::Gcs => Ok(Arc::new(gcp::GcsObjectStore::new().await?)),
        #[cfg(not(feature = "gcp"))]
        StorageBackend::Gcs => Err(Error::Config(
            "gcs storage requires the gcp feature".to_string(),
        )),
    }
}

/// Build the managed knowledge base client
#[cfg(feature = "gcp")]
pub fn knowledge_base_from_config(config: &RagConfig) -> Result<Arc<dyn KnowledgeBaseService>> {
    let gcp = config.gcp()?;
    let auth = Arc::new(gcp::GcpAuth::from_service_account(
        &gcp.service_account_key_path,
        gcp.project_id.clone(),
    )?);
    Ok(Arc::new(gcp::VertexRagEngine::new(auth, gcp.location.clone())?))
}

/// Build the managed knowledge base client
#[cfg(not(feature = "gcp"))]
pub fn knowledge_base_from_config(_config: &RagConfig) -> Result<Arc<dyn KnowledgeBaseService>> {
    Err(Error::Config(
        "managed knowledge base requires the gcp feature".to_string(),
    ))
}

/// Build the managed vector index client
pub fn vector_admin_from_config(config: &RagConfig) -> Result<Arc<dyn VectorIndexAdmin>> {
    Ok(Arc::new(PineconeIndexAdmin::new(
        &config.vector_index,
        config.pinecone_api_key()?,
    )?))
}
