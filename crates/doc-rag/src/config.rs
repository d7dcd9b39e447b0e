//! Configuration for the document pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::evaluation::ScoreTarget;

/// Environment variable pointing at a TOML config file
pub const CONFIG_ENV: &str = "DOC_RAG_CONFIG";

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding provider configuration
    pub embeddings: EmbeddingConfig,
    /// Chat completion provider configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// XML normalizer configuration
    pub normalizer: NormalizerConfig,
    /// Answer scoring configuration
    pub evaluation: EvaluationConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Managed vector index configuration (teardown only)
    pub vector_index: VectorIndexConfig,
    /// GCP configuration (required for the gcs storage backend and managed knowledge base)
    pub gcp: Option<GcpConfig>,
    /// Provider credentials, read from the environment only
    #[serde(skip)]
    pub credentials: Credentials,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, `.env` and the environment
    ///
    /// Lookup order for the file: explicit `path`, then `DOC_RAG_CONFIG`.
    /// Without a file the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides for credentials and server address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.credentials.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            self.credentials.pinecone_api_key = Some(key);
        }
        if let Ok(host) = std::env::var("DOC_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("DOC_RAG_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.server.port = port;
        }
    }

    /// OpenAI API key, or a config error when it is not set
    pub fn openai_api_key(&self) -> Result<&str> {
        self.credentials
            .openai_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))
    }

    /// Pinecone API key, or a config error when it is not set
    pub fn pinecone_api_key(&self) -> Result<&str> {
        self.credentials
            .pinecone_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))
    }

    /// GCP section, or a config error when it is missing
    pub fn gcp(&self) -> Result<&GcpConfig> {
        self.gcp
            .as_ref()
            .ok_or_else(|| Error::Config("gcp configuration section is missing".to_string()))
    }
}

/// Credentials loaded from the environment (never serialized)
#[derive(Clone, Default)]
pub struct Credentials {
    /// OpenAI API key (`OPENAI_API_KEY`)
    pub openai_api_key: Option<String>,
    /// Pinecone API key (`PINECONE_API_KEY`)
    pub pinecone_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("pinecone_api_key", &self.pinecone_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Working directory for uploaded files and generated artifacts
    pub work_dir: PathBuf,
    /// Evaluation reports kept in memory; the oldest are evicted first
    pub max_reports: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            work_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("doc-rag")
                .join("work"),
            max_reports: 256,
        }
    }
}

/// Which service answers embedding and chat requests
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    /// OpenAI-compatible HTTP API
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider backend
    pub backend: ProviderBackend,
    /// Base URL of the provider API
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries per extract in batch mode
    pub max_retries: u32,
    /// Concurrent embedding requests in batch mode
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: ProviderBackend::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-ada-002".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            concurrency: 4,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider backend
    pub backend: ProviderBackend,
    /// Base URL of the provider API
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Sampling temperature (low keeps answers close to the extract)
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (Ollama client only)
    pub max_retries: u32,
    /// Maximum tokens per answer
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: ProviderBackend::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            generate_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 0,
            max_tokens: 512,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of extracts retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// XML normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Tag names removed from the tree before partitioning
    pub remove_tags: Vec<String>,
    /// Name of the artifact directory created next to the source file
    pub output_dir_name: String,
    /// Language code rewritten by the enriched variant
    pub language_from: String,
    /// Replacement language code
    pub language_to: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            remove_tags: Vec::new(),
            output_dir_name: "data".to_string(),
            language_from: "deu".to_string(),
            language_to: "eng".to_string(),
        }
    }
}

/// Answer scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EvaluationConfig {
    /// What generated answers are compared against
    pub score_target: ScoreTarget,
}

/// Object storage backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory per bucket on the local filesystem
    #[default]
    Local,
    /// Google Cloud Storage
    Gcs,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend provider
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_root: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("doc-rag")
                .join("buckets"),
        }
    }
}

/// Managed vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// Control plane URL used to resolve index hosts
    pub control_url: String,
    /// Namespace whose vectors are listed and deleted
    pub namespace: Option<String>,
    /// IDs per delete request
    pub delete_batch_size: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            control_url: "https://api.pinecone.io".to_string(),
            namespace: None,
            delete_batch_size: 1000,
        }
    }
}

/// Google Cloud Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    /// Path to service account JSON key file
    pub service_account_key_path: PathBuf,
    /// GCP project ID
    pub project_id: String,
    /// GCP region (e.g., "us-central1")
    pub location: String,
    /// Default generation model for retrieve-and-generate (default: "gemini-1.5-pro")
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
}

fn default_generation_model() -> String {
    "gemini-1.5-pro".to_string()
}
