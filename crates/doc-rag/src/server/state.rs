//! Application state for the HTTP server

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::{EvaluationSession, IngestionOrchestrator};
use crate::providers::{
    self, EmbeddingProvider, KnowledgeBaseService, LlmProvider, ObjectStore, VectorIndexAdmin,
};
use crate::types::EvaluationReport;

/// Provider set the server is wired with
#[derive(Clone)]
pub struct Providers {
    /// Embedding provider
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Chat provider
    pub llm: Arc<dyn LlmProvider>,
    /// Object storage
    pub store: Arc<dyn ObjectStore>,
    /// Managed knowledge base, when configured
    pub knowledge_base: Option<Arc<dyn KnowledgeBaseService>>,
    /// Managed vector index admin, when configured
    pub vector_admin: Option<Arc<dyn VectorIndexAdmin>>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    providers: Providers,
    /// Finished evaluation reports
    reports: DashMap<Uuid, EvaluationReport>,
    ready: RwLock<bool>,
}

impl AppState {
    /// Build providers from configuration
    ///
    /// Embedding, chat and object storage are required. The knowledge base
    /// and vector index admin are optional; their endpoints answer with a
    /// configuration error when missing.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let embedder = providers::embedder_from_config(&config)?;
        let llm = providers::llm_from_config(&config)?;
        let store = providers::object_store_from_config(&config).await?;
        tracing::info!("Object store: {}", store.name());

        let knowledge_base = match providers::knowledge_base_from_config(&config) {
            Ok(kb) => {
                tracing::info!("Knowledge base: {}", kb.name());
                Some(kb)
            }
            Err(e) => {
                tracing::warn!("Knowledge base disabled: {}", e);
                None
            }
        };
        let vector_admin = match providers::vector_admin_from_config(&config) {
            Ok(admin) => Some(admin),
            Err(e) => {
                tracing::warn!("Vector index teardown disabled: {}", e);
                None
            }
        };

        tokio::fs::create_dir_all(&config.server.work_dir).await?;

        let state = Self::from_parts(
            config,
            Providers {
                embedder,
                llm,
                store,
                knowledge_base,
                vector_admin,
            },
        );
        state.set_ready(true);
        Ok(state)
    }

    /// Wrap an already built provider set
    pub fn from_parts(config: RagConfig, providers: Providers) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                providers,
                reports: DashMap::new(),
                ready: RwLock::new(false),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the provider set
    pub fn providers(&self) -> &Providers {
        &self.inner.providers
    }

    /// Evaluation session over the configured providers
    pub fn session(&self) -> EvaluationSession {
        EvaluationSession::new(
            &self.inner.config,
            Arc::clone(&self.inner.providers.embedder),
            Arc::clone(&self.inner.providers.llm),
        )
    }

    /// Managed knowledge base, or a config error when none is configured
    pub fn knowledge_base(&self) -> Result<Arc<dyn KnowledgeBaseService>> {
        self.inner
            .providers
            .knowledge_base
            .clone()
            .ok_or_else(|| Error::Config("no managed knowledge base configured".to_string()))
    }

    /// Vector index admin, or a config error when none is configured
    pub fn vector_admin(&self) -> Result<Arc<dyn VectorIndexAdmin>> {
        self.inner
            .providers
            .vector_admin
            .clone()
            .ok_or_else(|| Error::Config("no managed vector index configured".to_string()))
    }

    /// Upload-and-ingest orchestrator
    pub fn orchestrator(&self) -> Result<IngestionOrchestrator> {
        Ok(IngestionOrchestrator::new(
            Arc::clone(&self.inner.providers.store),
            self.knowledge_base()?,
        ))
    }

    /// Store a finished report, evicting the oldest beyond `server.max_reports`
    pub fn add_report(&self, report: EvaluationReport) {
        let reports = &self.inner.reports;
        reports.insert(report.id, report);

        let limit = self.inner.config.server.max_reports.max(1);
        while reports.len() > limit {
            let oldest = reports
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    tracing::debug!("Evicting evaluation report {}", id);
                    reports.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Look up a report
    pub fn get_report(&self, id: &Uuid) -> Option<EvaluationReport> {
        self.inner.reports.get(id).map(|r| r.clone())
    }

    /// Number of stored reports
    pub fn report_count(&self) -> usize {
        self.inner.reports.len()
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
