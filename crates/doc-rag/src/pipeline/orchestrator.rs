//! Upload to object storage, then trigger managed ingestion

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{IngestionJob, KnowledgeBaseService, ObjectStore};

/// Orchestrator state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    /// Nothing started
    Idle,
    /// Upload in flight
    Uploading,
    /// Upload failed (terminal)
    UploadFailed,
    /// Object stored
    Uploaded,
    /// Ingestion request in flight
    Ingesting,
    /// Ingestion job started (terminal)
    IngestTriggered,
    /// Ingestion request failed (terminal)
    IngestFailed,
}

impl IngestState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UploadFailed | Self::IngestTriggered | Self::IngestFailed
        )
    }

    /// Whether `next` directly follows this state
    pub fn can_transition_to(&self, next: IngestState) -> bool {
        use IngestState::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Idle, UploadFailed)
                | (Uploading, UploadFailed)
                | (Uploading, Uploaded)
                | (Uploaded, Ingesting)
                | (Ingesting, IngestTriggered)
                | (Ingesting, IngestFailed)
        )
    }
}

/// Where an uploaded file is stored and ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestTarget {
    /// Object storage bucket
    pub bucket: String,
    /// Data source registered with the knowledge base
    pub data_source_id: String,
    /// Knowledge base that ingests the data source
    pub knowledge_base_id: String,
}

/// Result of one upload-and-ingest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Whether the ingestion job was started
    pub success: bool,
    /// `"Success"` or `"Failed"`
    pub status: String,
    /// Final orchestrator state
    pub state: IngestState,
    /// Object key the file was stored under
    pub object_name: String,
    /// URI of the stored object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_uri: Option<String>,
    /// Started ingestion job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<IngestionJob>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Run {
    state: IngestState,
    object_name: String,
    object_uri: Option<String>,
    job: Option<IngestionJob>,
    error: Option<String>,
}

impl Run {
    fn new(object_name: &str) -> Self {
        Self {
            state: IngestState::Idle,
            object_name: object_name.to_string(),
            object_uri: None,
            job: None,
            error: None,
        }
    }

    fn advance(&mut self, next: IngestState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::internal(format!(
                "Invalid ingest transition {:?} -> {:?}",
                self.state, next
            )));
        }
        tracing::debug!("{}: {:?} -> {:?}", self.object_name, self.state, next);
        self.state = next;
        Ok(())
    }

    fn fail(mut self, next: IngestState, error: &Error) -> IngestOutcome {
        tracing::error!("Ingest of {} failed: {}", self.object_name, error);
        if let Err(e) = self.advance(next) {
            tracing::error!("{}", e);
        }
        self.error = Some(error.to_string());
        self.finish()
    }

    fn finish(self) -> IngestOutcome {
        let success = self.state == IngestState::IngestTriggered;
        IngestOutcome {
            success,
            status: if success { "Success" } else { "Failed" }.to_string(),
            state: self.state,
            object_name: self.object_name,
            object_uri: self.object_uri,
            job: self.job,
            error: self.error,
        }
    }
}

/// Stores documents and starts knowledge base ingestion
pub struct IngestionOrchestrator {
    store: Arc<dyn ObjectStore>,
    knowledge_base: Arc<dyn KnowledgeBaseService>,
}

impl IngestionOrchestrator {
    /// Create an orchestrator
    pub fn new(store: Arc<dyn ObjectStore>, knowledge_base: Arc<dyn KnowledgeBaseService>) -> Self {
        Self {
            store,
            knowledge_base,
        }
    }

    /// Upload a local file and ingest it; the object name defaults to the file name
    pub async fn upload_and_ingest(
        &self,
        path: &Path,
        target: &IngestTarget,
        object_name: Option<&str>,
    ) -> IngestOutcome {
        let default_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = object_name.unwrap_or(&default_name);

        match tokio::fs::read(path).await {
            Ok(data) => self.ingest_bytes(name, data, target).await,
            Err(e) => Run::new(name).fail(IngestState::UploadFailed, &Error::Io(e)),
        }
    }

    /// Upload bytes under `object_name` and ingest them
    pub async fn ingest_bytes(
        &self,
        object_name: &str,
        data: Vec<u8>,
        target: &IngestTarget,
    ) -> IngestOutcome {
        let mut run = Run::new(object_name);
        if object_name.is_empty() {
            return run.fail(
                IngestState::UploadFailed,
                &Error::storage("Object name is empty"),
            );
        }

        if let Err(e) = run.advance(IngestState::Uploading) {
            return run.fail(IngestState::UploadFailed, &e);
        }
        match self
            .store
            .put_object(&target.bucket, object_name, data)
            .await
        {
            Ok(uri) => {
                tracing::info!("Uploaded {} to {}", object_name, uri);
                run.object_uri = Some(uri);
            }
            Err(e) => return run.fail(IngestState::UploadFailed, &e),
        }

        if let Err(e) = run
            .advance(IngestState::Uploaded)
            .and_then(|_| run.advance(IngestState::Ingesting))
        {
            return run.fail(IngestState::IngestFailed, &e);
        }

        match self
            .knowledge_base
            .start_ingestion_job(&target.knowledge_base_id, &target.data_source_id)
            .await
        {
            Ok(job) => {
                tracing::info!(
                    "Ingestion job {} started for {} ({})",
                    job.job_id,
                    target.knowledge_base_id,
                    job.status
                );
                run.job = Some(job);
                if let Err(e) = run.advance(IngestState::IngestTriggered) {
                    return run.fail(IngestState::IngestFailed, &e);
                }
                run.finish()
            }
            Err(e) => run.fail(IngestState::IngestFailed, &e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::LocalObjectStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// Records calls; fails ingestion for knowledge base "broken" and
    /// generation for questions containing "fail"
    #[derive(Default)]
    pub(crate) struct StubKnowledgeBase {
        pub jobs: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl KnowledgeBaseService for StubKnowledgeBase {
        async fn start_ingestion_job(&self, kb: &str, ds: &str) -> Result<IngestionJob> {
            if kb == "broken" {
                return Err(Error::knowledge_base("access denied"));
            }
            self.jobs.lock().push((kb.to_string(), ds.to_string()));
            Ok(IngestionJob {
                job_id: "job-1".to_string(),
                status: "STARTING".to_string(),
            })
        }

        async fn retrieve_and_generate(&self, text: &str, kb: &str, model: &str) -> Result<String> {
            if text.contains("fail") {
                return Err(Error::knowledge_base("throttled"));
            }
            Ok(format!("{} via {}/{}", text, kb, model))
        }

        fn name(&self) -> &str {
            "stub-kb"
        }
    }

    fn target(kb: &str) -> IngestTarget {
        IngestTarget {
            bucket: "docs".to_string(),
            data_source_id: "ds-1".to_string(),
            knowledge_base_id: kb.to_string(),
        }
    }

    fn orchestrator(dir: &TempDir, kb: Arc<StubKnowledgeBase>) -> IngestionOrchestrator {
        let store = LocalObjectStore::new(dir.path().join("buckets")).unwrap();
        IngestionOrchestrator::new(Arc::new(store), kb)
    }

    #[tokio::test]
    async fn test_success_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("manual.pdf");
        tokio::fs::write(&file, b"%PDF").await.unwrap();
        let kb = Arc::new(StubKnowledgeBase::default());

        let outcome = orchestrator(&dir, kb.clone())
            .upload_and_ingest(&file, &target("kb-1"), None)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.status, "Success");
        assert_eq!(outcome.state, IngestState::IngestTriggered);
        assert_eq!(outcome.object_name, "manual.pdf");
        assert!(dir.path().join("buckets/docs/manual.pdf").exists());
        assert_eq!(*kb.jobs.lock(), vec![("kb-1".to_string(), "ds-1".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_file_is_upload_failure() {
        let dir = TempDir::new().unwrap();
        let kb = Arc::new(StubKnowledgeBase::default());

        let outcome = orchestrator(&dir, kb.clone())
            .upload_and_ingest(&dir.path().join("missing.pdf"), &target("kb-1"), Some("x.pdf"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, "Failed");
        assert_eq!(outcome.state, IngestState::UploadFailed);
        assert!(kb.jobs.lock().is_empty());
    }

    /// Rejects every write
    struct ReadOnlyStore;

    #[async_trait]
    impl ObjectStore for ReadOnlyStore {
        async fn put_object(&self, bucket: &str, _key: &str, _data: Vec<u8>) -> Result<String> {
            Err(Error::storage(format!("bucket {} is read-only", bucket)))
        }

        async fn list_objects(&self, _bucket: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn delete_object(&self, _bucket: &str, _key: &str) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "read-only"
        }
    }

    #[tokio::test]
    async fn test_store_failure_skips_ingestion() {
        let kb = Arc::new(StubKnowledgeBase::default());
        let orchestrator = IngestionOrchestrator::new(Arc::new(ReadOnlyStore), kb.clone());

        let outcome = orchestrator
            .ingest_bytes("x", Vec::new(), &target("kb-1"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, "Failed");
        assert_eq!(outcome.state, IngestState::UploadFailed);
        assert!(outcome.object_uri.is_none());
        assert!(outcome.error.unwrap().contains("read-only"));
        assert!(kb.jobs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_uploaded_and_ingested() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.bin");
        tokio::fs::write(&file, b"").await.unwrap();
        let kb = Arc::new(StubKnowledgeBase::default());

        let outcome = orchestrator(&dir, kb.clone())
            .upload_and_ingest(&file, &target("kb-1"), None)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.state, IngestState::IngestTriggered);
        assert_eq!(outcome.object_name, "empty.bin");
        let stored = dir.path().join("buckets/docs/empty.bin");
        assert_eq!(std::fs::metadata(stored).unwrap().len(), 0);
        assert_eq!(kb.jobs.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_failure_after_upload() {
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(&dir, Arc::new(StubKnowledgeBase::default()))
            .ingest_bytes("a.txt", b"hello".to_vec(), &target("broken"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.state, IngestState::IngestFailed);
        assert!(outcome.object_uri.is_some());
        assert!(outcome.error.unwrap().contains("access denied"));
    }

    #[test]
    fn test_transitions() {
        use IngestState::*;
        assert!(Idle.can_transition_to(Uploading));
        assert!(!Idle.can_transition_to(IngestTriggered));
        assert!(!Uploaded.can_transition_to(IngestTriggered));
        assert!(IngestFailed.is_terminal());
        assert!(!Ingesting.is_terminal());
    }
}
