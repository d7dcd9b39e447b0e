//! Upload-and-ingest endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use super::Form;
use crate::error::{Error, Result};
use crate::pipeline::{IngestOutcome, IngestTarget};
use crate::server::state::AppState;

/// POST /api/ingest - Multipart `file`, `bucket`, `data_source_id`,
/// `knowledge_base_id` and optional `object_name`
///
/// Provider failures are reported in the outcome rather than as an HTTP error.
pub async fn ingest(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IngestOutcome>> {
    let form = Form::read(multipart).await?;
    let orchestrator = state.orchestrator()?;

    let upload = form.file("file")?;
    let target = IngestTarget {
        bucket: form.required_text("bucket")?,
        data_source_id: form.required_text("data_source_id")?,
        knowledge_base_id: form.required_text("knowledge_base_id")?,
    };
    let object_name = form
        .text("object_name")
        .or_else(|| upload.filename.clone())
        .ok_or_else(|| Error::Config("object_name is required when the file has no name".to_string()))?;

    tracing::info!(
        "Ingesting {} ({} bytes) into {}",
        object_name,
        upload.data.len(),
        target.knowledge_base_id
    );

    let outcome = orchestrator
        .ingest_bytes(&object_name, upload.data.to_vec(), &target)
        .await;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{serve, stub_state};
    use reqwest::multipart::{Form, Part};
    use serde_json::Value;
    use tempfile::TempDir;

    fn form(kb: &str) -> Form {
        Form::new()
            .text("bucket", "docs")
            .text("data_source_id", "ds-1")
            .text("knowledge_base_id", kb.to_string())
            .part("file", Part::bytes(b"%PDF".to_vec()).file_name("manual.pdf"))
    }

    #[tokio::test]
    async fn test_ingest_outcomes() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, true)).await;
        let client = reqwest::Client::new();

        let ok: Value = client
            .post(format!("{}/ingest", base))
            .multipart(form("kb-1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["status"], "Success");
        assert_eq!(ok["state"], "ingest_triggered");
        assert!(dir.path().join("buckets/docs/manual.pdf").exists());

        let failed: Value = client
            .post(format!("{}/ingest", base))
            .multipart(form("broken"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["state"], "ingest_failed");
    }

    #[tokio::test]
    async fn test_without_knowledge_base() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, false)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/ingest", base))
            .multipart(form("kb-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
