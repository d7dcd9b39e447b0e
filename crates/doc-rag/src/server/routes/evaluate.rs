//! Evaluation endpoints

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use uuid::Uuid;

use super::Form;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Document, EvaluationReport, ProcessingMode};

/// POST /api/evaluate - Multipart `document`, `questions` (CSV) and `mode`
pub async fn evaluate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationReport>> {
    let form = Form::read(multipart).await?;

    let mode_text = form.required_text("mode")?;
    let mode = ProcessingMode::parse(&mode_text)
        .ok_or_else(|| Error::Config(format!("Unknown mode '{}'", mode_text)))?;

    let upload = form.file("document")?;
    let filename = upload
        .filename
        .clone()
        .ok_or_else(|| Error::UnsupportedFileType("document has no file name".to_string()))?;
    let document = Document::new(filename, upload.data.to_vec());
    let questions = form.file("questions")?;

    tracing::info!(
        "Evaluating {} ({} bytes) in mode {}",
        document.filename(),
        document.len(),
        mode.label()
    );

    let report = state
        .session()
        .run(&document, &questions.data, mode)
        .await?;
    state.add_report(report.clone());
    Ok(Json(report))
}

/// GET /api/evaluations/:id
pub async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationReport>> {
    state
        .get_report(&id)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Evaluation {}", id)))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{serve, stub_state};
    use reqwest::multipart::{Form, Part};
    use serde_json::Value;
    use tempfile::TempDir;

    const XML: &str = "<manual><step>Check the oil level every week.</step></manual>";

    fn form(mode: &str, filename: &str) -> Form {
        Form::new()
            .text("mode", mode.to_string())
            .part(
                "document",
                Part::bytes(XML.as_bytes().to_vec()).file_name(filename.to_string()),
            )
            .part(
                "questions",
                Part::bytes(b"question\nHow often is oil checked?\n".to_vec())
                    .file_name("questions.csv"),
            )
    }

    #[tokio::test]
    async fn test_evaluate_and_fetch() {
        let dir = TempDir::new().unwrap();
        let state = stub_state(&dir, false);
        let base = serve(state.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/evaluate", base))
            .multipart(form("XML to ENRICHED XML", "manual.xml"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let report: Value = response.json().await.unwrap();
        assert_eq!(report["mode"], "xml_to_enriched_xml");
        assert_eq!(report["results"].as_array().unwrap().len(), 1);
        assert_eq!(state.report_count(), 1);

        let id = report["id"].as_str().unwrap();
        let fetched: Value = client
            .get(format!("{}/evaluations/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["id"], report["id"]);
    }

    #[tokio::test]
    async fn test_bad_mode_and_unknown_report() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, false)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/evaluate", base))
            .multipart(form("PDF please", "manual.xml"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = client
            .get(format!("{}/evaluations/{}", base, uuid::Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
