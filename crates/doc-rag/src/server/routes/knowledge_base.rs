//! Managed knowledge base query endpoint

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pipeline::process_questions;
use crate::server::state::AppState;
use crate::types::KnowledgeBaseAnswer;

/// Body of POST /api/kb/query
#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseQuery {
    /// Questions, answered in order
    pub questions: Vec<String>,
    /// Knowledge base to query
    pub knowledge_base_id: String,
    /// Generation model; defaults to `gcp.generation_model`
    #[serde(default)]
    pub model_id: Option<String>,
}

/// POST /api/kb/query
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<KnowledgeBaseQuery>,
) -> Result<Json<Vec<KnowledgeBaseAnswer>>> {
    let service = state.knowledge_base()?;
    let model_id = match request.model_id {
        Some(model) => model,
        None => state
            .config()
            .gcp
            .as_ref()
            .map(|g| g.generation_model.clone())
            .ok_or_else(|| Error::Config("model_id is required".to_string()))?,
    };

    let answers = process_questions(
        service.as_ref(),
        &request.questions,
        &request.knowledge_base_id,
        &model_id,
    )
    .await;
    Ok(Json(answers))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{serve, stub_state};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_query_keeps_order() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, true)).await;

        let answers: Value = reqwest::Client::new()
            .post(format!("{}/kb/query", base))
            .json(&json!({
                "questions": ["one?", "fail two?"],
                "knowledge_base_id": "kb",
                "model_id": "m"
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(answers[0]["answer"], "one? via kb/m");
        assert!(answers[1]["answer"].is_null());
        assert!(answers[1]["error"].is_string());
    }
}
