//! Teardown endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::pipeline::{clear_bucket, clear_vector_index};
use crate::server::state::AppState;
use crate::types::TeardownResponse;

/// DELETE /api/buckets/:bucket
pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<TeardownResponse>> {
    let deleted = clear_bucket(state.providers().store.as_ref(), &bucket).await?;
    Ok(Json(TeardownResponse {
        target: bucket,
        deleted,
    }))
}

/// DELETE /api/vector-indexes/:name
pub async fn delete_vector_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TeardownResponse>> {
    let admin = state.vector_admin()?;
    let batch_size = state.config().vector_index.delete_batch_size;
    let deleted = clear_vector_index(admin.as_ref(), &name, batch_size).await?;
    Ok(Json(TeardownResponse {
        target: name,
        deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{serve, stub_state};
    use serde_json::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_delete_bucket_and_index() {
        let dir = TempDir::new().unwrap();
        let state = stub_state(&dir, false);
        for key in ["a.txt", "b.txt"] {
            state
                .providers()
                .store
                .put_object("docs", key, b"x".to_vec())
                .await
                .unwrap();
        }
        let base = serve(state).await;
        let client = reqwest::Client::new();

        let bucket: Value = client
            .delete(format!("{}/buckets/docs", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(bucket["deleted"], 2);

        let missing = client
            .delete(format!("{}/buckets/nope", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let index: Value = client
            .delete(format!("{}/vector-indexes/idx", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(index["target"], "idx");
        assert_eq!(index["deleted"], 2);
    }
}
