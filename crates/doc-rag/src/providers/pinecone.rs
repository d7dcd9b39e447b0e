//! Pinecone index administration over the REST API

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::vector_admin::{VectorIdPage, VectorIndexAdmin};

/// Pinecone control and data plane client
pub struct PineconeIndexAdmin {
    client: Client,
    control_url: String,
    namespace: Option<String>,
    /// Data plane host per index name
    hosts: DashMap<String, String>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedVector {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

impl PineconeIndexAdmin {
    /// Create a client; fails when the key is blank
    pub fn new(config: &VectorIndexConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("missing Pinecone API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| Error::Config("invalid Pinecone API key".to_string()))?,
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            control_url: config.control_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            hosts: DashMap::new(),
        })
    }

    /// Resolve the data plane URL of an index
    async fn host(&self, index: &str) -> Result<String> {
        if let Some(host) = self.hosts.get(index) {
            return Ok(host.clone());
        }

        let url = format!("{}/indexes/{}", self.control_url, index);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Describe index request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Vector index {}", index)));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Describe index failed ({}): {}",
                status, body
            )));
        }

        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse index description: {}", e)))?;

        let host = if described.host.contains("://") {
            described.host
        } else {
            format!("https://{}", described.host)
        };
        let host = host.trim_end_matches('/').to_string();
        self.hosts.insert(index.to_string(), host.clone());
        Ok(host)
    }
}

#[async_trait]
impl VectorIndexAdmin for PineconeIndexAdmin {
    async fn list_ids(&self, index: &str, page_token: Option<&str>) -> Result<VectorIdPage> {
        let host = self.host(index).await?;

        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(ns) = self.namespace.as_deref() {
            query.push(("namespace", ns));
        }
        if let Some(token) = page_token {
            query.push(("paginationToken", token));
        }

        let response = self
            .client
            .get(format!("{}/vectors/list", host))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("List request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!("List failed ({}): {}", status, body)));
        }

        let listed: ListResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse list response: {}", e)))?;

        Ok(VectorIdPage {
            ids: listed.vectors.into_iter().map(|v| v.id).collect(),
            next_token: listed
                .pagination
                .and_then(|p| p.next)
                .filter(|t| !t.is_empty()),
        })
    }

    async fn delete_ids(&self, index: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let host = self.host(index).await?;

        let response = self
            .client
            .post(format!("{}/vectors/delete", host))
            .json(&DeleteRequest {
                ids,
                namespace: self.namespace.as_deref(),
            })
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!("Delete failed ({}): {}", status, body)));
        }

        tracing::debug!("Deleted {} vectors from {}", ids.len(), index);
        Ok(())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Query, State},
        http::{HeaderMap as AxumHeaders, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Mock {
        base: Arc<Mutex<String>>,
        deleted: Arc<Mutex<Vec<String>>>,
    }

    async fn spawn_mock() -> (String, Mock) {
        let mock = Mock::default();
        let router = Router::new()
            .route(
                "/indexes/:name",
                get(|State(m): State<Mock>, headers: AxumHeaders| async move {
                    assert_eq!(headers["api-key"], "pc-test");
                    let base = m.base.lock().unwrap().clone();
                    Json(json!({"name": "docs", "host": base}))
                }),
            )
            .route(
                "/vectors/list",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q.get("namespace").map(String::as_str), Some("ns1"));
                    match q.get("paginationToken").map(String::as_str) {
                        None => Json(json!({
                            "vectors": [{"id": "a"}, {"id": "b"}],
                            "pagination": {"next": "p2"}
                        })),
                        _ => Json(json!({"vectors": [{"id": "c"}]})),
                    }
                }),
            )
            .route(
                "/vectors/delete",
                post(|State(m): State<Mock>, Json(body): Json<Value>| async move {
                    let ids = body["ids"].as_array().cloned().unwrap_or_default();
                    m.deleted
                        .lock()
                        .unwrap()
                        .extend(ids.iter().filter_map(|v| v.as_str().map(str::to_string)));
                    (StatusCode::OK, Json(json!({})))
                }),
            )
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        *mock.base.lock().unwrap() = base.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (base, mock)
    }

    fn admin(base: &str) -> PineconeIndexAdmin {
        let config = VectorIndexConfig {
            control_url: base.to_string(),
            namespace: Some("ns1".to_string()),
            ..Default::default()
        };
        PineconeIndexAdmin::new(&config, "pc-test").unwrap()
    }

    #[tokio::test]
    async fn test_list_pages_and_delete() {
        let (base, mock) = spawn_mock().await;
        let admin = admin(&base);

        let first = admin.list_ids("docs", None).await.unwrap();
        assert_eq!(first.ids, vec!["a", "b"]);
        assert_eq!(first.next_token.as_deref(), Some("p2"));

        let second = admin.list_ids("docs", Some("p2")).await.unwrap();
        assert_eq!(second.ids, vec!["c"]);
        assert!(second.next_token.is_none());

        admin
            .delete_ids("docs", &["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(*mock.deleted.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            PineconeIndexAdmin::new(&VectorIndexConfig::default(), " "),
            Err(Error::Config(_))
        ));
    }
}
