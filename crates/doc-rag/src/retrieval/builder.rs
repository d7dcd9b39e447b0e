//! Embeds extracts and loads them into a flat index

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use super::index::FlatIndex;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

/// An extract whose embedding failed after all retries
#[derive(Debug, Clone)]
pub struct EmbeddingFailure {
    /// Extract position
    pub position: usize,
    /// Last error message
    pub error: String,
}

/// Per-position outcome of a batch embedding run
#[derive(Debug, Default)]
pub struct BatchEmbeddingReport {
    /// Vector per position, `None` where embedding failed
    pub embeddings: Vec<Option<Vec<f32>>>,
    /// Failed positions in ascending order
    pub failures: Vec<EmbeddingFailure>,
}

impl BatchEmbeddingReport {
    /// Whether every position has a vector
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of successfully embedded extracts
    pub fn succeeded(&self) -> usize {
        self.embeddings.iter().filter(|e| e.is_some()).count()
    }

    /// All vectors in position order, or an error naming the failed positions
    pub fn into_vectors(self) -> Result<Vec<Vec<f32>>> {
        if !self.is_complete() {
            let positions: Vec<String> = self
                .failures
                .iter()
                .map(|f| f.position.to_string())
                .collect();
            let first = self
                .failures
                .first()
                .map(|f| f.error.as_str())
                .unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed for extracts [{}]: {}",
                positions.join(", "),
                first
            )));
        }
        Ok(self.embeddings.into_iter().flatten().collect())
    }
}

/// Index builder over an embedding provider
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl IndexBuilder {
    /// Create a builder with the batch settings from `config`
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self {
            embedder,
            concurrency: config.concurrency.max(1),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Base delay of the exponential backoff
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Embed one extract at a time in order; the first failure aborts
    pub async fn build_sequential(&self, extracts: &[String]) -> Result<(FlatIndex, Vec<Vec<f32>>)> {
        ensure_not_empty(extracts)?;

        let mut vectors = Vec::with_capacity(extracts.len());
        for (position, extract) in extracts.iter().enumerate() {
            let vector = self.embedder.embed(extract).await.map_err(|e| {
                tracing::error!("Embedding extract {} failed: {}", position, e);
                e
            })?;
            vectors.push(vector);
        }

        let index = FlatIndex::from_vectors(&vectors)?;
        tracing::info!(
            "Indexed {} extracts ({} dimensions)",
            index.len(),
            index.dimensions()
        );
        Ok((index, vectors))
    }

    /// Embed all extracts concurrently with retries, keeping input order
    pub async fn embed_all(&self, extracts: &[String]) -> BatchEmbeddingReport {
        let results: Vec<Result<Vec<f32>>> = stream::iter(extracts.to_vec())
            .map(|extract| {
                embed_with_retry(
                    Arc::clone(&self.embedder),
                    extract,
                    self.max_retries,
                    self.retry_delay,
                )
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchEmbeddingReport {
            embeddings: Vec::with_capacity(results.len()),
            failures: Vec::new(),
        };
        for (position, result) in results.into_iter().enumerate() {
            match result {
                Ok(vector) => report.embeddings.push(Some(vector)),
                Err(e) => {
                    tracing::error!("Embedding extract {} failed: {}", position, e);
                    report.failures.push(EmbeddingFailure {
                        position,
                        error: e.to_string(),
                    });
                    report.embeddings.push(None);
                }
            }
        }
        report
    }

    /// Batch build; the index is only built when every extract was embedded
    pub async fn build(&self, extracts: &[String]) -> Result<(FlatIndex, Vec<Vec<f32>>)> {
        ensure_not_empty(extracts)?;

        let report = self.embed_all(extracts).await;
        if !report.is_complete() {
            tracing::warn!(
                "{} of {} extracts embedded",
                report.succeeded(),
                extracts.len()
            );
        }
        let vectors = report.into_vectors()?;

        let index = FlatIndex::from_vectors(&vectors)?;
        tracing::info!(
            "Indexed {} extracts ({} dimensions)",
            index.len(),
            index.dimensions()
        );
        Ok((index, vectors))
    }
}

/// Owns its inputs so the future stays `Send` inside `buffered`
async fn embed_with_retry(
    embedder: Arc<dyn EmbeddingProvider>,
    text: String,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<Vec<f32>> {
    let mut attempt = 0;
    loop {
        match embedder.embed(&text).await {
            Ok(vector) => return Ok(vector),
            Err(e) if attempt < max_retries => {
                let delay = retry_delay * 2u32.pow(attempt);
                tracing::warn!(
                    "Embedding failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn ensure_not_empty(extracts: &[String]) -> Result<()> {
    if extracts.is_empty() {
        return Err(Error::embedding("No extracts to embed"));
    }
    Ok(())
}
