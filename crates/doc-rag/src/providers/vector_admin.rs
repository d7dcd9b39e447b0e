//! Managed vector index administration

use async_trait::async_trait;

use crate::error::Result;

/// One page of stored vector IDs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorIdPage {
    /// IDs on this page
    pub ids: Vec<String>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// Trait for listing and deleting vectors in a managed index
#[async_trait]
pub trait VectorIndexAdmin: Send + Sync {
    /// List one page of vector IDs
    async fn list_ids(&self, index: &str, page_token: Option<&str>) -> Result<VectorIdPage>;

    /// Delete vectors by ID
    async fn delete_ids(&self, index: &str, ids: &[String]) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
