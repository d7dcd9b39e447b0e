//! Object storage provider trait

use async_trait::async_trait;
use crate::error::Result;

/// Trait for bucket-style object storage
///
/// Implementations:
/// - `LocalObjectStore`: one directory per bucket on the local filesystem
/// - `GcsObjectStore`: Google Cloud Storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, returning the object URI
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<String>;

    /// All object keys in a bucket
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>>;

    /// Delete one object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
