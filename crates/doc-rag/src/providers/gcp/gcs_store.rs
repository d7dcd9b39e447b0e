//! Google Cloud Storage object store

use async_trait::async_trait;
use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};

use crate::error::{Error, Result};
use crate::providers::object_store::ObjectStore;

/// GCS-backed object store
///
/// Credentials come from the environment (`GOOGLE_APPLICATION_CREDENTIALS`
/// or the metadata server).
pub struct GcsObjectStore {
    client: GcsClient,
}

impl GcsObjectStore {
    /// Create a store using ambient credentials
    pub async fn new() -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
        })
    }
}

/// MIME type recorded on upload
pub(crate) fn content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .to_string()
}

/// `gs://` URI of an object
pub(crate) fn gcs_uri(bucket: &str, key: &str) -> String {
    format!("gs://{}/{}", bucket, key)
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<String> {
        let mut media = Media::new(key.to_string());
        media.content_type = content_type(key).into();

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: bucket.to_string(),
                    ..Default::default()
                },
                data,
                &UploadType::Simple(media),
            )
            .await
            .map_err(|e| Error::storage(format!("Failed to upload {} to GCS: {}", key, e)))?;

        Ok(gcs_uri(bucket, key))
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut page_token = None;

        loop {
            let page = self
                .client
                .list_objects(&ListObjectsRequest {
                    bucket: bucket.to_string(),
                    page_token: page_token.take(),
                    ..Default::default()
                })
                .await
                .map_err(|e| Error::storage(format!("Failed to list GCS objects: {}", e)))?;

            keys.extend(page.items.unwrap_or_default().into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| Error::storage(format!("Failed to delete {} from GCS: {}", key, e)))
    }

    fn name(&self) -> &str {
        "gcs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_and_uri() {
        assert_eq!(content_type("docs/manual.pdf"), "application/pdf");
        assert_eq!(content_type("notes"), "application/octet-stream");
        assert_eq!(gcs_uri("bucket", "a/b.xml"), "gs://bucket/a/b.xml");
    }
}
