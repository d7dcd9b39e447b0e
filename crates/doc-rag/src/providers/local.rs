//! Filesystem object store
//!
//! Buckets are directories under a root; keys may contain `/` and map to
//! nested paths.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

use super::object_store::ObjectStore;

/// Local object store using the filesystem
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, creating the directory
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        let path = Path::new(bucket);
        let single = path.components().count() == 1
            && matches!(path.components().next(), Some(Component::Normal(_)));
        if bucket.is_empty() || !single {
            return Err(Error::storage(format!("Invalid bucket name: {:?}", bucket)));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(Error::storage(format!("Invalid object key: {:?}", key)));
        }
        Ok(self.bucket_path(bucket)?.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<String> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let bucket_dir = self.bucket_path(bucket)?;
        if !bucket_dir.is_dir() {
            return Err(Error::NotFound(format!("Bucket {}", bucket)));
        }

        let mut keys = Vec::new();
        let mut pending = vec![bucket_dir.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&bucket_dir) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Object {}/{}", bucket, key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        let uri = store
            .put_object("docs", "manuals/pump.xml", b"<a/>".to_vec())
            .await
            .unwrap();
        assert!(uri.starts_with("file://"));
        store.put_object("docs", "readme.txt", b"hi".to_vec()).await.unwrap();

        let keys = store.list_objects("docs").await.unwrap();
        assert_eq!(keys, vec!["manuals/pump.xml", "readme.txt"]);

        store.delete_object("docs", "readme.txt").await.unwrap();
        assert_eq!(store.list_objects("docs").await.unwrap(), vec!["manuals/pump.xml"]);

        let err = store.delete_object("docs", "readme.txt").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        for key in ["../outside", "/abs", ""] {
            assert!(store.put_object("docs", key, vec![]).await.is_err(), "{}", key);
        }
        assert!(store.put_object("..", "k", vec![]).await.is_err());
        assert!(matches!(
            store.list_objects("missing").await,
            Err(Error::NotFound(_))
        ));
    }
}
