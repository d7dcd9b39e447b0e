//! Clearing object storage buckets and managed vector indexes

use std::collections::HashSet;

use crate::error::Result;
use crate::providers::{ObjectStore, VectorIndexAdmin};

/// Delete every object in a bucket, returning the number deleted
pub async fn clear_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<usize> {
    let keys = store.list_objects(bucket).await.map_err(|e| {
        tracing::error!("Listing bucket {} failed: {}", bucket, e);
        e
    })?;

    let mut deleted = 0;
    for key in &keys {
        if let Err(e) = store.delete_object(bucket, key).await {
            tracing::error!("Deleting {}/{} failed after {} deletions: {}", bucket, key, deleted, e);
            return Err(e);
        }
        deleted += 1;
    }

    tracing::info!("Cleared {} objects from {} ({})", deleted, bucket, store.name());
    Ok(deleted)
}

/// Delete every vector stored in an index, returning the number deleted
///
/// IDs are enumerated through the provider's paginated listing before any
/// deletion, then removed in batches of `batch_size`.
pub async fn clear_vector_index(
    admin: &dyn VectorIndexAdmin,
    index: &str,
    batch_size: usize,
) -> Result<usize> {
    let mut ids = Vec::new();
    let mut token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    loop {
        let page = admin.list_ids(index, token.as_deref()).await.map_err(|e| {
            tracing::error!("Listing vectors in {} failed: {}", index, e);
            e
        })?;
        ids.extend(page.ids);
        match page.next_token {
            Some(next) if seen_tokens.insert(next.clone()) => token = Some(next),
            Some(next) => {
                tracing::warn!("Listing {} returned page token {} again, stopping", index, next);
                break;
            }
            None => break,
        }
    }

    for batch in ids.chunks(batch_size.max(1)) {
        admin.delete_ids(index, batch).await.map_err(|e| {
            tracing::error!("Deleting vectors from {} failed: {}", index, e);
            e
        })?;
    }

    tracing::info!("Cleared {} vectors from {} ({})", ids.len(), index, admin.name());
    Ok(ids.len())
}
