// Blob store abstraction for uploaded face images

pub mod s3;

pub use s3::S3Backend;

use std::sync::Arc;

use crate::error::AppResult;

/// Object storage used to hand images to the face service.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores `data` under `key` and returns the storage path.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    fn bucket(&self) -> &str;
}

/// Fresh unique object key for an uploaded image.
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Deletes an object without surfacing failures.
pub async fn discard(storage: &Arc<dyn StorageBackend>, key: &str) {
    if let Err(e) = storage.delete(key).await {
        tracing::warn!(
            "Failed to delete transient image: bucket={}, key={}, error={}",
            storage.bucket(),
            key,
            e
        );
    }
}
