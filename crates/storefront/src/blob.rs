//! Blob store boundary.
//!
//! Product images are uploaded once by catalog administration and then
//! referenced everywhere by their stable public URL; nothing else in the
//! core touches blob data.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Errors surfaced by blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The upload was rejected.
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

/// A handle to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle(String);

impl BlobHandle {
    /// The blob's path within the store.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.0
    }
}

/// The blob store capability set catalog administration consumes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes at a path, returning a handle.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobHandle, BlobError>;

    /// The stable public URL for an uploaded blob.
    fn public_url(&self, handle: &BlobHandle) -> String;
}

/// In-memory [`BlobStore`] for tests and local development.
#[derive(Clone)]
pub struct MemoryBlobStore {
    inner: Arc<MemoryBlobStoreInner>,
}

struct MemoryBlobStoreInner {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create a store whose public URLs hang off `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryBlobStoreInner {
                base_url: base_url.into(),
                objects: RwLock::new(HashMap::new()),
            }),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobHandle, BlobError> {
        if path.is_empty() {
            return Err(BlobError::UploadFailed("empty path".into()));
        }
        self.inner
            .objects
            .write()
            .await
            .insert(path.to_owned(), bytes);
        Ok(BlobHandle(path.to_owned()))
    }

    fn public_url(&self, handle: &BlobHandle) -> String {
        format!("{}/{}", self.inner.base_url.trim_end_matches('/'), handle.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_yields_stable_url() {
        let blobs = MemoryBlobStore::new("https://cdn.example");
        let handle = blobs
            .upload("product-images/shirt.jpg", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(
            blobs.public_url(&handle),
            "https://cdn.example/product-images/shirt.jpg"
        );
        // The URL is derived from the handle alone; calling again is identical
        assert_eq!(blobs.public_url(&handle), blobs.public_url(&handle));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_path() {
        let blobs = MemoryBlobStore::new("https://cdn.example");
        assert!(blobs.upload("", vec![]).await.is_err());
    }
}
