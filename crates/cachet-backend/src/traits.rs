use async_trait::async_trait;
use bytes::Bytes;
use cachet_types::{BlobMetadata, CollectionPath, PathKey};
use serde_json::Value;

use crate::error::BackendResult;

/// Document database capability.
///
/// Implementations must be thread-safe (`Send + Sync`). Documents are opaque
/// JSON values; the backend never interprets their contents.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Fetch the stored snapshot of a document.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    async fn get_document(&self, key: &PathKey) -> BackendResult<Option<Value>>;

    /// Write (create or fully overwrite) a document and return its id.
    ///
    /// When `id` is `None` the backend assigns a fresh one.
    async fn put_document(
        &self,
        collection: &CollectionPath,
        id: Option<&str>,
        payload: Value,
    ) -> BackendResult<String>;

    /// Delete a document.
    async fn delete_document(&self, key: &PathKey) -> BackendResult<()>;

    /// List the ids of the documents directly inside `collection`.
    async fn list_documents(&self, collection: &CollectionPath) -> BackendResult<Vec<String>>;
}

/// Flat key-value blob store capability.
///
/// Object keys may contain `/` but the store attaches no meaning to it.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Fetch an object's metadata.
    ///
    /// Fails with [`BackendError::NotFound`](crate::BackendError::NotFound)
    /// when the object does not exist.
    async fn get_blob_metadata(&self, bucket: &str, key: &str) -> BackendResult<BlobMetadata>;

    /// Write (create or overwrite) an object.
    async fn put_blob(&self, bucket: &str, key: &str, content: Bytes) -> BackendResult<()>;

    /// Delete an object.
    async fn delete_blob(&self, bucket: &str, key: &str) -> BackendResult<()>;

    /// List all object keys in `bucket` starting with `prefix`, sorted.
    async fn list_blobs(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<String>>;
}
