use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use cachet_backend::BlobBackend;
use cachet_cache::ExistenceCache;
use cachet_types::{validate_segment, BlobObjectDescriptor, PathKey, DELIMITER};

use crate::error::{StorageError, StorageResult};

/// Existence-cached access to a flat [`BlobBackend`].
///
/// Follows the same staleness contract as the document repository: an
/// observed state is kept until a write through this repository supersedes
/// it or it is evicted. Failed or cancelled backend calls never touch the
/// cache.
pub struct BlobRepository {
    backend: Arc<dyn BlobBackend>,
    cache: Arc<ExistenceCache>,
}

impl BlobRepository {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self::with_cache(backend, Arc::new(ExistenceCache::new()))
    }

    pub fn with_cache(backend: Arc<dyn BlobBackend>, cache: Arc<ExistenceCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn BlobBackend> {
        &self.backend
    }

    /// Does `bucket/key` exist?
    ///
    /// A "not found" answer from the backend is `Ok(false)`. Any other
    /// backend failure is logged and returned as [`StorageError::Backend`];
    /// it is never mistaken for absence.
    pub async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let path = PathKey::blob(bucket, key)?;
        if let Some(state) = self.cache.lookup(&path) {
            return Ok(state.exists);
        }

        let exists = match self.backend.get_blob_metadata(bucket, key).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(StorageError::backend("check", bucket, key, e)),
        };
        self.cache.record(&path, exists, None);
        Ok(exists)
    }

    /// Upload the local file at `local_path` to `bucket/key`.
    ///
    /// Fails with [`StorageError::FileNotFound`] before any network call when
    /// the file does not exist. Overwrites an existing object. Not retried.
    pub async fn upload(&self, bucket: &str, key: &str, local_path: impl AsRef<Path>) -> StorageResult<()> {
        let local_path = local_path.as_ref();
        let path = PathKey::blob(bucket, key)?;

        let is_file = match tokio::fs::metadata(local_path).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(source) => {
                return Err(StorageError::LocalIo {
                    path: local_path.to_path_buf(),
                    source,
                })
            }
        };
        if !is_file {
            return Err(StorageError::FileNotFound {
                path: local_path.to_path_buf(),
            });
        }
        let content = tokio::fs::read(local_path)
            .await
            .map_err(|source| StorageError::LocalIo {
                path: local_path.to_path_buf(),
                source,
            })?;

        self.put(&path, bucket, key, Bytes::from(content), "upload").await?;
        tracing::info!(file = %local_path.display(), bucket, key, "file uploaded");
        Ok(())
    }

    /// Upload in-memory content to `bucket/key`.
    pub async fn upload_bytes(&self, bucket: &str, key: &str, content: Bytes) -> StorageResult<()> {
        let path = PathKey::blob(bucket, key)?;
        let size = content.len();
        self.put(&path, bucket, key, content, "upload").await?;
        tracing::info!(bucket, key, size, "object uploaded");
        Ok(())
    }

    /// Upload a prepared object.
    pub async fn upload_object(&self, object: &BlobObjectDescriptor) -> StorageResult<()> {
        self.upload_bytes(&object.bucket, &object.object_key, object.content.clone())
            .await
    }

    async fn put(
        &self,
        path: &PathKey,
        bucket: &str,
        key: &str,
        content: Bytes,
        operation: &'static str,
    ) -> StorageResult<()> {
        self.backend
            .put_blob(bucket, key, content)
            .await
            .map_err(|e| StorageError::backend(operation, bucket, key, e))?;
        self.cache.record(path, true, None);
        Ok(())
    }

    /// Delete `bucket/key`.
    ///
    /// Fails with [`StorageError::TargetAbsent`] when the object does not
    /// exist.
    pub async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if !self.exists(bucket, key).await? {
            return Err(StorageError::TargetAbsent {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        self.backend
            .delete_blob(bucket, key)
            .await
            .map_err(|e| StorageError::backend("delete", bucket, key, e))?;
        self.cache.record(&PathKey::blob(bucket, key)?, false, None);
        tracing::info!(bucket, key, "object deleted");
        Ok(())
    }

    /// Keys in `bucket` starting with `prefix`, sorted. Not cached.
    pub async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.backend
            .list_blobs(bucket, prefix)
            .await
            .map_err(|e| StorageError::backend("list", bucket, prefix, e))
    }

    /// Drop any cached state for `bucket/key`.
    pub fn evict(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.cache.evict(&PathKey::blob(bucket, key)?).is_some())
    }

    /// Drop cached state for every object in `bucket` whose key starts with
    /// `prefix`. Returns how many entries went.
    pub fn evict_prefix(&self, bucket: &str, prefix: &str) -> StorageResult<usize> {
        validate_segment(bucket)?;
        let evicted = self.cache.evict_prefix(&format!("{bucket}{DELIMITER}{prefix}"));
        tracing::debug!(bucket, prefix, evicted, "objects evicted from cache");
        Ok(evicted)
    }
}

impl std::fmt::Debug for BlobRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRepository")
            .field("cached_keys", &self.cache.len())
            .finish()
    }
}
