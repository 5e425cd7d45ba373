//! Filesystem backends rooted at a local directory.
//!
//! Layout:
//! ```text
//! <root>/documents/<hex(document path)>.json
//! <root>/blobs/<bucket>/<hex(object key)>.obj
//! ```
//!
//! Keys are hex-encoded so that arbitrary object keys (including directory
//! markers ending in `/`) map to safe file names. The hex string is split
//! into components of at most 200 characters, so keys of any
//! length stay under file-name limits; only the last component carries the
//! extension. Writes go to a temporary file first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cachet_types::{validate_segment, BlobMetadata, CollectionPath, PathKey, DELIMITER};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};
use crate::traits::{BlobBackend, DocumentBackend};

/// Longest run of hex characters used as a single path component.
const NAME_CHUNK: usize = 200;

const DOCUMENT_EXT: &str = "json";
const OBJECT_EXT: &str = "obj";

/// Path of the file holding `key` below `base`.
fn encoded_path(base: &Path, key: &str, ext: &str) -> PathBuf {
    let encoded = hex::encode(key.as_bytes());
    let leaf_start = encoded.len().saturating_sub(1) / NAME_CHUNK * NAME_CHUNK;
    let mut path = base.to_path_buf();
    for start in (0..leaf_start).step_by(NAME_CHUNK) {
        path.push(&encoded[start..start + NAME_CHUNK]);
    }
    path.push(format!("{}.{ext}", &encoded[leaf_start..]));
    path
}

fn decode_name(name: &str) -> Option<String> {
    let bytes = hex::decode(name).ok()?;
    String::from_utf8(bytes).ok()
}

/// Write `data` to `path` atomically (temp file + rename).
async fn write_atomic(path: &Path, data: &[u8]) -> BackendResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!("tmp-{}", Uuid::now_v7().simple()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Every key stored below `base` with extension `ext`, sorted.
///
/// A missing `base` lists as empty. Temporary files are skipped.
async fn stored_keys(base: &Path, ext: &str) -> BackendResult<Vec<String>> {
    let suffix = format!(".{ext}");
    let mut keys = Vec::new();
    let mut pending = vec![(base.to_path_buf(), String::new())];
    while let Some((dir, encoded_prefix)) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), format!("{encoded_prefix}{name}")));
            } else if let Some(stem) = name.strip_suffix(&suffix) {
                if let Some(key) = decode_name(&format!("{encoded_prefix}{stem}")) {
                    keys.push(key);
                }
            }
        }
    }
    keys.sort();
    Ok(keys)
}

/// [`DocumentBackend`] storing each document as a JSON file.
#[derive(Clone, Debug)]
pub struct FsDocumentBackend {
    root: PathBuf,
}

impl FsDocumentBackend {
    /// Open (creating if needed) a document store under `root/documents`.
    pub async fn open(root: impl AsRef<Path>) -> BackendResult<Self> {
        let root = root.as_ref().join("documents");
        fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened filesystem document store");
        Ok(Self { root })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        encoded_path(&self.root, key, DOCUMENT_EXT)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentBackend for FsDocumentBackend {
    async fn get_document(&self, key: &PathKey) -> BackendResult<Option<Value>> {
        let data = match fs::read(self.document_path(key.as_str())).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&data)
            .map_err(|e| BackendError::Serialization(format!("{key}: {e}")))?;
        Ok(Some(value))
    }

    async fn put_document(
        &self,
        collection: &CollectionPath,
        id: Option<&str>,
        payload: Value,
    ) -> BackendResult<String> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().simple().to_string());
        let key = PathKey::document(collection, &id)
            .map_err(|e| BackendError::Status { code: 400, message: e.to_string() })?;
        let data = serde_json::to_vec(&payload)
            .map_err(|e| BackendError::Serialization(format!("{key}: {e}")))?;
        write_atomic(&self.document_path(key.as_str()), &data).await?;
        Ok(id)
    }

    async fn delete_document(&self, key: &PathKey) -> BackendResult<()> {
        match fs::remove_file(self.document_path(key.as_str())).await {
            Ok(()) => Ok(()),
            // Deleting an absent document is not an error for document stores.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_documents(&self, collection: &CollectionPath) -> BackendResult<Vec<String>> {
        let prefix = format!("{}{DELIMITER}", collection.as_str());
        Ok(stored_keys(&self.root, DOCUMENT_EXT)
            .await?
            .iter()
            .filter_map(|path| {
                path.strip_prefix(&prefix)
                    .filter(|rest| !rest.contains(DELIMITER))
                    .map(str::to_string)
            })
            .collect())
    }
}

/// [`BlobBackend`] storing each object as a file under its bucket directory.
#[derive(Clone, Debug)]
pub struct FsBlobBackend {
    root: PathBuf,
}

impl FsBlobBackend {
    /// Open (creating if needed) a blob store under `root/blobs`.
    pub async fn open(root: impl AsRef<Path>) -> BackendResult<Self> {
        let root = root.as_ref().join("blobs");
        fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened filesystem blob store");
        Ok(Self { root })
    }

    fn bucket_dir(&self, bucket: &str) -> BackendResult<PathBuf> {
        validate_segment(bucket)
            .map_err(|e| BackendError::Status { code: 400, message: e.to_string() })?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> BackendResult<PathBuf> {
        Ok(encoded_path(&self.bucket_dir(bucket)?, key, OBJECT_EXT))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobBackend for FsBlobBackend {
    async fn get_blob_metadata(&self, bucket: &str, key: &str) -> BackendResult<BlobMetadata> {
        let resource = format!("{bucket}/{key}");
        let meta = fs::metadata(self.object_path(bucket, key)?)
            .await
            .map_err(|e| BackendError::from_io(e, &resource))?;
        let updated = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(BlobMetadata {
            bucket: bucket.to_string(),
            object_key: key.to_string(),
            size: meta.len(),
            updated,
        })
    }

    async fn put_blob(&self, bucket: &str, key: &str, content: Bytes) -> BackendResult<()> {
        write_atomic(&self.object_path(bucket, key)?, &content).await
    }

    async fn delete_blob(&self, bucket: &str, key: &str) -> BackendResult<()> {
        let resource = format!("{bucket}/{key}");
        fs::remove_file(self.object_path(bucket, key)?)
            .await
            .map_err(|e| BackendError::from_io(e, &resource))
    }

    async fn list_blobs(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<String>> {
        Ok(stored_keys(&self.bucket_dir(bucket)?, OBJECT_EXT)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}
