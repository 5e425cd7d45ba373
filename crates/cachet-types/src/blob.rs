use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::path::{PathKey, DELIMITER};

/// An object to be written to the blob store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobObjectDescriptor {
    pub bucket: String,
    pub object_key: String,
    pub content: Bytes,
}

impl BlobObjectDescriptor {
    pub fn new(bucket: impl Into<String>, object_key: impl Into<String>, content: Bytes) -> Self {
        Self {
            bucket: bucket.into(),
            object_key: object_key.into(),
            content,
        }
    }

    /// A zero-length directory marker for `directory`.
    ///
    /// Leading and trailing delimiters are ignored, so `"/a/b/"` and `"a/b"`
    /// both give the marker key `"a/b/"`.
    pub fn directory_marker(bucket: impl Into<String>, directory: &str) -> Self {
        let trimmed = directory.trim_matches(DELIMITER);
        Self::new(bucket, format!("{trimmed}{DELIMITER}"), Bytes::new())
    }

    pub fn path_key(&self) -> Result<PathKey, TypeError> {
        PathKey::blob(&self.bucket, &self.object_key)
    }
}

/// What the blob store reports about a stored object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub bucket: String,
    pub object_key: String,
    pub size: u64,
    pub updated: DateTime<Utc>,
}
