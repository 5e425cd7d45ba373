//! Directory emulation over a flat blob store.
//!
//! A directory `a/b` exists exactly when the zero-length marker object
//! `a/b/` exists. Everything else here is a pure function of key strings.
//!
//! Path rules:
//! - Leading and trailing `/` are ignored (`"/a/b/"` is `"a/b"`)
//! - The empty path is the bucket root, which always exists

use std::collections::BTreeMap;
use std::sync::Arc;

use cachet_types::{BlobObjectDescriptor, DELIMITER};

use crate::error::StorageResult;
use crate::repository::BlobRepository;

/// Strip leading and trailing delimiters from a directory path.
pub fn normalize_directory(path: &str) -> &str {
    path.trim_matches(DELIMITER)
}

/// Object key of the marker for directory `path`.
///
/// # Examples
///
/// ```
/// use cachet_blobs::marker_key;
///
/// assert_eq!(marker_key("a/b"), "a/b/");
/// assert_eq!(marker_key("a/b/"), "a/b/");
/// ```
pub fn marker_key(path: &str) -> String {
    format!("{}{DELIMITER}", normalize_directory(path))
}

/// The directory containing `key`, or `None` for top-level keys.
///
/// Works for both objects (`a/b/c.txt` -> `a/b`) and markers (`a/b/` -> `a`).
pub fn parent_directory(key: &str) -> Option<&str> {
    let trimmed = key.strip_suffix(DELIMITER).unwrap_or(key);
    trimmed.rsplit_once(DELIMITER).map(|(parent, _)| parent)
}

/// Key prefix shared by everything under directory `path` (`""` for the root).
fn listing_prefix(path: &str) -> String {
    let normalized = normalize_directory(path);
    if normalized.is_empty() {
        String::new()
    } else {
        marker_key(normalized)
    }
}

/// Whether a directory entry is an object or a sub-directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
}

/// An immediate child of an emulated directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub kind: EntryKind,
    /// Name relative to the listed directory.
    pub name: String,
    /// Full object key (the marker key for directories).
    pub key: String,
}

/// Immediate children of the directory `prefix` among `keys`.
///
/// `prefix` is a marker-style prefix (`"a/b/"`, or `""` for the root). Keys
/// nested deeper collapse into a single sub-directory entry, whether or not
/// that sub-directory has a marker. The directory's own marker is skipped.
/// Directories sort before files, then by name.
pub fn children_of<'a>(prefix: &str, keys: impl IntoIterator<Item = &'a str>) -> Vec<DirEntry> {
    let mut entries: BTreeMap<(EntryKind, String), String> = BTreeMap::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        match rest.split_once(DELIMITER) {
            Some((dir, _)) => {
                entries
                    .entry((EntryKind::Directory, dir.to_string()))
                    .or_insert_with(|| format!("{prefix}{dir}{DELIMITER}"));
            }
            None => {
                entries.insert((EntryKind::File, rest.to_string()), key.to_string());
            }
        }
    }
    entries
        .into_iter()
        .map(|((kind, name), key)| DirEntry { kind, name, key })
        .collect()
}

/// Hierarchical directories within one bucket.
#[derive(Clone, Debug)]
pub struct Directories {
    blobs: Arc<BlobRepository>,
    bucket: String,
}

impl Directories {
    pub fn new(blobs: Arc<BlobRepository>, bucket: impl Into<String>) -> Self {
        Self {
            blobs,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Does the directory `path` exist?
    pub async fn directory_exists(&self, path: &str) -> StorageResult<bool> {
        if normalize_directory(path).is_empty() {
            return Ok(true);
        }
        self.blobs.exists(&self.bucket, &marker_key(path)).await
    }

    /// Create the directory `path` if it does not exist.
    ///
    /// Idempotent: when the marker is already known to exist no backend call
    /// is made. Concurrent creators may both upload the marker; the markers
    /// are identical, so the last write winning is harmless.
    pub async fn create_directory(&self, path: &str) -> StorageResult<()> {
        if self.directory_exists(path).await? {
            return Ok(());
        }
        let marker = BlobObjectDescriptor::directory_marker(self.bucket.as_str(), path);
        self.blobs.upload_object(&marker).await?;
        tracing::info!(bucket = %self.bucket, directory = normalize_directory(path), "directory created");
        Ok(())
    }

    /// Drop cached state for the directory `path` and everything under it.
    pub fn evict_directory(&self, path: &str) -> StorageResult<usize> {
        let prefix = listing_prefix(path);
        self.blobs.evict_prefix(&self.bucket, &prefix)
    }

    /// Immediate children of directory `path`.
    ///
    /// A directory with no objects under it lists as empty.
    pub async fn list_directory(&self, path: &str) -> StorageResult<Vec<DirEntry>> {
        let prefix = listing_prefix(path);
        let keys = self.blobs.list(&self.bucket, &prefix).await?;
        Ok(children_of(&prefix, keys.iter().map(String::as_str)))
    }
}
