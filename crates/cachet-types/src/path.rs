//! Path keys and collection paths.
//!
//! Documents live at `collection/id`, and nested ("sub-collection") documents
//! at `collection/id/sub/sub-id`. Blobs live at `bucket/object-key`, where the
//! object key may contain further delimiters.
//!
//! Segment rules (what keeps keys collision-free):
//! - Must be non-empty
//! - Must not contain the delimiter `/`
//! - Must not be `.` or `..`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The fixed delimiter joining path segments.
pub const DELIMITER: char = '/';

/// Validate a single path segment (collection name, document id, bucket).
///
/// # Examples
///
/// ```
/// use cachet_types::validate_segment;
///
/// assert!(validate_segment("users").is_ok());
/// assert!(validate_segment("").is_err());
/// assert!(validate_segment("a/b").is_err());
/// ```
pub fn validate_segment(segment: &str) -> Result<(), TypeError> {
    if segment.is_empty() {
        return Err(TypeError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment must not be empty".into(),
        });
    }

    if segment.contains(DELIMITER) {
        return Err(TypeError::InvalidSegment {
            segment: segment.to_string(),
            reason: format!("must not contain the delimiter {DELIMITER:?}"),
        });
    }

    if segment == "." || segment == ".." {
        return Err(TypeError::InvalidSegment {
            segment: segment.to_string(),
            reason: "must not be a relative path component".into(),
        });
    }

    Ok(())
}

/// Validate a blob object key.
///
/// Object keys may contain delimiters (emulated directories) and may end with
/// one (directory markers), but must not be empty or start with one.
fn validate_object_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(TypeError::InvalidObjectKey {
            key: key.to_string(),
            reason: "object key must not be empty".into(),
        });
    }
    if key.starts_with(DELIMITER) {
        return Err(TypeError::InvalidObjectKey {
            key: key.to_string(),
            reason: format!("must not start with {DELIMITER:?}"),
        });
    }
    Ok(())
}

/// Address of a document collection.
///
/// A root collection is a single segment (`users`); a sub-collection is
/// anchored on a parent document (`users/alice/orders`). A collection path
/// therefore always has an odd number of segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: &str) -> Result<Self, TypeError> {
        validate_segment(name)?;
        Ok(Self(name.to_string()))
    }

    /// A sub-collection named `name` under the document `parent`.
    pub fn child(parent: &PathKey, name: &str) -> Result<Self, TypeError> {
        validate_segment(name)?;
        Ok(Self(format!("{}{DELIMITER}{name}", parent.as_str())))
    }

    /// Parse a full collection path such as `users/alice/orders`.
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        let segments: Vec<&str> = path.split(DELIMITER).collect();
        if segments.len() % 2 == 0 {
            return Err(TypeError::InvalidPath {
                path: path.to_string(),
                reason: "a collection path must have an odd number of segments".into(),
            });
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(path.to_string()))
    }

    /// The collection's own name (last segment).
    pub fn name(&self) -> &str {
        self.0.rsplit(DELIMITER).next().unwrap_or(&self.0)
    }

    /// The document this collection hangs off, if it is a sub-collection.
    pub fn parent(&self) -> Option<PathKey> {
        self.0
            .rsplit_once(DELIMITER)
            .map(|(parent, _)| PathKey(parent.to_string()))
    }

    /// Key of the document `id` in this collection.
    pub fn document(&self, id: &str) -> Result<PathKey, TypeError> {
        PathKey::document(self, id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionPath({})", self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic address of a single document or blob.
///
/// Two values with equal `PathKey` denote the same logical entity. Keys are
/// only constructed through the validating constructors, so the original
/// (collection, id) or (bucket, key) pair can always be recovered.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey(String);

impl PathKey {
    /// Key of document `id` in `collection`.
    pub fn document(collection: &CollectionPath, id: &str) -> Result<Self, TypeError> {
        validate_segment(id)?;
        Ok(Self(format!("{}{DELIMITER}{id}", collection.as_str())))
    }

    /// Parse a full document path such as `users/alice`.
    pub fn parse_document(path: &str) -> Result<Self, TypeError> {
        let (collection, id) = path.rsplit_once(DELIMITER).ok_or_else(|| TypeError::InvalidPath {
            path: path.to_string(),
            reason: "a document path needs a collection and an id".into(),
        })?;
        let collection = CollectionPath::parse(collection)?;
        Self::document(&collection, id)
    }

    /// Key of object `object_key` in `bucket`.
    pub fn blob(bucket: &str, object_key: &str) -> Result<Self, TypeError> {
        validate_segment(bucket)?;
        validate_object_key(object_key)?;
        Ok(Self(format!("{bucket}{DELIMITER}{object_key}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment: a document id, or the last component of an object key.
    pub fn id(&self) -> &str {
        let trimmed = self.0.strip_suffix(DELIMITER).unwrap_or(&self.0);
        trimmed.rsplit(DELIMITER).next().unwrap_or(trimmed)
    }

    /// For document keys, the collection that holds the document.
    pub fn collection(&self) -> Option<CollectionPath> {
        self.0
            .rsplit_once(DELIMITER)
            .map(|(collection, _)| CollectionPath(collection.to_string()))
    }

    /// Returns `true` if this key lies at or below `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({})", self.0)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
