use serde::Serialize;
use serde_json::Value;

use crate::error::TypeError;
use crate::path::{CollectionPath, PathKey};

/// A payload together with where it lives in the document store.
///
/// Any serializable type can be stored; the descriptor carries the
/// collection and, optionally, the document's unique key. When the key is
/// absent the backend assigns one at insert time.
///
/// Descriptors are immutable once built.
///
/// # Examples
///
/// ```
/// use cachet_types::{CollectionPath, DocumentDescriptor};
///
/// let items = CollectionPath::root("items").unwrap();
/// let d = DocumentDescriptor::keyed(items, "sku-1", serde_json::json!({"qty": 3})).unwrap();
/// assert_eq!(d.path_key().unwrap().as_str(), "items/sku-1");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentDescriptor<T> {
    collection: CollectionPath,
    unique_key: Option<String>,
    payload: T,
}

impl<T: Serialize> DocumentDescriptor<T> {
    /// A document with a caller-chosen unique key.
    pub fn keyed(collection: CollectionPath, unique_key: &str, payload: T) -> Result<Self, TypeError> {
        // Reject keys that could not form a PathKey up front.
        PathKey::document(&collection, unique_key)?;
        Ok(Self {
            collection,
            unique_key: Some(unique_key.to_string()),
            payload,
        })
    }

    /// A document whose key the backend assigns on insert.
    pub fn auto(collection: CollectionPath, payload: T) -> Self {
        Self {
            collection,
            unique_key: None,
            payload,
        }
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    /// The document's key, or `None` when the backend has yet to assign one.
    pub fn path_key(&self) -> Option<PathKey> {
        self.unique_key
            .as_deref()
            .and_then(|id| PathKey::document(&self.collection, id).ok())
    }

    /// The payload as the JSON value handed to the backend.
    pub fn to_value(&self) -> Result<Value, TypeError> {
        serde_json::to_value(&self.payload).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
