//! In-memory backends for testing and embedding.
//!
//! Both backends keep their data in a `BTreeMap` behind a `RwLock` and count
//! every call per operation, so tests can assert exactly how many round trips
//! a repository made. Faults can be injected per operation to simulate
//! service failures, and an artificial latency lets tests cancel in-flight
//! calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cachet_types::{BlobMetadata, CollectionPath, PathKey, DELIMITER};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};
use crate::traits::{BlobBackend, DocumentBackend};

/// A backend operation, used to address call counters and faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GetDocument,
    PutDocument,
    DeleteDocument,
    ListDocuments,
    GetBlobMetadata,
    PutBlob,
    DeleteBlob,
    ListBlobs,
}

/// A failure to inject into an in-memory backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Answer with a failure status (e.g. 403, 500).
    Status(u16),
    /// Behave as if the service could not be reached.
    Unavailable,
}

impl Fault {
    fn to_error(&self) -> BackendError {
        match self {
            Fault::Status(code) => BackendError::Status {
                code: *code,
                message: format!("injected status {code}"),
            },
            Fault::Unavailable => BackendError::Unavailable("injected outage".into()),
        }
    }
}

/// Call counters, injected faults and latency shared by both backends.
#[derive(Debug, Default)]
struct Instrumentation {
    calls: Mutex<HashMap<BackendOp, usize>>,
    total: AtomicUsize,
    faults: Mutex<HashMap<BackendOp, Fault>>,
    latency: Mutex<Option<Duration>>,
}

impl Instrumentation {
    /// Count the call, wait out any latency, then fail if a fault is armed.
    async fn enter(&self, op: BackendOp) -> BackendResult<()> {
        {
            let mut calls = self.calls.lock().map_err(poisoned)?;
            *calls.entry(op).or_insert(0) += 1;
        }
        self.total.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().map_err(poisoned)?;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        let faults = self.faults.lock().map_err(poisoned)?;
        match faults.get(&op) {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }

    fn calls(&self, op: BackendOp) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
        self.total.store(0, Ordering::SeqCst);
    }

    fn set_fault(&self, op: BackendOp, fault: Option<Fault>) {
        if let Ok(mut faults) = self.faults.lock() {
            match fault {
                Some(fault) => faults.insert(op, fault),
                None => faults.remove(&op),
            };
        }
    }

    fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> BackendError {
    BackendError::Unavailable(format!("lock poisoned: {e}"))
}

fn new_document_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// In-memory [`DocumentBackend`].
///
/// Documents are keyed by their full path. Deleting a document does not
/// touch its sub-collections, matching hierarchical document stores.
#[derive(Debug, Default)]
pub struct InMemoryDocumentBackend {
    documents: RwLock<BTreeMap<String, Value>>,
    instrumentation: Instrumentation,
}

impl InMemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document directly, bypassing counters and faults.
    ///
    /// Simulates a writer outside this process.
    pub fn seed(&self, key: &PathKey, payload: Value) {
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(key.as_str().to_string(), payload);
        }
    }

    /// Remove a document directly, bypassing counters and faults.
    pub fn unseed(&self, key: &PathKey) {
        if let Ok(mut docs) = self.documents.write() {
            docs.remove(key.as_str());
        }
    }

    /// Peek at a stored document without counting a call.
    pub fn stored(&self, key: &PathKey) -> Option<Value> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(key.as_str()).cloned())
    }

    /// Number of stored documents, across all collections.
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of calls made to `op` since creation or the last reset.
    pub fn calls(&self, op: BackendOp) -> usize {
        self.instrumentation.calls(op)
    }

    /// Number of calls made to any operation.
    pub fn total_calls(&self) -> usize {
        self.instrumentation.total()
    }

    pub fn reset_calls(&self) {
        self.instrumentation.reset();
    }

    /// Make every call to `op` fail with `fault` until cleared with `None`.
    pub fn set_fault(&self, op: BackendOp, fault: Option<Fault>) {
        self.instrumentation.set_fault(op, fault);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.instrumentation.set_latency(latency);
    }
}

#[async_trait]
impl DocumentBackend for InMemoryDocumentBackend {
    async fn get_document(&self, key: &PathKey) -> BackendResult<Option<Value>> {
        self.instrumentation.enter(BackendOp::GetDocument).await?;
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.get(key.as_str()).cloned())
    }

    async fn put_document(
        &self,
        collection: &CollectionPath,
        id: Option<&str>,
        payload: Value,
    ) -> BackendResult<String> {
        self.instrumentation.enter(BackendOp::PutDocument).await?;
        let id = id.map(str::to_string).unwrap_or_else(new_document_id);
        let key = PathKey::document(collection, &id)
            .map_err(|e| BackendError::Status { code: 400, message: e.to_string() })?;
        let mut docs = self.documents.write().map_err(poisoned)?;
        docs.insert(key.as_str().to_string(), payload);
        Ok(id)
    }

    async fn delete_document(&self, key: &PathKey) -> BackendResult<()> {
        self.instrumentation.enter(BackendOp::DeleteDocument).await?;
        let mut docs = self.documents.write().map_err(poisoned)?;
        docs.remove(key.as_str());
        Ok(())
    }

    async fn list_documents(&self, collection: &CollectionPath) -> BackendResult<Vec<String>> {
        self.instrumentation.enter(BackendOp::ListDocuments).await?;
        let prefix = format!("{}{DELIMITER}", collection.as_str());
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains(DELIMITER))
            .map(str::to_string)
            .collect())
    }
}

#[derive(Clone, Debug)]
struct StoredBlob {
    content: Bytes,
    updated: DateTime<Utc>,
}

/// In-memory [`BlobBackend`].
#[derive(Debug, Default)]
pub struct InMemoryBlobBackend {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredBlob>>>,
    instrumentation: Instrumentation,
}

impl InMemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an object directly, bypassing counters and faults.
    pub fn seed(&self, bucket: &str, key: &str, content: Bytes) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default().insert(
                key.to_string(),
                StoredBlob {
                    content,
                    updated: Utc::now(),
                },
            );
        }
    }

    /// Peek at an object's content without counting a call.
    pub fn stored(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets.read().ok().and_then(|buckets| {
            buckets
                .get(bucket)
                .and_then(|objects| objects.get(key))
                .map(|blob| blob.content.clone())
        })
    }

    /// Number of objects in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .map(|buckets| buckets.get(bucket).map(BTreeMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn calls(&self, op: BackendOp) -> usize {
        self.instrumentation.calls(op)
    }

    pub fn total_calls(&self) -> usize {
        self.instrumentation.total()
    }

    pub fn reset_calls(&self) {
        self.instrumentation.reset();
    }

    pub fn set_fault(&self, op: BackendOp, fault: Option<Fault>) {
        self.instrumentation.set_fault(op, fault);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.instrumentation.set_latency(latency);
    }
}

#[async_trait]
impl BlobBackend for InMemoryBlobBackend {
    async fn get_blob_metadata(&self, bucket: &str, key: &str) -> BackendResult<BlobMetadata> {
        self.instrumentation.enter(BackendOp::GetBlobMetadata).await?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        let blob = buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| BackendError::not_found(format!("{bucket}/{key}")))?;
        Ok(BlobMetadata {
            bucket: bucket.to_string(),
            object_key: key.to_string(),
            size: blob.content.len() as u64,
            updated: blob.updated,
        })
    }

    async fn put_blob(&self, bucket: &str, key: &str, content: Bytes) -> BackendResult<()> {
        self.instrumentation.enter(BackendOp::PutBlob).await?;
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredBlob {
                content,
                updated: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_blob(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.instrumentation.enter(BackendOp::DeleteBlob).await?;
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        buckets
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(format!("{bucket}/{key}")))
    }

    async fn list_blobs(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<String>> {
        self.instrumentation.enter(BackendOp::ListBlobs).await?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        Ok(buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> CollectionPath {
        CollectionPath::root("users").unwrap()
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get_document() {
        let backend = InMemoryDocumentBackend::new();
        let id = backend
            .put_document(&users(), Some("alice"), json!({"age": 30}))
            .await
            .unwrap();
        assert_eq!(id, "alice");

        let key = users().document("alice").unwrap();
        let doc = backend.get_document(&key).await.unwrap();
        assert_eq!(doc, Some(json!({"age": 30})));
    }

    #[tokio::test]
    async fn get_missing_document_is_none() {
        let backend = InMemoryDocumentBackend::new();
        let key = users().document("ghost").unwrap();
        assert!(backend.get_document(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_without_id_assigns_one() {
        let backend = InMemoryDocumentBackend::new();
        let a = backend.put_document(&users(), None, json!({})).await.unwrap();
        let b = backend.put_document(&users(), None, json!({})).await.unwrap();
        assert!(!a.is_empty());
        assert_ne!(a, b);
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn list_documents_excludes_sub_collections() {
        let backend = InMemoryDocumentBackend::new();
        backend.put_document(&users(), Some("alice"), json!({})).await.unwrap();
        backend.put_document(&users(), Some("bob"), json!({})).await.unwrap();
        let alice = users().document("alice").unwrap();
        let orders = CollectionPath::child(&alice, "orders").unwrap();
        backend.put_document(&orders, Some("o1"), json!({})).await.unwrap();

        let ids = backend.list_documents(&users()).await.unwrap();
        assert_eq!(ids, vec!["alice".to_string(), "bob".to_string()]);
        let ids = backend.list_documents(&orders).await.unwrap();
        assert_eq!(ids, vec!["o1".to_string()]);
    }

    #[tokio::test]
    async fn calls_are_counted_per_operation() {
        let backend = InMemoryDocumentBackend::new();
        let key = users().document("alice").unwrap();
        backend.get_document(&key).await.unwrap();
        backend.get_document(&key).await.unwrap();
        backend.delete_document(&key).await.unwrap();
        assert_eq!(backend.calls(BackendOp::GetDocument), 2);
        assert_eq!(backend.calls(BackendOp::DeleteDocument), 1);
        assert_eq!(backend.calls(BackendOp::PutDocument), 0);
        assert_eq!(backend.total_calls(), 3);

        backend.reset_calls();
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn seeded_documents_bypass_counters() {
        let backend = InMemoryDocumentBackend::new();
        let key = users().document("carol").unwrap();
        backend.seed(&key, json!({"x": 1}));
        assert_eq!(backend.total_calls(), 0);
        assert_eq!(backend.stored(&key), Some(json!({"x": 1})));
        backend.unseed(&key);
        assert!(backend.stored(&key).is_none());
    }

    #[tokio::test]
    async fn injected_fault_fails_only_that_operation() {
        let backend = InMemoryDocumentBackend::new();
        backend.set_fault(BackendOp::GetDocument, Some(Fault::Status(500)));
        let key = users().document("alice").unwrap();

        let err = backend.get_document(&key).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        backend.put_document(&users(), Some("alice"), json!({})).await.unwrap();

        backend.set_fault(BackendOp::GetDocument, None);
        assert!(backend.get_document(&key).await.unwrap().is_some());
    }

    // -----------------------------------------------------------------------
    // Blobs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_stat_blob() {
        let backend = InMemoryBlobBackend::new();
        backend
            .put_blob("media", "a/b.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let meta = backend.get_blob_metadata("media", "a/b.txt").await.unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(meta.object_key, "a/b.txt");
        assert_eq!(backend.stored("media", "a/b.txt").unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let backend = InMemoryBlobBackend::new();
        let err = backend.get_blob_metadata("media", "nope").await.unwrap_err();
        assert!(err.is_not_found());
        let err = backend.delete_blob("media", "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_blobs_filters_by_prefix() {
        let backend = InMemoryBlobBackend::new();
        backend.seed("media", "a/", Bytes::new());
        backend.seed("media", "a/one.txt", Bytes::from_static(b"1"));
        backend.seed("media", "b/two.txt", Bytes::from_static(b"2"));
        let keys = backend.list_blobs("media", "a/").await.unwrap();
        assert_eq!(keys, vec!["a/".to_string(), "a/one.txt".to_string()]);
        assert!(backend.list_blobs("other", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_faults_surface_status() {
        let backend = InMemoryBlobBackend::new();
        backend.set_fault(BackendOp::GetBlobMetadata, Some(Fault::Status(403)));
        let err = backend.get_blob_metadata("media", "x").await.unwrap_err();
        assert_eq!(err.status(), Some(403));

        backend.set_fault(BackendOp::GetBlobMetadata, Some(Fault::Unavailable));
        let err = backend.get_blob_metadata("media", "x").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn latency_delays_calls() {
        let backend = InMemoryBlobBackend::new();
        backend.set_latency(Some(Duration::from_millis(200)));
        let result = tokio::time::timeout(
            Duration::from_millis(10),
            backend.put_blob("media", "slow", Bytes::new()),
        )
        .await;
        assert!(result.is_err());
        assert!(backend.stored("media", "slow").is_none());
    }
}
