use std::fmt::Display;
use std::sync::Arc;

use cachet_backend::{BackendError, DocumentBackend};
use cachet_cache::ExistenceCache;
use cachet_types::{CollectionPath, DocumentDescriptor, PathKey, DELIMITER};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DocError, DocResult};

/// Log a backend failure with its context and wrap it.
fn backend_error(operation: &'static str, key: impl Display, source: BackendError) -> DocError {
    let key = key.to_string();
    tracing::error!(
        operation,
        key = %key,
        status = ?source.status(),
        error = %source,
        "document backend call failed"
    );
    DocError::Backend {
        operation,
        key,
        source,
    }
}

/// Cache-coherent CRUD over a [`DocumentBackend`].
///
/// The cache is written only after a backend call has completed, so dropping
/// an operation's future mid-flight (a timeout, a `select!`) never leaves a
/// partial state behind.
///
/// A cached negative answer is not re-verified: if another process creates a
/// document after this one observed it missing, [`exists`](Self::exists)
/// keeps reporting `false` until a write through this repository touches the
/// key or [`evict`](Self::evict) is called.
pub struct DocumentRepository {
    backend: Arc<dyn DocumentBackend>,
    cache: Arc<ExistenceCache>,
}

impl DocumentRepository {
    /// A repository with its own, empty cache.
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_cache(backend, Arc::new(ExistenceCache::new()))
    }

    pub fn with_cache(backend: Arc<dyn DocumentBackend>, cache: Arc<ExistenceCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    // ---- Existence ----

    /// Does the document at `key` exist?
    ///
    /// Answered from the cache when possible. On a miss the backend is asked
    /// once and the answer, positive or negative, is recorded.
    pub async fn exists(&self, key: &PathKey) -> DocResult<bool> {
        if let Some(state) = self.cache.lookup(key) {
            return Ok(state.exists);
        }
        let snapshot = self.observe(key, "check").await?;
        Ok(snapshot.is_some())
    }

    /// Fetch `key` from the backend and record what was seen.
    async fn observe(&self, key: &PathKey, operation: &'static str) -> DocResult<Option<Value>> {
        let snapshot = self
            .backend
            .get_document(key)
            .await
            .map_err(|e| backend_error(operation, key, e))?;
        self.cache.record(key, snapshot.is_some(), snapshot.clone());
        Ok(snapshot)
    }

    /// Drop any cached state for `key`, ending its staleness window.
    ///
    /// Returns `true` if an entry was present.
    pub fn evict(&self, key: &PathKey) -> bool {
        self.cache.evict(key).is_some()
    }

    /// Drop cached state for every document in `collection`, including the
    /// documents of nested sub-collections. Returns how many entries went.
    pub fn evict_collection(&self, collection: &CollectionPath) -> usize {
        let evicted = self.cache.evict_prefix(&format!("{}{DELIMITER}", collection.as_str()));
        tracing::debug!(collection = %collection, evicted, "collection evicted from cache");
        evicted
    }

    // ---- Writes ----

    /// Create the document if it does not exist.
    ///
    /// Without a unique key the backend assigns one and the insert always
    /// succeeds. Returns `false`, without writing, if the key already exists.
    pub async fn insert<T: Serialize + Sync>(&self, doc: &DocumentDescriptor<T>) -> DocResult<bool> {
        let Some(key) = doc.path_key() else {
            self.add(doc).await?;
            return Ok(true);
        };
        let payload = doc.to_value()?;

        if self.exists(&key).await? {
            tracing::info!(collection = %doc.collection(), key = %key, "insert declined: document already exists");
            return Ok(false);
        }

        self.put(&key, doc.collection(), payload, "insert").await?;
        tracing::info!(collection = %doc.collection(), key = %key, "document created");
        Ok(true)
    }

    /// Write the document under a backend-assigned id and return its key.
    ///
    /// Any unique key on the descriptor is ignored.
    pub async fn add<T: Serialize + Sync>(&self, doc: &DocumentDescriptor<T>) -> DocResult<PathKey> {
        let payload = doc.to_value()?;
        let id = self
            .backend
            .put_document(doc.collection(), None, payload.clone())
            .await
            .map_err(|e| backend_error("add", doc.collection(), e))?;
        let key = PathKey::document(doc.collection(), &id)?;
        self.cache.record(&key, true, Some(payload));
        tracing::info!(collection = %doc.collection(), key = %key, "document created with assigned id");
        Ok(key)
    }

    /// Replace the document if it exists.
    ///
    /// Returns `false`, without writing, if it does not.
    pub async fn update<T: Serialize + Sync>(&self, doc: &DocumentDescriptor<T>) -> DocResult<bool> {
        let key = doc.path_key().ok_or_else(|| DocError::MissingUniqueKey {
            collection: doc.collection().to_string(),
        })?;
        let payload = doc.to_value()?;

        if !self.exists(&key).await? {
            tracing::info!(collection = %doc.collection(), key = %key, "update declined: document does not exist");
            return Ok(false);
        }

        self.put(&key, doc.collection(), payload, "update").await?;
        tracing::info!(collection = %doc.collection(), key = %key, "document updated");
        Ok(true)
    }

    /// Full overwrite of an existing key, then record the new snapshot.
    async fn put(
        &self,
        key: &PathKey,
        collection: &CollectionPath,
        payload: Value,
        operation: &'static str,
    ) -> DocResult<()> {
        self.backend
            .put_document(collection, Some(key.id()), payload.clone())
            .await
            .map_err(|e| backend_error(operation, key, e))?;
        self.cache.record(key, true, Some(payload));
        Ok(())
    }

    /// Remove the document at `key` if it exists.
    ///
    /// On success the key is cached as absent, so a following
    /// [`exists`](Self::exists) answers without a round trip.
    pub async fn delete(&self, key: &PathKey) -> DocResult<bool> {
        if !self.exists(key).await? {
            tracing::info!(key = %key, "delete declined: document does not exist");
            return Ok(false);
        }

        self.backend
            .delete_document(key)
            .await
            .map_err(|e| backend_error("delete", key, e))?;
        self.cache.record(key, false, None);
        tracing::info!(key = %key, "document deleted");
        Ok(true)
    }

    /// Remove the document a descriptor points at.
    pub async fn delete_document<T: Serialize + Sync>(&self, doc: &DocumentDescriptor<T>) -> DocResult<bool> {
        let key = doc.path_key().ok_or_else(|| DocError::MissingUniqueKey {
            collection: doc.collection().to_string(),
        })?;
        self.delete(&key).await
    }

    /// Write `sub` into a sub-collection of the existing document `parent`.
    ///
    /// The sub-collection is named after `sub`'s collection. With a unique
    /// key, `sub` lands at `<parent>/<sub collection>/<sub key>` (overwriting
    /// any document there); otherwise the backend assigns an id. The parent's
    /// cached snapshot is refreshed afterwards.
    ///
    /// Fails with [`DocError::ParentNotFound`] before any write when the
    /// parent does not exist.
    pub async fn insert_with_subcollection<P, S>(
        &self,
        parent: &DocumentDescriptor<P>,
        sub: &DocumentDescriptor<S>,
    ) -> DocResult<bool>
    where
        P: Serialize + Sync,
        S: Serialize + Sync,
    {
        let parent_key = parent.path_key().ok_or_else(|| DocError::MissingUniqueKey {
            collection: parent.collection().to_string(),
        })?;
        let sub_collection = CollectionPath::child(&parent_key, sub.collection().as_str())?;
        let payload = sub.to_value()?;

        if !self.exists(&parent_key).await? {
            return Err(DocError::ParentNotFound {
                key: parent_key.to_string(),
            });
        }

        let id = self
            .backend
            .put_document(&sub_collection, sub.unique_key(), payload.clone())
            .await
            .map_err(|e| backend_error("insert into sub-collection", &sub_collection, e))?;
        let sub_key = PathKey::document(&sub_collection, &id)?;
        self.cache.record(&sub_key, true, Some(payload));
        tracing::info!(sub_collection = %sub_collection, key = %sub_key, "document created in sub-collection");

        // The sub write has committed; report it even if the refresh fails.
        if let Err(e) = self.observe(&parent_key, "refresh").await {
            tracing::warn!(key = %parent_key, error = %e, "parent refresh failed; evicting cached parent");
            self.cache.evict(&parent_key);
        }
        Ok(true)
    }

    // ---- Reads ----

    /// Read and deserialize document `id` of `collection`.
    ///
    /// Returns `Ok(None)` if it does not exist.
    pub async fn read<T: DeserializeOwned>(&self, collection: &CollectionPath, id: &str) -> DocResult<Option<T>> {
        let key = PathKey::document(collection, id)?;
        self.read_key(&key).await
    }

    /// Read and deserialize the document at `key`.
    ///
    /// A cached negative answers without I/O. Otherwise the document is
    /// fetched once and the observed state recorded; a document deleted
    /// elsewhere since it was cached comes back as `None`.
    pub async fn read_key<T: DeserializeOwned>(&self, key: &PathKey) -> DocResult<Option<T>> {
        if let Some(state) = self.cache.lookup(key) {
            if !state.exists {
                return Ok(None);
            }
        }

        // One fetch serves both the existence check and the payload.
        let Some(snapshot) = self.observe(key, "read").await? else {
            tracing::debug!(key = %key, "document not found on read");
            return Ok(None);
        };
        serde_json::from_value(snapshot)
            .map(Some)
            .map_err(|source| DocError::Deserialization {
                key: key.to_string(),
                source,
            })
    }

    /// Keys of the documents directly inside `collection`.
    ///
    /// Always asks the backend; the cache is neither consulted nor updated.
    pub async fn list(&self, collection: &CollectionPath) -> DocResult<Vec<PathKey>> {
        let ids = self
            .backend
            .list_documents(collection)
            .await
            .map_err(|e| backend_error("list", collection, e))?;
        ids.iter()
            .map(|id| PathKey::document(collection, id).map_err(DocError::from))
            .collect()
    }
}

impl std::fmt::Debug for DocumentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("cached_keys", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_backend::{BackendOp, Fault, InMemoryDocumentBackend};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        code: String,
        name: String,
        qty: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        total: u32,
    }

    fn items() -> CollectionPath {
        CollectionPath::root("items").unwrap()
    }

    fn item(code: &str, qty: u32) -> DocumentDescriptor<Item> {
        let payload = Item {
            code: code.into(),
            name: format!("item {code}"),
            qty,
        };
        DocumentDescriptor::keyed(items(), code, payload).unwrap()
    }

    fn setup() -> (Arc<InMemoryDocumentBackend>, DocumentRepository) {
        let backend = Arc::new(InMemoryDocumentBackend::new());
        let repo = DocumentRepository::new(backend.clone());
        (backend, repo)
    }

    // -----------------------------------------------------------------------
    // Insert
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn insert_then_exists_hits_the_cache() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);

        assert!(repo.insert(&doc).await.unwrap());
        assert!(repo.exists(&doc.path_key().unwrap()).await.unwrap());

        assert!(backend.calls(BackendOp::GetDocument) <= 1);
        assert_eq!(backend.calls(BackendOp::PutDocument), 1);
    }

    #[tokio::test]
    async fn double_insert_writes_once() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);

        assert!(repo.insert(&doc).await.unwrap());
        assert!(!repo.insert(&doc).await.unwrap());
        assert_eq!(backend.calls(BackendOp::PutDocument), 1);
    }

    #[tokio::test]
    async fn insert_declines_when_backend_already_has_the_key() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);
        backend.seed(&doc.path_key().unwrap(), json!({"code": "A1"}));

        assert!(!repo.insert(&doc).await.unwrap());
        assert_eq!(backend.calls(BackendOp::PutDocument), 0);
    }

    #[tokio::test]
    async fn insert_without_key_always_succeeds() {
        let (backend, repo) = setup();
        let doc = DocumentDescriptor::auto(items(), json!({"name": "anonymous"}));

        assert!(repo.insert(&doc).await.unwrap());
        assert!(repo.insert(&doc).await.unwrap());
        assert_eq!(backend.len(), 2);
        assert_eq!(backend.calls(BackendOp::GetDocument), 0);
        assert_eq!(repo.cache().len(), 2);
    }

    #[tokio::test]
    async fn add_returns_the_assigned_key() {
        let (backend, repo) = setup();
        let doc = DocumentDescriptor::auto(items(), json!({"name": "anonymous"}));

        let key = repo.add(&doc).await.unwrap();
        assert_eq!(key.collection().unwrap(), items());
        assert_eq!(backend.stored(&key), Some(json!({"name": "anonymous"})));
        assert!(repo.exists(&key).await.unwrap());
        assert_eq!(backend.calls(BackendOp::GetDocument), 0);
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_missing_document_never_writes() {
        let (backend, repo) = setup();
        assert!(!repo.update(&item("A1", 3)).await.unwrap());
        assert_eq!(backend.calls(BackendOp::PutDocument), 0);
    }

    #[tokio::test]
    async fn update_existing_document_overwrites_and_caches_snapshot() {
        let (backend, repo) = setup();
        repo.insert(&item("A1", 3)).await.unwrap();

        assert!(repo.update(&item("A1", 9)).await.unwrap());
        let key = item("A1", 9).path_key().unwrap();
        assert_eq!(backend.stored(&key).unwrap()["qty"], 9);

        let state = repo.cache().lookup(&key).unwrap();
        assert_eq!(state.snapshot.unwrap()["qty"], 9);
    }

    #[tokio::test]
    async fn update_requires_a_unique_key() {
        let (backend, repo) = setup();
        let doc = DocumentDescriptor::auto(items(), json!({}));
        let err = repo.update(&doc).await.unwrap_err();
        assert!(matches!(err, DocError::MissingUniqueKey { .. }));
        assert!(err.is_precondition_failed());
        assert_eq!(backend.total_calls(), 0);
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_missing_document_returns_false() {
        let (backend, repo) = setup();
        let key = items().document("ghost").unwrap();
        assert!(!repo.delete(&key).await.unwrap());
        assert_eq!(backend.calls(BackendOp::DeleteDocument), 0);
    }

    #[tokio::test]
    async fn delete_leaves_a_cached_negative() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);
        let key = doc.path_key().unwrap();
        repo.insert(&doc).await.unwrap();

        assert!(repo.delete(&key).await.unwrap());
        assert!(backend.stored(&key).is_none());

        backend.reset_calls();
        assert!(!repo.exists(&key).await.unwrap());
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn delete_by_descriptor() {
        let (_backend, repo) = setup();
        let doc = item("A1", 3);
        repo.insert(&doc).await.unwrap();
        assert!(repo.delete_document(&doc).await.unwrap());
        assert!(!repo.delete_document(&doc).await.unwrap());
    }

    #[tokio::test]
    async fn insert_after_delete_recreates() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);
        repo.insert(&doc).await.unwrap();
        repo.delete_document(&doc).await.unwrap();
        assert!(repo.insert(&doc).await.unwrap());
        assert_eq!(backend.calls(BackendOp::PutDocument), 2);
    }

    // -----------------------------------------------------------------------
    // Staleness
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cached_negative_is_not_reverified() {
        let (backend, repo) = setup();
        let key = items().document("late").unwrap();

        assert!(!repo.exists(&key).await.unwrap());
        // Another process creates the document.
        backend.seed(&key, json!({"code": "late"}));

        assert!(!repo.exists(&key).await.unwrap());
        assert_eq!(backend.calls(BackendOp::GetDocument), 1);

        assert!(repo.evict(&key));
        assert!(repo.exists(&key).await.unwrap());
        assert_eq!(backend.calls(BackendOp::GetDocument), 2);
    }

    #[tokio::test]
    async fn evict_collection_ends_staleness_for_a_subtree() {
        let (backend, repo) = setup();
        let a1 = items().document("A1").unwrap();
        let b2 = items().document("B2").unwrap();
        let other = CollectionPath::root("users").unwrap().document("u1").unwrap();
        for key in [&a1, &b2, &other] {
            assert!(!repo.exists(key).await.unwrap());
        }
        backend.seed(&a1, json!({"code": "A1"}));

        assert_eq!(repo.evict_collection(&items()), 2);
        assert!(repo.cache().lookup(&other).is_some());
        assert!(repo.exists(&a1).await.unwrap());
    }

    #[tokio::test]
    async fn write_through_repository_supersedes_stale_negative() {
        let (_backend, repo) = setup();
        let doc = item("A1", 1);
        let key = doc.path_key().unwrap();
        assert!(!repo.exists(&key).await.unwrap());

        assert!(repo.insert(&doc).await.unwrap());
        assert!(repo.exists(&key).await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Sub-collections
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sub_collection_insert_requires_parent() {
        let (backend, repo) = setup();
        let parent = item("A1", 3);
        let orders = CollectionPath::root("orders").unwrap();
        let sub = DocumentDescriptor::keyed(orders, "o-1", Order { total: 10 }).unwrap();

        let err = repo.insert_with_subcollection(&parent, &sub).await.unwrap_err();
        assert!(matches!(err, DocError::ParentNotFound { .. }));
        assert!(err.is_precondition_failed());
        assert_eq!(backend.calls(BackendOp::PutDocument), 0);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn sub_collection_insert_writes_under_parent() {
        let (backend, repo) = setup();
        let parent = item("A1", 3);
        repo.insert(&parent).await.unwrap();

        let orders = CollectionPath::root("orders").unwrap();
        let sub = DocumentDescriptor::keyed(orders, "o-1", Order { total: 10 }).unwrap();
        assert!(repo.insert_with_subcollection(&parent, &sub).await.unwrap());

        let sub_key = PathKey::parse_document("items/A1/orders/o-1").unwrap();
        assert_eq!(backend.stored(&sub_key), Some(json!({"total": 10})));
        assert!(repo.exists(&sub_key).await.unwrap());

        let read: Option<Order> = repo.read_key(&sub_key).await.unwrap();
        assert_eq!(read, Some(Order { total: 10 }));
    }

    #[tokio::test]
    async fn sub_collection_insert_refreshes_parent_snapshot() {
        let (backend, repo) = setup();
        let parent = item("A1", 3);
        let parent_key = parent.path_key().unwrap();
        repo.insert(&parent).await.unwrap();
        let before = repo.cache().lookup(&parent_key).unwrap().observed_at;

        // The stored parent changes behind the cache's back.
        backend.seed(&parent_key, json!({"code": "A1", "name": "renamed", "qty": 3}));

        let orders = CollectionPath::root("orders").unwrap();
        let sub = DocumentDescriptor::auto(orders, Order { total: 5 });
        repo.insert_with_subcollection(&parent, &sub).await.unwrap();

        let state = repo.cache().lookup(&parent_key).unwrap();
        assert!(state.observed_at > before);
        assert_eq!(state.snapshot.unwrap()["name"], "renamed");

        let sub_collection = CollectionPath::parse("items/A1/orders").unwrap();
        assert_eq!(repo.list(&sub_collection).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_parent_refresh_still_reports_the_committed_write() {
        let (backend, repo) = setup();
        let parent = item("A1", 3);
        let parent_key = parent.path_key().unwrap();
        repo.insert(&parent).await.unwrap();
        backend.reset_calls();
        backend.set_fault(BackendOp::GetDocument, Some(Fault::Status(503)));

        let orders = CollectionPath::root("orders").unwrap();
        let sub = DocumentDescriptor::auto(orders, Order { total: 7 });
        assert!(repo.insert_with_subcollection(&parent, &sub).await.unwrap());

        assert_eq!(backend.calls(BackendOp::PutDocument), 1);
        assert!(repo.cache().lookup(&parent_key).is_none());
        let sub_collection = CollectionPath::parse("items/A1/orders").unwrap();
        assert_eq!(repo.list(&sub_collection).await.unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cold_read_fetches_once() {
        let (backend, repo) = setup();
        let key = items().document("A1").unwrap();
        backend.seed(&key, json!({"code": "A1", "name": "item A1", "qty": 2}));

        let read: Option<Item> = repo.read_key(&key).await.unwrap();
        assert_eq!(read.map(|i| i.qty), Some(2));
        assert_eq!(backend.calls(BackendOp::GetDocument), 1);
        assert!(repo.cache().lookup(&key).unwrap().exists);

        // A cached negative answers without I/O.
        let ghost = items().document("ghost").unwrap();
        assert!(!repo.exists(&ghost).await.unwrap());
        let read: Option<Item> = repo.read_key(&ghost).await.unwrap();
        assert!(read.is_none());
        assert_eq!(backend.calls(BackendOp::GetDocument), 2);
    }

    #[tokio::test]
    async fn insert_then_read_round_trips() {
        let (_backend, repo) = setup();
        let doc = item("A1", 3);
        repo.insert(&doc).await.unwrap();

        let read: Option<Item> = repo.read(&items(), "A1").await.unwrap();
        assert_eq!(read.as_ref(), Some(doc.payload()));
    }

    #[tokio::test]
    async fn read_missing_document_is_none() {
        let (backend, repo) = setup();
        let read: Option<Item> = repo.read(&items(), "ghost").await.unwrap();
        assert!(read.is_none());
        assert_eq!(backend.calls(BackendOp::GetDocument), 1);
    }

    #[tokio::test]
    async fn read_with_incompatible_shape_fails() {
        let (_backend, repo) = setup();
        repo.insert(&item("A1", 3)).await.unwrap();

        let err = repo.read::<Order>(&items(), "A1").await.unwrap_err();
        assert!(matches!(err, DocError::Deserialization { .. }));
    }

    #[tokio::test]
    async fn read_of_document_removed_elsewhere_records_negative() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);
        let key = doc.path_key().unwrap();
        repo.insert(&doc).await.unwrap();
        backend.unseed(&key);

        let read: Option<Item> = repo.read_key(&key).await.unwrap();
        assert!(read.is_none());
        assert!(!repo.cache().lookup(&key).unwrap().exists);
    }

    #[tokio::test]
    async fn list_returns_keys_in_collection() {
        let (_backend, repo) = setup();
        repo.insert(&item("A1", 1)).await.unwrap();
        repo.insert(&item("B2", 2)).await.unwrap();
        let keys = repo.list(&items()).await.unwrap();
        let ids: Vec<&str> = keys.iter().map(|k| k.id()).collect();
        assert_eq!(ids, vec!["A1", "B2"]);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn backend_failure_is_wrapped_and_not_cached() {
        let (backend, repo) = setup();
        backend.set_fault(BackendOp::GetDocument, Some(Fault::Status(500)));
        let key = items().document("A1").unwrap();

        let err = repo.exists(&key).await.unwrap_err();
        assert!(matches!(err, DocError::Backend { operation: "check", .. }));
        assert_eq!(err.backend_status(), Some(500));
        assert!(repo.cache().lookup(&key).is_none());
    }

    #[tokio::test]
    async fn failed_put_leaves_cache_negative() {
        let (backend, repo) = setup();
        backend.set_fault(BackendOp::PutDocument, Some(Fault::Unavailable));
        let doc = item("A1", 3);
        let key = doc.path_key().unwrap();

        assert!(repo.insert(&doc).await.is_err());
        assert!(!repo.cache().lookup(&key).unwrap().exists);

        // A retry observes the (correct) negative and writes.
        backend.set_fault(BackendOp::PutDocument, None);
        assert!(repo.insert(&doc).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_insert_does_not_touch_the_cache() {
        let (backend, repo) = setup();
        let doc = item("A1", 3);
        let key = doc.path_key().unwrap();
        backend.set_latency(Some(Duration::from_millis(500)));

        let result = tokio::time::timeout(Duration::from_millis(20), repo.insert(&doc)).await;
        assert!(result.is_err());
        assert!(repo.cache().lookup(&key).is_none());
        assert!(backend.stored(&key).is_none());
    }
}
