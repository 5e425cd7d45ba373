use std::sync::Arc;

use cachet_backend::{
    BlobBackend, DocumentBackend, FsBlobBackend, FsDocumentBackend, InMemoryBlobBackend,
    InMemoryDocumentBackend,
};
use cachet_blobs::{BlobRepository, Directories};
use cachet_docs::DocumentRepository;

use crate::config::CachetSettings;
use crate::error::SdkResult;

/// Unified entry point: a document repository and a blob repository.
///
/// Each repository keeps its own existence cache, so a collection and a
/// bucket that share a name never share cache entries.
pub struct Cachet {
    settings: CachetSettings,
    documents: Arc<DocumentRepository>,
    blobs: Arc<BlobRepository>,
}

impl Cachet {
    /// Wire repositories to the given backends.
    pub fn new(
        settings: CachetSettings,
        documents: Arc<dyn DocumentBackend>,
        blobs: Arc<dyn BlobBackend>,
    ) -> Self {
        Self {
            settings,
            documents: Arc::new(DocumentRepository::new(documents)),
            blobs: Arc::new(BlobRepository::new(blobs)),
        }
    }

    /// Backed by in-memory stores; nothing outlives the process.
    pub fn in_memory(settings: CachetSettings) -> Self {
        Self::new(
            settings,
            Arc::new(InMemoryDocumentBackend::new()),
            Arc::new(InMemoryBlobBackend::new()),
        )
    }

    /// Backed by filesystem stores under `settings.data_root`.
    pub async fn open_local(settings: CachetSettings) -> SdkResult<Self> {
        let documents = FsDocumentBackend::open(&settings.data_root).await?;
        let blobs = FsBlobBackend::open(&settings.data_root).await?;
        tracing::info!(root = %settings.data_root.display(), "opened local cachet stores");
        Ok(Self::new(settings, Arc::new(documents), Arc::new(blobs)))
    }

    pub fn settings(&self) -> &CachetSettings {
        &self.settings
    }

    pub fn documents(&self) -> &Arc<DocumentRepository> {
        &self.documents
    }

    pub fn blobs(&self) -> &Arc<BlobRepository> {
        &self.blobs
    }

    /// Directories in the configured storage bucket.
    pub fn directories(&self) -> SdkResult<Directories> {
        let bucket = self.settings.storage_bucket()?;
        Ok(Directories::new(Arc::clone(&self.blobs), bucket))
    }

    /// The configured storage bucket.
    pub fn bucket(&self) -> SdkResult<&str> {
        Ok(self.settings.storage_bucket()?)
    }
}

impl std::fmt::Debug for Cachet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cachet")
            .field("settings", &self.settings)
            .field("documents", &self.documents)
            .field("blobs", &self.blobs)
            .finish()
    }
}
