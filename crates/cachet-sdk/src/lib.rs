//! High-level SDK for cachet.
//!
//! [`Cachet`] is the main entry point for applications: it owns one document
//! repository and one blob repository, each with its own existence cache,
//! wired to backends chosen from [`CachetSettings`].

pub mod client;
pub mod config;
pub mod error;

pub use client::Cachet;
pub use config::{CachetSettings, SettingsError};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use cachet_blobs::{BlobRepository, DirEntry, Directories, EntryKind, StorageError};
pub use cachet_cache::{CacheStats, ExistenceCache};
pub use cachet_docs::{DocError, DocumentRepository};
pub use cachet_types::{BlobObjectDescriptor, CollectionPath, DocumentDescriptor, PathKey};
