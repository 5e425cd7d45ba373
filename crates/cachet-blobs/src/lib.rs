//! Blob repository and directory emulation for cachet.
//!
//! The blob store is flat: object keys may contain `/`, but the store gives
//! them no meaning. [`BlobRepository`] adds existence caching and translates
//! backend failures into [`StorageError`], keeping a legitimate "does not
//! exist" answer apart from every other failure. [`Directories`] layers
//! hierarchical directories on top using zero-length marker objects whose
//! keys end in `/`.

pub mod directory;
pub mod error;
pub mod repository;

pub use directory::{
    children_of, marker_key, normalize_directory, parent_directory, DirEntry, Directories,
    EntryKind,
};
pub use error::{StorageError, StorageResult};
pub use repository::BlobRepository;
