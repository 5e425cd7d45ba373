//! Foundation types for cachet.
//!
//! cachet sits between an application and two remote services: a hierarchical
//! document database and a flat blob store. Every entity on either side is
//! addressed by a [`PathKey`], a delimiter-joined string that is deterministic
//! and collision-free for distinct (collection, id) or (bucket, key) pairs.
//!
//! # Key Types
//!
//! - [`PathKey`]: Address of a single document or blob
//! - [`CollectionPath`]: Address of a (possibly nested) document collection
//! - [`DocumentDescriptor`]: Collection + optional unique key attached to any payload
//! - [`BlobObjectDescriptor`]: Bucket + object key + content bytes
//! - [`BlobMetadata`]: What the blob store reports about a stored object

pub mod blob;
pub mod document;
pub mod error;
pub mod path;

pub use blob::{BlobMetadata, BlobObjectDescriptor};
pub use document::DocumentDescriptor;
pub use error::TypeError;
pub use path::{validate_segment, CollectionPath, PathKey, DELIMITER};
