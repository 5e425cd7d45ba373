//! Backend capability for cachet.
//!
//! The document database and blob store are reached only through the two
//! narrow traits defined here. Everything above this crate (cache,
//! repositories, directory emulation) is written against the traits, so the
//! real services can be swapped for the in-memory or filesystem backends.
//!
//! # Backends
//!
//! - [`InMemoryDocumentBackend`] / [`InMemoryBlobBackend`] -- `BTreeMap`-based,
//!   with per-operation call counters and fault injection for tests
//! - [`FsDocumentBackend`] / [`FsBlobBackend`] -- a directory on local disk
//!
//! # Contract
//!
//! 1. A "not found" answer is always distinguishable from every other failure.
//! 2. Backends never cache; every call reaches the underlying store.
//! 3. No retries are performed at this layer.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{BackendError, BackendResult};
pub use fs::{FsBlobBackend, FsDocumentBackend};
pub use memory::{BackendOp, Fault, InMemoryBlobBackend, InMemoryDocumentBackend};
pub use traits::{BlobBackend, DocumentBackend};
