//! Document repository for cachet.
//!
//! Every mutating operation checks existence first, through the process-local
//! [`ExistenceCache`](cachet_cache::ExistenceCache), so that:
//!
//! - `insert` is "create if absent",
//! - `update` is "replace if present",
//! - `delete` is "remove if present".
//!
//! These are at-most-once semantics per call, not idempotent retries. A
//! retried insert after a transient failure may observe the key as existing
//! and return `false` even though the first attempt never committed; that
//! ambiguity is surfaced to callers, who own their retry policy.
//!
//! The check and the act are not atomic. Two concurrent inserts of the same
//! fresh key can both observe "absent" and both write.

pub mod error;
pub mod repository;

pub use error::{DocError, DocResult};
pub use repository::DocumentRepository;
