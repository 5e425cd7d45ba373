//! Process-local existence cache.
//!
//! Answers "does this path exist, and what did it look like" without a
//! round trip once a path has been observed. Entries are never refreshed from
//! the backend: an entry stays authoritative for this process until a write
//! through the same process supersedes it or it is explicitly evicted. Writes
//! made by other processes are invisible until then (the staleness window).

mod cache;
mod types;

pub use cache::ExistenceCache;
pub use types::{CacheStats, CachedState};
