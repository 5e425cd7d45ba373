//! Cache types

use cachet_types::PathKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The last state of a path observed by this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    pub key: PathKey,
    pub exists: bool,
    /// Last known payload. Always `None` for negative entries and for blobs.
    pub snapshot: Option<Value>,
    /// Logical tick at which the state was recorded; strictly increasing per cache.
    pub observed_at: u64,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub positive: usize,
    pub hits: u64,
    pub misses: u64,
}
