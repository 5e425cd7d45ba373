use std::sync::atomic::{AtomicU64, Ordering};

use cachet_types::PathKey;
use dashmap::DashMap;
use serde_json::Value;

use crate::types::{CacheStats, CachedState};

/// Concurrent path-keyed existence cache.
///
/// Backed by a sharded map, so readers never block one another and no lock
/// is held across an `.await` in callers. `record` and `evict` on the same
/// key are linearizable: the last call to arrive wins, regardless of the
/// logical order of the writes that produced them. Callers needing stronger
/// ordering must sequence their own writes.
///
/// There is no eviction policy beyond [`evict`](Self::evict) and
/// [`clear`](Self::clear); the cache grows with the number of distinct keys
/// observed.
#[derive(Debug, Default)]
pub struct ExistenceCache {
    entries: DashMap<PathKey, CachedState>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed state for `key`, or `None` on a miss. Never does I/O.
    pub fn lookup(&self, key: &PathKey) -> Option<CachedState> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, exists = entry.exists, "existence cache hit");
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "existence cache miss");
                None
            }
        }
    }

    /// Record the observed state of `key`, replacing any prior entry.
    ///
    /// A negative entry never carries a snapshot.
    pub fn record(&self, key: &PathKey, exists: bool, snapshot: Option<Value>) -> CachedState {
        let observed_at = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let state = CachedState {
            key: key.clone(),
            exists,
            snapshot: if exists { snapshot } else { None },
            observed_at,
        };
        self.entries.insert(key.clone(), state.clone());
        state
    }

    /// Remove the entry for `key`; the next lookup is a miss.
    pub fn evict(&self, key: &PathKey) -> Option<CachedState> {
        self.entries.remove(key).map(|(_, state)| state)
    }

    /// Evict every entry whose key starts with `prefix`. Returns how many went.
    pub fn evict_prefix(&self, prefix: &str) -> usize {
        let mut evicted = 0;
        self.entries.retain(|key, _| {
            let keep = !key.starts_with(prefix);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            positive: self.entries.iter().filter(|entry| entry.exists).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
