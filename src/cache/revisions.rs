//! Revision cache implementation.

use crate::content::RevisionContent;
use crate::types::{DocumentKey, RevisionNumber};
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters of cache traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub invalidations: u64,
    pub evictions: u64,
}

/// Map from document key to its latest known revision.
///
/// Locks are held only for the map access itself, never across I/O.
pub struct RevisionCache {
    entries: RwLock<LruCache<DocumentKey, Arc<RevisionContent>>>,

    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
    evictions: AtomicU64,
}

impl RevisionCache {
    /// Create a cache keeping every document it is given.
    pub fn unbounded() -> Self {
        Self::with_entries(LruCache::unbounded())
    }

    /// Create a cache keeping at most `capacity` documents.
    ///
    /// On overflow the least recently stored document is dropped.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self::with_entries(LruCache::new(capacity))
    }

    /// Create a cache from an optional capacity (`None` is unbounded).
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    fn with_entries(entries: LruCache<DocumentKey, Arc<RevisionContent>>) -> Self {
        Self {
            entries: RwLock::new(entries),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached revision of `key`, if any.
    ///
    /// Takes the shared lock only; reads do not reorder eviction.
    pub fn get(&self, key: &DocumentKey) -> Option<Arc<RevisionContent>> {
        let content = self.entries.read().peek(key).cloned();
        if content.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "revision cache miss");
        }
        content
    }

    /// Store `content` as the latest revision of `key`, replacing any entry.
    pub fn put(&self, key: DocumentKey, content: Arc<RevisionContent>) {
        let number = content.number();
        let evicted = {
            let mut entries = self.entries.write();
            entries.push(key.clone(), content)
        };
        self.stores.fetch_add(1, Ordering::Relaxed);

        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %evicted_key, "revision cache eviction");
            }
        }
        debug!(key = %key, number = number.0, "revision cache store");
    }

    /// Remove the entry of `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &DocumentKey) -> bool {
        let removed = self.entries.write().pop(key).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "revision cache invalidate");
        }
        removed
    }

    /// Remove the entry of `key` only if it holds revision `number`.
    ///
    /// The check and the removal happen under one exclusive lock, so a newer
    /// revision stored concurrently is never dropped by mistake.
    pub fn invalidate_revision(&self, key: &DocumentKey, number: RevisionNumber) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            match entries.peek(key) {
                Some(content) if content.number() == number => entries.pop(key).is_some(),
                _ => false,
            }
        };
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, number = number.0, "revision cache invalidate");
        }
        removed
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for RevisionCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
