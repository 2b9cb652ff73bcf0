//! Latest-revision cache.
//!
//! Remembers the most recently seen revision of each document so that a load of
//! the latest revision can skip transferring the content when the store's
//! listing shows nothing newer. The cache is passive: it never calls the store,
//! and the engine decides when to consult, fill or invalidate it.

mod revisions;

pub use revisions::{CacheStats, RevisionCache};
