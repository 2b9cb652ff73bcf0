//! In-process revision store.
//!
//! [`MemoryRevisionStore`] is a version-authoritative [`RevisionStore`] kept in
//! memory, for embedding the wiki in a single process and for tests. It follows
//! the store contract exactly:
//!
//! - revision numbers start at 1 and are never reused, even after deletes
//! - a write is accepted only if `expected` is the latest retained number
//!   (0 when nothing is retained)
//! - a load of a missing revision answers number 0
//!
//! The whole store can be saved to and loaded from a snapshot file.

use crate::client::{LoadedRevision, RevisionStore, StoreOutcome};
use crate::context::RequestContext;
use crate::error::{Result, WikiError};
use crate::types::{DocumentKey, RevisionNumber, RevisionSummary, UserId};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"WRS\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Bytes around the body: magic, version, length and checksum.
const SNAPSHOT_FRAME_LEN: u64 = 4 + 1 + 8 + 4;

/// One stored revision.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredRevision {
    source: String,
    creator: UserId,
}

/// Revisions of one document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DocumentLog {
    revisions: BTreeMap<u64, StoredRevision>,

    /// Highest number ever assigned.
    last_assigned: u64,
}

impl DocumentLog {
    fn latest(&self) -> RevisionNumber {
        RevisionNumber(self.revisions.keys().next_back().copied().unwrap_or(0))
    }
}

/// All documents, by wiki id then key token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreIndex {
    wikis: HashMap<u64, HashMap<String, DocumentLog>>,
}

impl StoreIndex {
    fn document(&self, wiki_id: u64, key: &DocumentKey) -> Option<&DocumentLog> {
        self.wikis.get(&wiki_id)?.get(key.as_str())
    }
}

/// Number of calls received per RPC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub list: u64,
    pub load: u64,
    pub store: u64,
    pub delete: u64,
}

impl StoreCallCounts {
    pub fn total(&self) -> u64 {
        self.list + self.load + self.store + self.delete
    }
}

#[derive(Default)]
struct CallCounters {
    list: AtomicU64,
    load: AtomicU64,
    store: AtomicU64,
    delete: AtomicU64,
}

/// Revision store held in memory.
pub struct MemoryRevisionStore {
    index: RwLock<StoreIndex>,
    counters: CallCounters,

    /// When false every call fails, as an unreachable remote would.
    available: AtomicBool,
}

impl MemoryRevisionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_index(StoreIndex::default())
    }

    fn with_index(index: StoreIndex) -> Self {
        Self {
            index: RwLock::new(index),
            counters: CallCounters::default(),
            available: AtomicBool::new(true),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Calls received so far.
    pub fn call_counts(&self) -> StoreCallCounts {
        StoreCallCounts {
            list: self.counters.list.load(Ordering::Relaxed),
            load: self.counters.load.load(Ordering::Relaxed),
            store: self.counters.store.load(Ordering::Relaxed),
            delete: self.counters.delete.load(Ordering::Relaxed),
        }
    }

    pub fn reset_call_counts(&self) {
        self.counters.list.store(0, Ordering::Relaxed);
        self.counters.load.store(0, Ordering::Relaxed);
        self.counters.store.store(0, Ordering::Relaxed);
        self.counters.delete.store(0, Ordering::Relaxed);
    }

    /// Latest retained revision of `key` (0 if none), without counting a call.
    pub fn latest(&self, wiki_id: u64, key: &DocumentKey) -> RevisionNumber {
        self.index
            .read()
            .document(wiki_id, key)
            .map(DocumentLog::latest)
            .unwrap_or_default()
    }

    fn begin(&self, ctx: &RequestContext, counter: &AtomicU64) -> Result<()> {
        ctx.check()?;
        counter.fetch_add(1, Ordering::Relaxed);
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(WikiError::Technical("revision store unavailable".into()))
        }
    }

    // --- Snapshots ---

    /// Write every document to `path`, replacing the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let encoded = rmp_serde::to_vec(&*self.index.read())?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        file.lock_exclusive()?;
        file.set_len(0)?;

        file.write_all(SNAPSHOT_MAGIC)?;
        file.write_all(&[SNAPSHOT_VERSION])?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;
        file.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;

        file.sync_all()?;
        file.unlock()?;
        debug!(path = %path.as_ref().display(), bytes = encoded.len(), "revision store saved");
        Ok(())
    }

    /// Load a store from a snapshot written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        file.lock_shared()?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(WikiError::InvalidFormat("Invalid snapshot magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(WikiError::InvalidFormat(format!(
                "Unsupported snapshot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        let available = file.metadata()?.len().saturating_sub(SNAPSHOT_FRAME_LEN);
        let len = match usize::try_from(len) {
            Ok(len) if len as u64 <= available => len,
            _ => {
                return Err(WikiError::InvalidFormat(
                    "snapshot length exceeds file size".into(),
                ))
            }
        };

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(WikiError::ChecksumMismatch { expected, got });
        }
        file.unlock()?;

        let index: StoreIndex = rmp_serde::from_slice(&encoded)?;
        Ok(Self::with_index(index))
    }
}

impl Default for MemoryRevisionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn list_revisions(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
    ) -> Result<Vec<RevisionSummary>> {
        self.begin(ctx, &self.counters.list)?;
        let index = self.index.read();
        Ok(index
            .document(wiki_id, key)
            .map(|doc| {
                doc.revisions
                    .iter()
                    .map(|(number, revision)| RevisionSummary {
                        number: RevisionNumber(*number),
                        creator: revision.creator,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn load_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<LoadedRevision> {
        self.begin(ctx, &self.counters.load)?;
        let index = self.index.read();
        let Some(doc) = index.document(wiki_id, key) else {
            return Ok(LoadedRevision::default());
        };

        let found = if number.is_latest() {
            doc.revisions.iter().next_back()
        } else {
            doc.revisions.get_key_value(&number.0)
        };
        Ok(found
            .map(|(number, revision)| LoadedRevision {
                number: RevisionNumber(*number),
                source: revision.source.clone(),
            })
            .unwrap_or_default())
    }

    fn store_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        creator: UserId,
        expected: RevisionNumber,
        source: &str,
    ) -> Result<StoreOutcome> {
        self.begin(ctx, &self.counters.store)?;
        let mut index = self.index.write();
        let doc = index
            .wikis
            .entry(wiki_id)
            .or_default()
            .entry(key.as_str().to_string())
            .or_default();

        let latest = doc.latest();
        if expected != latest {
            debug!(key = %key, expected = expected.0, latest = latest.0, "store rejected");
            return Ok(StoreOutcome::Rejected { latest });
        }

        doc.last_assigned += 1;
        let number = doc.last_assigned;
        doc.revisions.insert(
            number,
            StoredRevision {
                source: source.to_string(),
                creator,
            },
        );
        Ok(StoreOutcome::Accepted(RevisionNumber(number)))
    }

    fn delete_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<bool> {
        self.begin(ctx, &self.counters.delete)?;
        let mut index = self.index.write();
        let removed = index
            .wikis
            .get_mut(&wiki_id)
            .and_then(|docs| docs.get_mut(key.as_str()))
            .map(|doc| doc.revisions.remove(&number.0).is_some())
            .unwrap_or(false);
        Ok(removed)
    }
}
