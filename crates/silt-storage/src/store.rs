//! The ordered byte store and its transactions.
//!
//! `Store` keeps the committed state in a byte-ordered map. A
//! `Transaction` layers a private write buffer on top: reads merge the
//! buffer over the committed map, `commit` applies the buffer atomically
//! (and appends it to the commit log when the store is file-backed), and
//! dropping or rolling back discards it.
//!
//! Scans snapshot the merged view up front, so callers may freely write
//! through the same transaction while walking a scan result.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::log::{self, CommitLog, LogEntry};

/// Byte bounds of a scan: `lower` inclusive, `upper` exclusive.
#[derive(Debug, Clone)]
pub struct ScanBounds {
    pub lower: Vec<u8>,
    pub upper: Vec<u8>,
}

#[derive(Debug)]
struct Inner {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    log: Option<Mutex<CommitLog>>,
}

/// An ordered byte store, in-memory or file-backed.
///
/// Cloning is cheap and shares the underlying state.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Opens a purely in-memory store.
    pub fn open_in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                map: RwLock::new(BTreeMap::new()),
                log: None,
            }),
        }
    }

    /// Opens a file-backed store, replaying its commit log.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut map = BTreeMap::new();
        log::replay(path, |entry| match entry {
            LogEntry::Put(k, v) => {
                map.insert(k, v);
            }
            LogEntry::Delete(k) => {
                map.remove(&k);
            }
        })?;
        debug!(keys = map.len(), path = %path.display(), "store opened");

        let log = CommitLog::open(path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                map: RwLock::new(map),
                log: Some(Mutex::new(log)),
            }),
        })
    }

    /// Starts a transaction.
    pub fn begin(&self, read_only: bool) -> Transaction {
        Transaction {
            inner: self.inner.clone(),
            writes: Mutex::new(BTreeMap::new()),
            read_only,
        }
    }
}

/// A transaction over the store.
///
/// Writes are buffered privately until `commit`; reads see the committed
/// state with this transaction's own writes layered on top. The engine runs
/// one writer per transaction, so the buffer lock is uncontended.
#[derive(Debug)]
pub struct Transaction {
    inner: Arc<Inner>,
    writes: Mutex<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    read_only: bool,
}

impl Transaction {
    /// Returns whether this transaction rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reads a key, seeing this transaction's own uncommitted writes.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(buffered) = self.writes.lock().get(key) {
            return buffered.clone();
        }
        self.inner.map.read().get(key).cloned()
    }

    /// Returns whether `key` is visible to this transaction.
    pub fn exists(&self, key: &[u8]) -> bool {
        if let Some(buffered) = self.writes.lock().get(key) {
            return buffered.is_some();
        }
        self.inner.map.read().contains_key(key)
    }

    /// Buffers a put.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.writes.lock().insert(key, Some(value));
        Ok(())
    }

    /// Buffers a delete (a tombstone over the committed state).
    pub fn delete(&self, key: &[u8]) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.writes.lock().insert(key.to_vec(), None);
        Ok(())
    }

    /// Returns all visible entries in `[lower, upper)`, sorted ascending,
    /// or descending when `reverse` is set.
    ///
    /// The result is a snapshot: writes issued after the call do not show
    /// up in it, and the caller may mutate through `self` while consuming
    /// it.
    pub fn scan(&self, bounds: &ScanBounds, reverse: bool) -> Vec<(Vec<u8>, Vec<u8>)> {
        if bounds.lower >= bounds.upper {
            return Vec::new();
        }
        let map = self.inner.map.read();
        let writes = self.writes.lock();
        let range = (bounds.lower.clone(), bounds.upper.clone());

        let mut committed = map.range(range.0.clone()..range.1.clone()).peekable();
        let mut buffered = writes.range(range.0..range.1).peekable();

        // Classic two-way merge; the write buffer wins on equal keys and
        // tombstones drop the entry.
        let mut out = Vec::new();
        loop {
            match (committed.peek(), buffered.peek()) {
                (Some((ck, _)), Some((bk, _))) => {
                    if ck < bk {
                        let (k, v) = committed.next().unwrap();
                        out.push((k.clone(), v.clone()));
                    } else {
                        if ck == bk {
                            committed.next();
                        }
                        let (k, v) = buffered.next().unwrap();
                        if let Some(v) = v {
                            out.push((k.clone(), v.clone()));
                        }
                    }
                }
                (Some(_), None) => {
                    let (k, v) = committed.next().unwrap();
                    out.push((k.clone(), v.clone()));
                }
                (None, Some(_)) => {
                    let (k, v) = buffered.next().unwrap();
                    if let Some(v) = v {
                        out.push((k.clone(), v.clone()));
                    }
                }
                (None, None) => break,
            }
        }

        if reverse {
            out.reverse();
        }
        out
    }

    /// Applies the write buffer to the store and appends it to the commit
    /// log when file-backed. The log is written first so a crash between
    /// the two leaves the store no worse than replayable.
    pub fn commit(self) -> StorageResult<()> {
        if self.read_only {
            return Ok(());
        }
        let writes = self.writes.into_inner();
        if writes.is_empty() {
            return Ok(());
        }

        let entries: Vec<LogEntry> = writes
            .iter()
            .map(|(k, v)| match v {
                Some(v) => LogEntry::Put(k.clone(), v.clone()),
                None => LogEntry::Delete(k.clone()),
            })
            .collect();

        if let Some(log) = &self.inner.log {
            log.lock().append(&entries)?;
        }

        let mut map = self.inner.map.write();
        for (key, value) in writes {
            match value {
                Some(v) => {
                    map.insert(key, v);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        debug!(entries = entries.len(), "transaction committed");
        Ok(())
    }

    /// Discards the write buffer.
    pub fn rollback(self) {
        let dropped = self.writes.into_inner().len();
        if dropped > 0 {
            debug!(entries = dropped, "transaction rolled back");
        }
    }
}
