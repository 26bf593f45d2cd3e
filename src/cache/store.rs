//! In-memory cache store with a disk mirror
//!
//! Reads and writes go to a `HashMap` behind a single `RwLock`. Disk jobs are
//! queued to the [`DiskWriter`] while the write guard is held, so the disk
//! mirror sees writes and clears in the same order as the map. Queueing a
//! write never blocks; filesystem work happens on the writer thread.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::disk::{default_cache_dir, DiskWriter};
use super::stats::{CacheCounters, CacheStats};
use super::traits::Cache;
use super::{CacheEntry, CacheError, CacheKey};
use crate::constants::PERSIST_QUEUE_CAPACITY;

/// Process-wide response cache
pub struct CacheStore {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    disk: DiskWriter,
    counters: CacheCounters,
}

impl CacheStore {
    /// Create an empty store mirroring to the default temp-dir location
    pub fn new() -> Result<Self, CacheError> {
        Self::with_dir(default_cache_dir())
    }

    /// Create an empty store mirroring to `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let disk = DiskWriter::spawn(dir.into(), PERSIST_QUEUE_CAPACITY)?;
        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            disk,
            counters: CacheCounters::default(),
        })
    }

    /// Directory the disk tier writes to
    pub fn dir(&self) -> &Path {
        self.disk.dir()
    }

    /// Number of entries currently held in memory
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Wait until every write accepted so far has been persisted (or dropped)
    pub fn flush(&self) {
        self.disk.flush();
    }
}

impl Cache for CacheStore {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.read().get(key).cloned();
        match entry {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        entry
    }

    fn set(&self, key: CacheKey, entry: CacheEntry) {
        let entry = Arc::new(entry);
        let mut entries = self.entries.write();
        entries.insert(key.clone(), Arc::clone(&entry));
        self.disk.enqueue(key, entry);
        drop(entries);
        self.counters.record_store();
    }

    fn clear(&self) -> Result<(), CacheError> {
        let pending = {
            let mut entries = self.entries.write();
            *entries = HashMap::new();
            self.disk.begin_clear()?
        };
        // The removal itself runs without the lock
        pending.wait()
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("dir", &self.dir())
            .field("entries", &self.len())
            .finish()
    }
}
