//! Background persistence writer
//!
//! All disk operations for the cache run on one dedicated thread fed by a
//! bounded channel. Jobs are processed in submission order, so a clear
//! submitted after a write always observes (and removes) that write.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::utils::{entry_path, remove_cache_dir};
use crate::cache::{CacheEntry, CacheError, CacheKey};

enum PersistJob {
    Write {
        key: CacheKey,
        entry: Arc<CacheEntry>,
    },
    Clear {
        reply: mpsc::Sender<io::Result<()>>,
    },
    Flush {
        reply: mpsc::Sender<()>,
    },
}

/// Handle to the persistence thread
pub struct DiskWriter {
    dir: PathBuf,
    sender: Option<SyncSender<PersistJob>>,
    handle: Option<JoinHandle<()>>,
}

impl DiskWriter {
    /// Start the writer thread for `dir` with a queue of `capacity` pending jobs
    pub fn spawn(dir: PathBuf, capacity: usize) -> Result<Self, CacheError> {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let worker_dir = dir.clone();
        let handle = thread::Builder::new()
            .name("cache-persist".to_string())
            .spawn(move || run(&worker_dir, receiver))?;

        Ok(Self {
            dir,
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Directory entries are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue an entry for persistence without blocking
    ///
    /// Dropped with a warning when the queue is full.
    pub fn enqueue(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(PersistJob::Write { key, entry }) {
            Ok(()) => {}
            Err(TrySendError::Full(PersistJob::Write { key, .. })) => {
                tracing::warn!(cache_key = %key, "Persistence queue full, skipping disk write");
            }
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Persistence writer stopped, skipping disk write");
            }
        }
    }

    /// Remove the cache directory after every previously queued write has landed
    pub fn clear(&self) -> Result<(), CacheError> {
        self.begin_clear()?.wait()
    }

    /// Queue a clear without waiting for it to run
    ///
    /// Jobs queued after this call are processed after the removal.
    pub fn begin_clear(&self) -> Result<PendingClear, CacheError> {
        let sender = self.sender.as_ref().ok_or(CacheError::WriterUnavailable)?;
        let (reply, response) = mpsc::channel();
        sender
            .send(PersistJob::Clear { reply })
            .map_err(|_| CacheError::WriterUnavailable)?;
        Ok(PendingClear { response })
    }

    /// Block until every job queued so far has been processed
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (reply, response) = mpsc::channel();
        if sender.send(PersistJob::Flush { reply }).is_ok() {
            let _ = response.recv();
        }
    }
}

/// A queued clear; `wait` blocks until the directory has been removed
#[must_use]
pub struct PendingClear {
    response: Receiver<io::Result<()>>,
}

impl PendingClear {
    pub fn wait(self) -> Result<(), CacheError> {
        self.response
            .recv()
            .map_err(|_| CacheError::WriterUnavailable)??;
        Ok(())
    }
}

impl Drop for DiskWriter {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain its queue and exit
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(dir: &Path, receiver: Receiver<PersistJob>) {
    for job in receiver {
        match job {
            PersistJob::Write { key, entry } => {
                if let Err(e) = persist_entry(dir, &key, &entry) {
                    tracing::warn!(cache_key = %key, error = %e, "Failed to persist cache entry");
                }
            }
            PersistJob::Clear { reply } => {
                let _ = reply.send(remove_cache_dir(dir));
            }
            PersistJob::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

fn persist_entry(dir: &Path, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
    std::fs::create_dir_all(dir)?;

    let path = entry_path(dir, key);
    let data = serde_json::to_vec(entry)?;

    // Write to temp file, then rename so readers never see a partial file
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, &path)?;

    tracing::debug!(cache_key = %key, path = %path.display(), "Persisted cache entry");
    Ok(())
}
