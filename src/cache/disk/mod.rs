//! Disk tier of the cache
//!
//! Every accepted write is mirrored to `<cache-dir>/<md5-hex(key)>.json`.
//! The files are never read back by the proxy; they exist so entries can be
//! inspected or cleared from outside the process.

mod utils;
mod writer;

pub use self::utils::{default_cache_dir, entry_path, key_to_hash, remove_cache_dir};
pub use self::writer::{DiskWriter, PendingClear};
