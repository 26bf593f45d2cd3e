//! Utility functions for the disk tier

use crate::cache::CacheKey;
use crate::constants::{CACHE_DIR_NAMESPACE, CACHE_FILE_EXTENSION};
use md5::{Digest, Md5};
use std::io;
use std::path::{Path, PathBuf};

/// Convert a CacheKey to a 32-character MD5 hex digest for use as a filename
pub fn key_to_hash(key: &CacheKey) -> String {
    hex::encode(Md5::digest(key.as_str().as_bytes()))
}

/// Path of the persisted file for a cache entry
pub fn entry_path(cache_dir: &Path, key: &CacheKey) -> PathBuf {
    cache_dir.join(format!("{}.{}", key_to_hash(key), CACHE_FILE_EXTENSION))
}

/// Default cache directory under the platform temp dir
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(CACHE_DIR_NAMESPACE)
}

/// Recursively remove the cache directory; a missing directory is not an error
pub fn remove_cache_dir(cache_dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(cache_dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
