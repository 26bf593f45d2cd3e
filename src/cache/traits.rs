//! Cache trait definition
//!
//! The proxy talks to its store only through this trait; the backing table
//! and its lock stay private to the implementation.

use std::sync::Arc;

use super::entry::{CacheEntry, CacheKey};
use super::error::CacheError;
use super::stats::CacheStats;

/// Cache contract used by the proxy
pub trait Cache: Send + Sync {
    /// Get a cache entry by key
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    /// Set a cache entry, replacing any existing entry for the key
    fn set(&self, key: CacheKey, entry: CacheEntry);

    /// Remove every entry from memory and disk
    fn clear(&self) -> Result<(), CacheError>;

    /// Lookup and write counters
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}
