//! Cache error types
//!
//! Only clearing the cache surfaces errors to callers; persistence failures
//! during `set` are logged and dropped.

use thiserror::Error;

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error while touching the cache directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded for the disk tier
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background persistence writer has stopped
    #[error("Cache persistence writer is not running")]
    WriterUnavailable,
}
