//! Response cache
//!
//! - [`CacheStore`]: in-memory table behind one `RwLock`, mirrored to disk
//! - [`disk`]: background persistence of entries as JSON files
//! - [`Cache`]: the get/set/clear contract the proxy depends on

pub mod disk;
pub mod entry;
pub mod error;
pub mod stats;
pub mod store;
pub mod traits;

pub use entry::{CacheEntry, CacheKey};
pub use error::CacheError;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use traits::Cache;
