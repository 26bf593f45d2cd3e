// Constants module - centralized default values for configuration
//
// Defaults shared by the CLI, the YAML config loader and the proxy itself.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// Origin defaults
// =============================================================================

/// Default timeout for origin connect/read/write in seconds
pub const DEFAULT_ORIGIN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Cache defaults
// =============================================================================

/// Subdirectory of the platform temp dir holding persisted entries
pub const CACHE_DIR_NAMESPACE: &str = "caching-proxy";

/// File extension of persisted cache entries
pub const CACHE_FILE_EXTENSION: &str = "json";

/// Capacity of the background persistence queue
pub const PERSIST_QUEUE_CAPACITY: usize = 1024;

// =============================================================================
// HTTP
// =============================================================================

/// Response header carrying the cache decision
pub const CACHE_STATUS_HEADER: &str = "X-Cache";

/// Response headers never written to the cached copy (compared case-insensitively)
pub const UNCACHEABLE_HEADERS: [&str; 5] = ["date", "server", "x-cache", "set-cookie", "authorization"];
