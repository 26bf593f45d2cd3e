// Request pipeline module - per-request state carried through the proxy phases

use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::cache::{CacheEntry, CacheKey};

/// Outcome of the cache lookup for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_header_value())
    }
}

/// A cacheable origin response whose body is still arriving
#[derive(Debug)]
pub struct PendingEntry {
    key: CacheKey,
    status_code: u16,
    headers: BTreeMap<String, String>,
    body: BytesMut,
}

impl PendingEntry {
    pub fn new(key: CacheKey, status_code: u16, headers: BTreeMap<String, String>) -> Self {
        Self {
            key,
            status_code,
            headers,
            body: BytesMut::new(),
        }
    }

    pub fn append(&mut self, chunk: &Bytes) {
        self.body.extend_from_slice(chunk);
    }

    /// Finish the capture, producing the key and the entry to store
    pub fn into_entry(self) -> (CacheKey, CacheEntry) {
        let entry = CacheEntry::new(self.body.freeze(), self.headers, self.status_code);
        (self.key, entry)
    }
}

/// Request context that holds all information about an HTTP request
/// as it flows through the proxy phases
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    cache_key: Option<CacheKey>,
    cache_status: Option<CacheStatus>,
    pending: Option<PendingEntry>,
    started_at: Instant,
    upstream_deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a new RequestContext with a fresh request ID (UUID v4)
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: String::new(),
            path: String::new(),
            cache_key: None,
            cache_status: None,
            pending: None,
            started_at: Instant::now(),
            upstream_deadline: None,
        }
    }

    /// Record the method and path of the inbound request
    pub fn set_request(&mut self, method: &str, path: &str) {
        self.method = method.to_string();
        self.path = path.to_string();
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_cache_key(&mut self, key: CacheKey) {
        self.cache_key = Some(key);
    }

    pub fn cache_key(&self) -> Option<&CacheKey> {
        self.cache_key.as_ref()
    }

    pub fn set_cache_status(&mut self, status: CacheStatus) {
        self.cache_status = Some(status);
    }

    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.cache_status
    }

    /// Start capturing a cacheable response
    pub fn begin_capture(&mut self, pending: PendingEntry) {
        self.pending = Some(pending);
    }

    /// Response body chunks are appended here while a capture is active
    pub fn pending_mut(&mut self) -> Option<&mut PendingEntry> {
        self.pending.as_mut()
    }

    /// End the capture; returns `None` if nothing was captured or it was already taken
    pub fn take_pending(&mut self) -> Option<PendingEntry> {
        self.pending.take()
    }

    /// Drop an in-progress capture without storing it
    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    /// Bound the whole origin exchange to `timeout` from now
    pub fn start_upstream_deadline(&mut self, timeout: Duration) {
        self.upstream_deadline = Some(Instant::now() + timeout);
    }

    /// True once the origin exchange has outlived its deadline
    pub fn upstream_deadline_exceeded(&self) -> bool {
        self.upstream_deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Milliseconds since the context was created
    pub fn elapsed_ms(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
