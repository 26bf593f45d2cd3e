//! Cache handler module for the proxy.
//!
//! Cache key derivation, the cacheability decision, the header filter applied
//! to stored copies, and construction of cache-hit responses.
//!
//! # Design
//!
//! Functions return values instead of writing to the session, so the proxy
//! phases stay thin and this logic is testable without a live connection.

use http::HeaderMap;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use std::collections::BTreeMap;

use crate::cache::{CacheEntry, CacheKey};
use crate::config::Origin;
use crate::constants::{CACHE_STATUS_HEADER, UNCACHEABLE_HEADERS};
use crate::pipeline::CacheStatus;

/// Build the cache key for a request: `METHOD:ORIGIN+PATH`
///
/// The query string is not part of the key.
pub fn build_cache_key(method: &str, origin: &Origin, path: &str) -> CacheKey {
    CacheKey::new(method, origin.as_str(), path)
}

/// Whether a response header may be written to the cached copy
pub fn should_cache_header(name: &str) -> bool {
    !UNCACHEABLE_HEADERS
        .iter()
        .any(|skipped| skipped.eq_ignore_ascii_case(name))
}

/// Only successful GET/HEAD responses are stored
pub fn is_cacheable(method: &str, status_code: u16) -> bool {
    matches!(method, "GET" | "HEAD") && status_code == 200
}

/// Flatten origin headers for storage
///
/// Excluded headers are dropped and multi-valued headers are joined with ", ".
pub fn filter_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut filtered = BTreeMap::new();

    for name in headers.keys() {
        if !should_cache_header(name.as_str()) {
            continue;
        }

        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        filtered.insert(name.as_str().to_string(), joined);
    }

    filtered
}

/// Response header for serving a cached entry, marked as a cache hit
pub fn build_hit_response(entry: &CacheEntry) -> Result<ResponseHeader> {
    let mut header = ResponseHeader::build(entry.status_code, Some(entry.headers.len() + 1))?;

    for (name, value) in &entry.headers {
        header.insert_header(name.clone(), value.as_str())?;
    }
    header.insert_header(CACHE_STATUS_HEADER, CacheStatus::Hit.as_header_value())?;

    Ok(header)
}
