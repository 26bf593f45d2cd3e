//! Cache key and entry types
//!
//! This module defines the core cache entry structures:
//! - `CacheKey`: `METHOD:ORIGIN+PATH` identifier for a cacheable response
//! - `CacheEntry`: a stored response (body, flattened headers, status, metadata)

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cache key for identifying cached responses
///
/// The query string is deliberately not part of the key: two requests that
/// differ only by query parameters share one entry.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from the request method, the configured origin and the request path
    pub fn new(method: &str, origin: &str, path: &str) -> Self {
        Self(format!("{}:{}{}", method, origin, path))
    }

    /// The key as it is stored and hashed
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Cached HTTP response
///
/// Entries are shared as `Arc<CacheEntry>` once stored, so they are never
/// mutated after creation; overwriting a key swaps in a new entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Response body
    #[serde(with = "base64_body")]
    pub data: Bytes,
    /// Response headers, multi-valued headers joined with ", "
    pub headers: BTreeMap<String, String>,
    /// HTTP status of the origin response
    pub status_code: u16,
    /// When this entry was created (informational only, there is no TTL)
    pub timestamp: DateTime<Utc>,
    /// Copy of the Content-Type header, empty when the origin sent none
    pub content_type: String,
}

impl CacheEntry {
    /// Create a new cache entry stamped with the current time
    ///
    /// `content_type` is taken from `headers` (case-insensitive lookup).
    pub fn new(data: Bytes, headers: BTreeMap<String, String>, status_code: u16) -> Self {
        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone())
            .unwrap_or_default();

        Self {
            data,
            headers,
            status_code,
            timestamp: Utc::now(),
            content_type,
        }
    }

    /// Approximate in-memory size of the entry (body plus header text)
    pub fn size_bytes(&self) -> usize {
        let header_size: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum();
        self.data.len() + header_size + self.content_type.len()
    }
}

/// Body bytes are persisted as a base64 string so the JSON stays compact and readable
mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
