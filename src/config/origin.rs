//! Origin configuration types.
//!
//! `OriginConfig` is the raw, deserialized form; `Origin` is the validated
//! form the proxy uses to reach the upstream server.

use http::Uri;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ConfigError;
use crate::constants::DEFAULT_ORIGIN_TIMEOUT_SECS;

fn default_timeout() -> u64 {
    DEFAULT_ORIGIN_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Upstream base URL, e.g. `https://example.com`
    #[serde(default)]
    pub url: String,
    /// Connect/read/write timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: default_timeout(),
        }
    }
}

impl OriginConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Validated upstream server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    url: String,
    host: String,
    port: u16,
    tls: bool,
    host_header: String,
    base_path: String,
}

impl Origin {
    /// Parse an origin URL (`http` or `https`, host required, no query)
    ///
    /// Trailing slashes are dropped so `http://a/` and `http://a` name the
    /// same origin.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOrigin {
            origin: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = raw.trim().trim_end_matches('/');
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;

        let tls = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            Some(_) => return Err(invalid("scheme must be http or https")),
            None => return Err(invalid("missing scheme")),
        };

        let host = uri.host().filter(|h| !h.is_empty()).ok_or_else(|| invalid("missing host"))?;

        if uri.query().is_some() {
            return Err(invalid("query string is not allowed"));
        }

        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let host_header = match uri.port_u16() {
            Some(explicit) => format!("{}:{}", host, explicit),
            None => host.to_string(),
        };

        Ok(Self {
            url: url.to_string(),
            // Brackets only belong in URLs and Host headers
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            tls,
            host_header,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// Normalized origin URL, used verbatim in cache keys
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Host name (also used for SNI)
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Value for the outbound `Host` header
    pub fn host_header(&self) -> &str {
        &self.host_header
    }

    /// Path prefix prepended to every forwarded request path ("" when none)
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Upstream request target: base path + request path + optional query
    pub fn upstream_path(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_path, path, q),
            _ => format!("{}{}", self.base_path, path),
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
